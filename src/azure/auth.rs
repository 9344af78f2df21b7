//! OAuth2 client-credentials token acquisition.

use serde::Deserialize;

use super::{AzureClientError, AzureCredentials, HTTP_CLIENT};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Requests a Resource Manager access token for the service principal.
///
/// # Errors
///
/// Returns [`AzureClientError::Authentication`] when the token endpoint is
/// unreachable or rejects the credentials.
pub(super) async fn acquire_token(
    credentials: &AzureCredentials,
) -> Result<String, AzureClientError> {
    let url = format!(
        "{}/{}/oauth2/token",
        credentials.authority_url.trim_end_matches('/'),
        credentials.tenant_id
    );
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("resource", credentials.resource_manager_url.as_str()),
    ];

    let failure = |message: String| AzureClientError::Authentication { message };
    let response = HTTP_CLIENT
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|err| failure(err.to_string()))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| failure(err.to_string()))?;

    if status.is_success() {
        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|err| failure(err.to_string()))?;
        return Ok(token.access_token);
    }

    let message = match serde_json::from_slice::<TokenErrorResponse>(&body) {
        Ok(parsed) if !parsed.error_description.is_empty() => {
            format!("{}: {}", parsed.error, parsed.error_description)
        }
        _ => format!("token endpoint returned {status}"),
    };
    Err(failure(message))
}
