//! Service principal credentials loaded from an Azure auth file.
//!
//! Two layouts are accepted: the JSON document printed by
//! `az ad sp create-for-rbac --sdk-auth`, and the older `key=value`
//! properties file understood by the Azure management libraries.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use thiserror::Error;

use super::AzureClientError;

/// Public cloud Active Directory authority.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
/// Public cloud Resource Manager endpoint.
pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com/";

/// Service principal credentials and the endpoints they apply to.
#[derive(Clone, Eq, PartialEq)]
pub struct AzureCredentials {
    /// Subscription every resource is created in.
    pub subscription_id: String,
    /// Directory (tenant) of the service principal.
    pub tenant_id: String,
    /// Application (client) identifier.
    pub client_id: String,
    /// Client secret. Redacted from `Debug` output.
    pub client_secret: String,
    /// Active Directory authority used for token requests.
    pub authority_url: String,
    /// Resource Manager endpoint, also used as the token audience.
    pub resource_manager_url: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority_url", &self.authority_url)
            .field("resource_manager_url", &self.resource_manager_url)
            .finish()
    }
}

/// Reasons a credentials file is rejected.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CredentialsError {
    /// The JSON layout could not be decoded.
    #[error("malformed JSON: {0}")]
    Json(String),
    /// A properties line has no `=` separator.
    #[error("line {line} is not a key=value pair")]
    MalformedLine {
        /// One-based line number.
        line: usize,
    },
    /// A required value is absent or blank.
    #[error("missing {0}")]
    MissingField(&'static str),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SdkAuthFile {
    client_id: String,
    client_secret: String,
    subscription_id: String,
    tenant_id: String,
    active_directory_endpoint_url: Option<String>,
    resource_manager_endpoint_url: Option<String>,
}

impl AzureCredentials {
    /// Reads and parses a credentials file.
    ///
    /// # Errors
    ///
    /// Returns [`AzureClientError::Credentials`] when the file cannot be read
    /// or does not contain a complete service principal.
    pub fn from_file(path: &Utf8Path) -> Result<Self, AzureClientError> {
        let contents = read_file(path)?;
        Self::parse(&contents).map_err(|err| AzureClientError::Credentials {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Parses credentials from either supported layout.
    ///
    /// # Errors
    ///
    /// Returns the first [`CredentialsError`] found.
    pub fn parse(contents: &str) -> Result<Self, CredentialsError> {
        let credentials = if contents.trim_start().starts_with('{') {
            Self::parse_json(contents)?
        } else {
            Self::parse_properties(contents)?
        };
        credentials.validate()?;
        Ok(credentials)
    }

    fn parse_json(contents: &str) -> Result<Self, CredentialsError> {
        let file: SdkAuthFile = serde_json::from_str(contents)
            .map_err(|err| CredentialsError::Json(err.to_string()))?;
        Ok(Self {
            subscription_id: file.subscription_id.trim().to_owned(),
            tenant_id: file.tenant_id.trim().to_owned(),
            client_id: file.client_id.trim().to_owned(),
            client_secret: file.client_secret,
            authority_url: endpoint_or(file.active_directory_endpoint_url, DEFAULT_AUTHORITY_URL),
            resource_manager_url: endpoint_or(
                file.resource_manager_endpoint_url,
                DEFAULT_RESOURCE_MANAGER_URL,
            ),
        })
    }

    fn parse_properties(contents: &str) -> Result<Self, CredentialsError> {
        let mut credentials = Self {
            subscription_id: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            authority_url: String::from(DEFAULT_AUTHORITY_URL),
            resource_manager_url: String::from(DEFAULT_RESOURCE_MANAGER_URL),
        };

        for (index, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(CredentialsError::MalformedLine { line: index + 1 });
            };
            let unescaped = value.trim().replace("\\:", ":");
            match key.trim() {
                "subscription" => credentials.subscription_id = unescaped,
                "tenant" => credentials.tenant_id = unescaped,
                "client" => credentials.client_id = unescaped,
                "key" => credentials.client_secret = unescaped,
                "authURL" => credentials.authority_url = unescaped,
                "baseURL" => credentials.resource_manager_url = unescaped,
                _ => {}
            }
        }

        Ok(credentials)
    }

    fn validate(&self) -> Result<(), CredentialsError> {
        for (field, value) in [
            ("subscription id", &self.subscription_id),
            ("tenant id", &self.tenant_id),
            ("client id", &self.client_id),
            ("client secret", &self.client_secret),
            ("authority URL", &self.authority_url),
            ("resource manager URL", &self.resource_manager_url),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialsError::MissingField(field));
            }
        }
        Ok(())
    }
}

fn endpoint_or(value: Option<String>, fallback: &str) -> String {
    value
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

fn read_file(path: &Utf8Path) -> Result<String, AzureClientError> {
    let failure = |message: String| AzureClientError::Credentials {
        path: path.to_path_buf(),
        message,
    };
    let parent = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| failure(String::from("path does not name a file")))?;

    let dir = Dir::open_ambient_dir(&parent, ambient_authority())
        .map_err(|err| failure(err.to_string()))?;
    dir.read_to_string(file_name)
        .map_err(|err| failure(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SDK_AUTH: &str = r#"{
        "clientId": "client",
        "clientSecret": "secret",
        "subscriptionId": "sub",
        "tenantId": "tenant",
        "activeDirectoryEndpointUrl": "https://login.example",
        "resourceManagerEndpointUrl": "https://arm.example/",
        "galleryEndpointUrl": "https://gallery.example/"
    }"#;

    #[test]
    fn parses_sdk_auth_json() {
        let creds = AzureCredentials::parse(SDK_AUTH).expect("valid auth file");
        assert_eq!(creds.subscription_id, "sub");
        assert_eq!(creds.tenant_id, "tenant");
        assert_eq!(creds.client_id, "client");
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.authority_url, "https://login.example");
        assert_eq!(creds.resource_manager_url, "https://arm.example/");
    }

    #[test]
    fn json_endpoints_default_to_public_cloud() {
        let creds = AzureCredentials::parse(
            r#"{"clientId":"c","clientSecret":"s","subscriptionId":"sub","tenantId":"t"}"#,
        )
        .expect("valid auth file");
        assert_eq!(creds.authority_url, DEFAULT_AUTHORITY_URL);
        assert_eq!(creds.resource_manager_url, DEFAULT_RESOURCE_MANAGER_URL);
    }

    #[test]
    fn parses_properties_layout() {
        let contents = "\
# service principal
subscription=sub
client=client
key=secret
tenant=tenant
managementURI=https\\://management.core.windows.net/
baseURL=https\\://management.azure.com/
authURL=https\\://login.windows.net/
";
        let creds = AzureCredentials::parse(contents).expect("valid properties file");
        assert_eq!(creds.subscription_id, "sub");
        assert_eq!(creds.client_secret, "secret");
        assert_eq!(creds.resource_manager_url, "https://management.azure.com/");
        assert_eq!(creds.authority_url, "https://login.windows.net/");
    }

    #[rstest]
    #[case("subscription=sub\nclient=c\nkey=k\n", CredentialsError::MissingField("tenant id"))]
    #[case(
        "subscription=sub\nclient=c\ntenant=t\n",
        CredentialsError::MissingField("client secret")
    )]
    #[case("not a pair\n", CredentialsError::MalformedLine { line: 1 })]
    fn rejects_incomplete_properties(#[case] contents: &str, #[case] expected: CredentialsError) {
        let err = AzureCredentials::parse(contents).expect_err("file is incomplete");
        assert_eq!(err, expected);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = AzureCredentials::parse("{ not json").expect_err("invalid json");
        assert!(matches!(err, CredentialsError::Json(_)), "unexpected error: {err}");
    }

    #[test]
    fn from_file_reports_parse_failure_in_message() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 tempdir");
        let path = dir.join("partial.azureauth");
        std::fs::write(&path, "subscription=sub\n").expect("write auth file");

        let err = AzureCredentials::from_file(&path).expect_err("file is incomplete");
        assert!(
            matches!(err, AzureClientError::Credentials { ref message, .. } if message == "missing tenant id"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn debug_output_redacts_secret() {
        let creds = AzureCredentials::parse(SDK_AUTH).expect("valid auth file");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("\"secret\""), "rendered: {rendered}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn from_file_reports_missing_file() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 tempdir");
        let path = dir.join("missing.azureauth");

        let err = AzureCredentials::from_file(&path).expect_err("file does not exist");
        assert!(
            matches!(err, AzureClientError::Credentials { ref path, .. } if path.as_str().ends_with("missing.azureauth")),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn from_file_reads_auth_file() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let dir = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).expect("utf8 tempdir");
        let path = dir.join("my.azureauth");
        std::fs::write(&path, SDK_AUTH).expect("write auth file");

        let creds = AzureCredentials::from_file(&path).expect("file parses");
        assert_eq!(creds.subscription_id, "sub");
    }
}
