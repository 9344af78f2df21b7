//! Error types for the Azure Resource Manager client.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::resource::ResourceKind;

/// Errors raised by the Azure client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum AzureClientError {
    /// Raised when the credentials file is missing, unreadable or malformed.
    #[error("invalid credentials file {path}: {message}")]
    Credentials {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Reason the file was rejected.
        message: String,
    },
    /// Raised when Active Directory rejects the service principal.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Message returned by the token endpoint.
        message: String,
    },
    /// Raised when the HTTP exchange itself fails.
    #[error("request to {url} failed: {message}")]
    Http {
        /// Target URL.
        url: String,
        /// Transport error message.
        message: String,
    },
    /// Raised when Resource Manager answers with a non-success status.
    #[error("resource manager returned {status} ({code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error code, for example `QuotaExceeded`.
        code: String,
        /// Provider error message.
        message: String,
    },
    /// Raised when a response body cannot be parsed.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// URL whose response was malformed.
        url: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a request lacks a dependency the payload must reference.
    #[error("{kind} {name} cannot be created without its {dependency}")]
    MissingDependency {
        /// Kind being created.
        kind: ResourceKind,
        /// Name being created.
        name: String,
        /// Kind of the missing dependency.
        dependency: ResourceKind,
    },
    /// Raised when a long-running operation ends in a failed state.
    #[error("{kind} {name} ended in provisioning state {state}")]
    ProvisioningFailed {
        /// Kind being created.
        kind: ResourceKind,
        /// Name being created.
        name: String,
        /// Terminal state reported by the provider.
        state: String,
    },
    /// Raised when a long-running operation exceeds the timeout.
    #[error("timeout waiting for {action} on {name}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Resource name.
        name: String,
    },
}

impl AzureClientError {
    pub(super) fn http(url: &str, err: &reqwest::Error) -> Self {
        Self::Http {
            url: url.to_owned(),
            message: err.to_string(),
        }
    }

    pub(super) fn decode(url: &str, err: &serde_json::Error) -> Self {
        Self::Decode {
            url: url.to_owned(),
            message: err.to_string(),
        }
    }
}
