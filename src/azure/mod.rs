//! Azure Resource Manager implementation of the cloud client.
//!
//! Calls go straight to the Resource Manager REST API with a service
//! principal token. Creation and power-off block until the provider reports
//! the operation as finished; group deletion returns once it is accepted.

mod arm;
mod auth;
mod credentials;
mod error;
mod payload;
mod types;
mod wait;

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_LENGTH;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::backend::{BackendFuture, CloudClient};
use crate::resource::{ProvisioningRequest, ResourceHandle, ResourceKind};
use arm::{ArmPaths, ArmResource, ListPage};
use payload::ResourceBody;

pub use credentials::{
    AzureCredentials, CredentialsError, DEFAULT_AUTHORITY_URL, DEFAULT_RESOURCE_MANAGER_URL,
};
pub use error::AzureClientError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const OPERATION_TIMEOUT: Duration = Duration::from_secs(900);
const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Client for one subscription, authenticated as a service principal.
#[derive(Clone)]
pub struct AzureClient {
    paths: ArmPaths,
    token: String,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl std::fmt::Debug for AzureClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureClient")
            .field("paths", &self.paths)
            .field("poll_interval", &self.poll_interval)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl AzureClient {
    /// Authenticates and returns a client for the credentials' subscription.
    ///
    /// # Errors
    ///
    /// Returns [`AzureClientError::Authentication`] when no token can be
    /// obtained.
    pub async fn connect(credentials: &AzureCredentials) -> Result<Self, AzureClientError> {
        let token = auth::acquire_token(credentials).await?;
        tracing::debug!(
            subscription = %credentials.subscription_id,
            "authenticated against resource manager"
        );
        Ok(Self {
            paths: ArmPaths::new(
                &credentials.resource_manager_url,
                &credentials.subscription_id,
            ),
            token,
            poll_interval: POLL_INTERVAL,
            operation_timeout: OPERATION_TIMEOUT,
        })
    }

    /// Overrides the interval between status polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Overrides how long a long-running operation may take.
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&ResourceBody>,
    ) -> Result<Vec<u8>, AzureClientError> {
        let request_id = Uuid::new_v4().to_string();
        let mut builder = HTTP_CLIENT
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header(CLIENT_REQUEST_ID, request_id.as_str());
        builder = match body {
            Some(payload) => builder.json(payload),
            None => builder.header(CONTENT_LENGTH, "0"),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| AzureClientError::http(url, &err))?;
        let status = response.status();
        tracing::debug!(
            %method,
            url,
            status = status.as_u16(),
            %request_id,
            "resource manager exchange"
        );
        let bytes = response
            .bytes()
            .await
            .map_err(|err| AzureClientError::http(url, &err))?;

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            Err(arm::api_error(status.as_u16(), &bytes))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, AzureClientError> {
        let body = self.send(Method::GET, url, None).await?;
        serde_json::from_slice(&body).map_err(|err| AzureClientError::decode(url, &err))
    }

    async fn list_all(&self, kind: ResourceKind) -> Result<Vec<ResourceHandle>, AzureClientError> {
        let mut url = self.paths.list_url(kind);
        let mut handles = Vec::new();
        loop {
            let page: ListPage = self.get_json(&url).await?;
            handles.extend(page.value.into_iter().map(|item| item.into_handle(kind)));
            match page.next_link {
                Some(next) if !next.is_empty() => url = next,
                _ => return Ok(handles),
            }
        }
    }

    async fn create_resource(
        &self,
        request: &ProvisioningRequest,
    ) -> Result<ResourceHandle, AzureClientError> {
        let kind = request.kind();
        let body = payload::body_for(request)?;
        let url = self
            .paths
            .resource_url(&self.paths.request_id(request), kind);

        let raw = self.send(Method::PUT, &url, Some(&body)).await?;
        let created: ArmResource =
            serde_json::from_slice(&raw).map_err(|err| AzureClientError::decode(&url, &err))?;

        let resource = match created.provisioning_state() {
            Some(state) if state.is_failed() => {
                return Err(AzureClientError::ProvisioningFailed {
                    kind,
                    name: request.name.clone(),
                    state: state.as_str().to_owned(),
                });
            }
            Some(state) if !state.is_succeeded() => {
                self.wait_for_provisioning(kind, &request.name, &url)
                    .await?
            }
            _ => created,
        };
        Ok(resource.into_handle(kind))
    }

    async fn power_off_machine(&self, machine: &ResourceHandle) -> Result<(), AzureClientError> {
        let url = self
            .paths
            .action_url(&machine.id, "powerOff", ResourceKind::VirtualMachine);
        self.send(Method::POST, &url, None).await?;
        self.wait_until_stopped(machine).await
    }

    async fn delete_resource_group(&self, name: &str) -> Result<(), AzureClientError> {
        let url = self
            .paths
            .resource_url(&self.paths.group_id(name), ResourceKind::ResourceGroup);
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

impl CloudClient for AzureClient {
    type Error = AzureClientError;

    fn list(&self, kind: ResourceKind) -> BackendFuture<'_, Vec<ResourceHandle>, Self::Error> {
        Box::pin(self.list_all(kind))
    }

    fn create<'a>(
        &'a self,
        request: &'a ProvisioningRequest,
    ) -> BackendFuture<'a, ResourceHandle, Self::Error> {
        Box::pin(self.create_resource(request))
    }

    fn power_off<'a>(&'a self, machine: &'a ResourceHandle) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(self.power_off_machine(machine))
    }

    fn delete_group<'a>(&'a self, name: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(self.delete_resource_group(name))
    }
}
