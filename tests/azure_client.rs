//! Resource Manager client behaviour against a mock HTTP server.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rigger::{
    AzureClient, AzureClientError, AzureCredentials, CloudClient, ProvisioningRequest,
    ResourceHandle, ResourceKind, ResourceSettings,
};
use rigger::resource::IpAllocation;
use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const GROUP_PATH: &str = "/subscriptions/sub/resourceGroups/rg";
const PUBLIC_IP_PATH: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/myPublicIP";
const VM_PATH: &str =
    "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/myVM";

fn credentials(server: &MockServer) -> AzureCredentials {
    AzureCredentials {
        subscription_id: String::from("sub"),
        tenant_id: String::from("tenant"),
        client_id: String::from("client"),
        client_secret: String::from("secret"),
        authority_url: server.uri(),
        resource_manager_url: server.uri(),
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": TOKEN,
        })))
        .mount(server)
        .await;
}

async fn connected(server: &MockServer) -> AzureClient {
    mount_token(server).await;
    AzureClient::connect(&credentials(server))
        .await
        .expect("client connects")
        .with_poll_interval(Duration::from_millis(10))
        .with_operation_timeout(Duration::from_millis(200))
}

fn public_ip_request() -> ProvisioningRequest {
    ProvisioningRequest::builder(ResourceSettings::PublicIpAddress {
        allocation: IpAllocation::Dynamic,
    })
    .name("myPublicIP")
    .region("eastus")
    .parent_group("rg")
    .build()
    .expect("valid request")
}

fn machine() -> ResourceHandle {
    ResourceHandle {
        kind: ResourceKind::VirtualMachine,
        name: String::from("myVM"),
        id: VM_PATH.to_owned(),
        region: String::from("eastus"),
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn resource_json(id: &str, name: &str, state: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "location": "eastus",
        "properties": { "provisioningState": state },
    })
}

#[tokio::test]
async fn connect_reports_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided.",
        })))
        .mount(&server)
        .await;

    let err = AzureClient::connect(&credentials(&server))
        .await
        .expect_err("token request is rejected");

    assert!(
        matches!(err, AzureClientError::Authentication { ref message } if message.starts_with("invalid_client")),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn list_sends_bearer_token_and_follows_next_link() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub/providers/Microsoft.Compute/virtualMachines"))
        .and(query_param("api-version", "2023-09-01"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header_exists("x-ms-client-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [resource_json("/vms/myVM2", "myVM2", "Succeeded")],
            "nextLink": format!("{}/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [resource_json("/vms/myVM", "myVM", "Succeeded")],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handles = client
        .list(ResourceKind::VirtualMachine)
        .await
        .expect("listing succeeds");

    let names: Vec<&str> = handles.iter().map(|handle| handle.name.as_str()).collect();
    assert_eq!(names, vec!["myVM2", "myVM"]);
    assert!(
        handles
            .iter()
            .all(|handle| handle.kind == ResourceKind::VirtualMachine)
    );
}

#[tokio::test]
async fn list_of_empty_subscription_is_not_an_error() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/sub/resourcegroups"))
        .and(query_param("api-version", "2021-04-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let handles = client
        .list(ResourceKind::ResourceGroup)
        .await
        .expect("listing succeeds");
    assert!(handles.is_empty());
}

#[tokio::test]
async fn create_waits_for_provisioning_to_succeed() {
    let server = MockServer::start().await;
    let client = connected(&server).await;

    Mock::given(method("PUT"))
        .and(path(PUBLIC_IP_PATH))
        .and(body_string_contains("\"publicIPAllocationMethod\":\"Dynamic\""))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(resource_json(
                PUBLIC_IP_PATH,
                "myPublicIP",
                "Updating",
            )),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_json(
            PUBLIC_IP_PATH,
            "myPublicIP",
            "Succeeded",
        )))
        .mount(&server)
        .await;

    let handle = client
        .create(&public_ip_request())
        .await
        .expect("creation succeeds");

    assert_eq!(handle.id, PUBLIC_IP_PATH);
    assert_eq!(handle.kind, ResourceKind::PublicIpAddress);
    assert_eq!(handle.region, "eastus");
}

#[rstest]
#[case("Failed")]
#[case("Canceled")]
#[tokio::test]
async fn create_reports_terminal_failure(#[case] state: &str) {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_json(
            PUBLIC_IP_PATH,
            "myPublicIP",
            state,
        )))
        .mount(&server)
        .await;

    let err = client
        .create(&public_ip_request())
        .await
        .expect_err("creation fails");

    assert_eq!(
        err,
        AzureClientError::ProvisioningFailed {
            kind: ResourceKind::PublicIpAddress,
            name: String::from("myPublicIP"),
            state: state.to_owned(),
        }
    );
}

#[tokio::test]
async fn create_surfaces_api_errors() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": "PublicIPCountLimitReached",
                "message": "Cannot create more than 10 public IP addresses",
            }
        })))
        .mount(&server)
        .await;

    let err = client
        .create(&public_ip_request())
        .await
        .expect_err("creation fails");

    assert!(
        matches!(err, AzureClientError::Api { status: 409, ref code, .. } if code == "PublicIPCountLimitReached"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn power_off_waits_until_stopped() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/powerOff").as_str()))
        .and(query_param("api-version", "2023-09-01"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{VM_PATH}/instanceView").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [
                { "code": "ProvisioningState/succeeded" },
                { "code": "PowerState/stopped" },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.power_off(&machine()).await.expect("power off succeeds");
}

#[tokio::test]
async fn power_off_times_out_when_machine_keeps_running() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/powerOff").as_str()))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{VM_PATH}/instanceView").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [{ "code": "PowerState/running" }]
        })))
        .mount(&server)
        .await;

    let err = client
        .power_off(&machine())
        .await
        .expect_err("machine never stops");
    assert!(
        matches!(err, AzureClientError::Timeout { ref name, .. } if name == "myVM"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn delete_group_issues_single_delete() {
    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("DELETE"))
        .and(path(GROUP_PATH))
        .and(query_param("api-version", "2021-04-01"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_group("rg").await.expect("delete accepted");
}

#[tokio::test]
async fn power_off_with_unbounded_timeout_waits_without_deadline() {
    let server = MockServer::start().await;
    let client = connected(&server)
        .await
        .with_operation_timeout(Duration::from_secs(u64::MAX));
    Mock::given(method("POST"))
        .and(path(format!("{VM_PATH}/powerOff").as_str()))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{VM_PATH}/instanceView").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statuses": [{ "code": "PowerState/stopped" }]
        })))
        .mount(&server)
        .await;

    client.power_off(&machine()).await.expect("power off succeeds");
}

#[tokio::test]
async fn create_with_unbounded_timeout_polls_to_completion() {
    let server = MockServer::start().await;
    let client = connected(&server)
        .await
        .with_operation_timeout(Duration::from_secs(u64::MAX));
    Mock::given(method("PUT"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(resource_json(
            PUBLIC_IP_PATH,
            "myPublicIP",
            "Updating",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_json(
            PUBLIC_IP_PATH,
            "myPublicIP",
            "Succeeded",
        )))
        .mount(&server)
        .await;

    let handle = client
        .create(&public_ip_request())
        .await
        .expect("creation succeeds");
    assert_eq!(handle.id, PUBLIC_IP_PATH);
}

#[tokio::test]
async fn each_exchange_is_logged_with_its_request_id() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _default = tracing::subscriber::set_default(subscriber);

    let server = MockServer::start().await;
    let client = connected(&server).await;
    Mock::given(method("PUT"))
        .and(path(PUBLIC_IP_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(resource_json(
            PUBLIC_IP_PATH,
            "myPublicIP",
            "Succeeded",
        )))
        .mount(&server)
        .await;

    client
        .create(&public_ip_request())
        .await
        .expect("creation succeeds");

    let received = server.received_requests().await.unwrap_or_default();
    let sent_id = received
        .iter()
        .find(|request| request.method.as_str() == "PUT")
        .and_then(|request| request.headers.get("x-ms-client-request-id"))
        .and_then(|value| value.to_str().ok())
        .expect("request id header")
        .to_owned();

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains("resource manager exchange") && line.contains("method=PUT"))
        .unwrap_or_else(|| panic!("no exchange log in: {output}"));
    assert!(line.contains(PUBLIC_IP_PATH), "line: {line}");
    assert!(line.contains("status=201"), "line: {line}");
    assert!(line.contains(&format!("request_id={sent_id}")), "line: {line}");
    assert!(!output.contains(TOKEN), "token leaked into logs: {output}");
    assert!(!output.contains("publicIPAllocationMethod"), "body leaked: {output}");
}
