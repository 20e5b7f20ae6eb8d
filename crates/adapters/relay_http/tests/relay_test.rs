#![allow(clippy::unwrap_used)]
// Relay board requests against a wiremock server.

use dtsgate_adapter_relay_http::{RelayConfig, RelayDevice, RelayError};
use dtsgate_app::ports::Device;
use dtsgate_app::scheduler::Scheduler;
use dtsgate_domain::device::Status;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup(reset_secs: Option<u64>) -> (MockServer, RelayDevice) {
    let server = MockServer::start().await;
    let device = RelayDevice::new(RelayConfig {
        tag: "A".to_string(),
        url: server.uri(),
        reset_secs,
        ..RelayConfig::default()
    })
    .unwrap();
    (server, device)
}

async fn answer(server: &MockServer, route: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn should_be_connected_when_ping_succeeds() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/ping", 200, 1).await;

    device.ping().await.unwrap();

    assert_eq!(Device::status(&device), Status::Connected);
}

#[tokio::test]
async fn should_be_disconnected_when_ping_fails() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/ping", 500, 1).await;

    let err = device.ping().await.unwrap_err();

    assert!(matches!(err, RelayError::Status { status: 500, .. }));
    assert_eq!(Device::status(&device), Status::Disconnected);
}

#[tokio::test]
async fn should_be_disconnected_when_board_unreachable() {
    let server = MockServer::start().await;
    let url = server.uri();
    drop(server);
    let device = RelayDevice::new(RelayConfig {
        url,
        timeout_secs: 1,
        ..RelayConfig::default()
    })
    .unwrap();

    let err = device.ping().await.unwrap_err();

    assert!(matches!(err, RelayError::Request { .. }));
    assert_eq!(Device::status(&device), Status::Disconnected);
}

#[tokio::test]
async fn should_switch_output_on() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/on/4", 200, 1).await;

    device.alarm(4).await.unwrap();

    assert_eq!(Device::status(&device), Status::Connected);
}

#[tokio::test]
async fn should_switch_output_on_with_auto_reset_when_configured() {
    let (server, device) = setup(Some(5)).await;
    answer(&server, "/api/on-point/3/5000", 200, 1).await;

    device.alarm(3).await.unwrap();
}

#[tokio::test]
async fn should_switch_only_valid_outputs_when_given_a_list() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/on/1", 200, 1).await;
    answer(&server, "/api/on/2", 200, 1).await;
    answer(&server, "/api/on/32", 503, 1).await;

    let switched = device.alarms("1,2,x,0,33,32").await;

    assert_eq!(switched, 2);
}

#[tokio::test]
async fn should_reset_one_output_or_all() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/off/7", 200, 1).await;
    answer(&server, "/api/off-all", 200, 1).await;

    device.reset(Some(7)).await.unwrap();
    device.reset(None).await.unwrap();
}

#[tokio::test]
async fn should_ping_and_schedule_when_run() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/ping", 200, 2).await;
    let scheduler = Scheduler::new();
    device.set_scheduler(scheduler.clone());

    Device::run(&device).await.unwrap();
    Device::run(&device).await.unwrap();

    assert_eq!(scheduler.job_names(), vec!["relay-A ping".to_string()]);
    Device::close(&device).await.unwrap();
    assert!(scheduler.is_empty());
    assert_eq!(Device::status(&device), Status::Unconnected);
}

#[tokio::test]
async fn should_not_fail_run_when_board_unreachable() {
    let (server, device) = setup(None).await;
    answer(&server, "/api/ping", 404, 1).await;

    Device::run(&device).await.unwrap();

    assert_eq!(Device::status(&device), Status::Disconnected);
}
