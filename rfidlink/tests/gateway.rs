//! Command gateway behaviour end to end

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rfidlink::{
    CapabilityGate, CommandGateway, CommandOutcome, CommandRequest, ErrorKind, Payload, PermissionPlatform,
    Permissions, ReaderConfig, ReaderEvent, ReaderManager, SessionState, SimulatedDriver, SimulatedHandle,
    Transport,
};
use rfidlink_core::ConfigStep;
use rfidlink_driver::{Driver, EventHandler};
use rfidlink_types::ReaderDescriptor;
use serde_json::json;

/// Platform where the user answers a prompt with a fixed set
struct PromptingPlatform {
    required: Permissions,
    granted: Mutex<Permissions>,
    answer: Permissions,
    prompts: AtomicUsize,
}

impl PromptingPlatform {
    fn new(answer: Permissions) -> Arc<Self> {
        Arc::new(Self {
            required: Permissions::required_for_api_level(33),
            granted: Mutex::new(Permissions::empty()),
            answer,
            prompts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PermissionPlatform for PromptingPlatform {
    fn required(&self) -> Permissions {
        self.required
    }

    fn granted(&self) -> Permissions {
        *self.granted.lock()
    }

    async fn prompt(&self, _missing: Permissions) -> Permissions {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        *self.granted.lock() |= self.answer;
        self.granted()
    }
}

/// Driver whose discovery blows up
struct CrashingDriver;

#[async_trait]
impl Driver for CrashingDriver {
    async fn discover(&mut self, _transport: Transport) -> rfidlink_driver::Result<Vec<ReaderDescriptor>> {
        panic!("vendor SDK crashed")
    }

    async fn connect(&mut self, _reader: &ReaderDescriptor) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    async fn disconnect(&mut self) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }

    async fn configure(&mut self, _step: &ConfigStep) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    async fn max_power_index(&mut self) -> rfidlink_driver::Result<u16> {
        Ok(0)
    }

    async fn antenna_power(&mut self, _antenna: u16) -> rfidlink_driver::Result<u16> {
        Ok(0)
    }

    async fn set_antenna_power(&mut self, _antenna: u16, _power_index: u16) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    async fn start_inventory(&mut self) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    async fn stop_inventory(&mut self) -> rfidlink_driver::Result<()> {
        Ok(())
    }

    fn subscribe(&mut self, _handler: EventHandler) {}

    fn unsubscribe(&mut self) {}

    async fn dispose(&mut self) -> rfidlink_driver::Result<()> {
        Ok(())
    }
}

fn setup(platform: Arc<dyn PermissionPlatform>) -> (CommandGateway, SimulatedHandle) {
    let (driver, sim) = SimulatedDriver::new();
    sim.add_reader(Transport::Bluetooth, "RFD40+_A");

    let manager = ReaderManager::new(driver, ReaderConfig::default());
    let gate = Arc::new(CapabilityGate::new(platform));
    (CommandGateway::with_gate(manager, gate), sim)
}

fn simulated() -> (CommandGateway, SimulatedHandle) {
    let (driver, sim) = SimulatedDriver::new();
    sim.add_reader(Transport::Bluetooth, "RFD40+_A");
    (CommandGateway::new(ReaderManager::new(driver, ReaderConfig::default())), sim)
}

#[tokio::test(start_paused = true)]
async fn test_initialize_after_permission_grant() {
    let platform = PromptingPlatform::new(Permissions::all());
    let (gateway, sim) = setup(platform.clone());
    let mut events = gateway.manager().dispatcher().subscribe_channel();

    assert_eq!(
        gateway.handle(CommandRequest::new("checkPermissions")).await,
        CommandOutcome::Success(Payload::Bool(false))
    );

    let outcome = gateway.handle(CommandRequest::new("initialize")).await;

    assert_eq!(outcome, CommandOutcome::Success(Payload::Unit));
    assert_eq!(platform.prompts.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.manager().state(), SessionState::Connected);
    assert_eq!(sim.call_count("connect"), 1);
    assert_eq!(
        events.try_recv().unwrap(),
        ReaderEvent::Connected {
            reader: "RFD40+_A".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_initialize_denied_skips_discovery() {
    let platform = PromptingPlatform::new(Permissions::FINE_LOCATION | Permissions::COARSE_LOCATION);
    let (gateway, sim) = setup(platform);

    let outcome = gateway.handle(CommandRequest::new("initialize")).await;

    match outcome {
        CommandOutcome::Failure { kind, details, .. } => {
            assert_eq!(kind, ErrorKind::PermissionsDenied);
            assert_eq!(
                details.unwrap()["deniedPermissions"],
                json!(["Bluetooth Scan", "Bluetooth Connect"])
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(sim.calls().is_empty());
    assert_eq!(gateway.manager().state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_request_permissions_reports_status() {
    let platform = PromptingPlatform::new(Permissions::all());
    let (gateway, _sim) = setup(platform);

    let outcome = gateway.handle(CommandRequest::new("requestPermissions")).await;

    let Some(Payload::Permissions(status)) = outcome.payload() else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(status.len(), 4);
    assert!(status.iter().all(|s| s.granted));
}

#[tokio::test]
async fn test_initialize_without_readers() {
    let (driver, _sim) = SimulatedDriver::new();
    let gateway = CommandGateway::new(ReaderManager::new(driver, ReaderConfig::default()));

    let outcome = gateway.handle(CommandRequest::new("initialize")).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::NoReaderFound));
}

#[tokio::test]
async fn test_set_antenna_power_argument_validation() {
    let (gateway, sim) = simulated();
    gateway.handle(CommandRequest::new("connect")).await;

    let bad = [
        CommandRequest::new("setAntennaPower"),
        CommandRequest::new("setAntennaPower").with_argument("powerLevel", "high"),
        CommandRequest::new("setAntennaPower").with_argument("powerLevel", 12.5),
        CommandRequest::new("setAntennaPower").with_argument("powerLevel", -3),
    ];

    for request in bad {
        let outcome = gateway.handle(request).await;
        assert_eq!(outcome.kind(), Some(ErrorKind::InvalidArgument));
    }
    assert_eq!(sim.call_count("set_antenna_power"), 0);

    for level in [271u64, 9000, 70_000, 5_000_000_000] {
        let outcome = gateway
            .handle(CommandRequest::new("setAntennaPower").with_argument("powerLevel", level))
            .await;
        assert_eq!(outcome.kind(), Some(ErrorKind::OutOfRange), "powerLevel {}", level);
    }
    assert_eq!(sim.call_count("set_antenna_power"), 0);
}

#[tokio::test]
async fn test_large_power_level_while_disconnected() {
    let (gateway, _sim) = simulated();

    let outcome = gateway
        .handle(CommandRequest::new("setAntennaPower").with_argument("powerLevel", 70_000))
        .await;

    assert_eq!(outcome.kind(), Some(ErrorKind::NotConnected));
}

#[tokio::test]
async fn test_start_inventory_disconnected() {
    let (gateway, sim) = simulated();

    let outcome = gateway.handle(CommandRequest::new("startInventory")).await;

    assert_eq!(outcome.kind(), Some(ErrorKind::NotConnected));
    assert!(sim.calls().is_empty());
}

#[tokio::test]
async fn test_connect_twice_is_informational() {
    let (gateway, _sim) = simulated();

    gateway.handle(CommandRequest::new("connect")).await;
    let outcome = gateway
        .handle(CommandRequest::new("connect").with_argument("readerName", "Other"))
        .await;

    assert_eq!(outcome, CommandOutcome::Success(Payload::Text("Already connected to RFD40+_A".into())));
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (gateway, _sim) = simulated();

    for _ in 0..2 {
        let outcome = gateway.handle(CommandRequest::new("disconnectReader")).await;
        assert_eq!(outcome, CommandOutcome::Success(Payload::Unit));
    }
}

#[tokio::test]
async fn test_all_available_readers() {
    let (gateway, sim) = simulated();
    sim.add_reader(Transport::Usb, "RFD8500_B");

    let outcome = gateway.handle(CommandRequest::new("getAllAvailableReaders")).await;

    let Some(payload) = outcome.payload() else {
        panic!("unexpected outcome: {:?}", outcome);
    };
    assert_eq!(
        serde_json::to_value(payload).unwrap(),
        json!([
            { "name": "RFD40+_A", "transport": "bluetooth", "handle": "bluetooth:0" },
            { "name": "RFD8500_B", "transport": "usb", "handle": "usb:0" },
        ])
    );
}

#[tokio::test]
async fn test_panic_becomes_internal_error() {
    let gateway = CommandGateway::new(ReaderManager::new(CrashingDriver, ReaderConfig::default()));

    let outcome = gateway.handle(CommandRequest::new("getAllAvailableReaders")).await;

    assert_eq!(
        outcome,
        CommandOutcome::Failure {
            kind: ErrorKind::InternalError,
            message: "Error executing getAllAvailableReaders: vendor SDK crashed".into(),
            details: None,
        }
    );

    // The gateway keeps serving after a panic
    let outcome = gateway.handle(CommandRequest::new("isConnected")).await;
    assert_eq!(outcome, CommandOutcome::Success(Payload::Bool(false)));
}
