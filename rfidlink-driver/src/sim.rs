//! Simulated driver for testing and development.
//!
//! [`SimulatedDriver`] behaves like a reader SDK without any hardware:
//! readers are registered per transport, configuration and power calls
//! are recorded, and tag reads or status changes are injected through a
//! [`SimulatedHandle`]. Injected events are delivered synchronously on the
//! caller's thread, the way a vendor SDK calls back on its own thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rfidlink_core::ConfigStep;
use rfidlink_types::{ReaderDescriptor, StatusEvent, TagReadEvent, Transport};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::{Driver, DriverEvent, EventHandler};

/// Default power table size of a handheld sled (0..=270)
const DEFAULT_MAX_POWER_INDEX: u16 = 270;

#[derive(Default)]
struct SimState {
    readers: HashMap<Transport, Vec<ReaderDescriptor>>,
    failing_transports: HashSet<Transport>,
    failing_steps: HashSet<&'static str>,
    connect_error: Option<String>,
    connected: Option<ReaderDescriptor>,
    handler: Option<EventHandler>,
    max_power_index: u16,
    power: HashMap<u16, u16>,
    inventory_running: bool,
    applied_steps: Vec<ConfigStep>,
    calls: Vec<&'static str>,
    latency: Duration,
    disposed: bool,
}

/// In-process reader driver
///
/// # Examples
///
/// ```
/// use rfidlink_driver::{Driver, SimulatedDriver};
/// use rfidlink_types::Transport;
///
/// #[tokio::main]
/// async fn main() -> rfidlink_driver::Result<()> {
///     let (mut driver, handle) = SimulatedDriver::new();
///     handle.add_reader(Transport::Bluetooth, "RFD40+_211545201D0011");
///
///     let readers = driver.discover(Transport::Bluetooth).await?;
///     driver.connect(&readers[0]).await?;
///     assert!(driver.is_connected());
///     Ok(())
/// }
/// ```
pub struct SimulatedDriver {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDriver {
    /// Create a driver with no readers and its control handle
    pub fn new() -> (Self, SimulatedHandle) {
        let state = Arc::new(Mutex::new(SimState {
            max_power_index: DEFAULT_MAX_POWER_INDEX,
            ..SimState::default()
        }));

        (
            Self {
                state: Arc::clone(&state),
            },
            SimulatedHandle { state },
        )
    }

    async fn enter(&self, call: &'static str) -> Result<()> {
        let latency = {
            let mut state = self.state.lock();
            if state.disposed {
                return Err(Error::Disposed);
            }
            state.calls.push(call);
            state.latency
        };

        trace!("sim driver: {}", call);

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    fn require_connected(state: &SimState) -> Result<()> {
        if state.connected.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for SimulatedDriver {
    async fn discover(&mut self, transport: Transport) -> Result<Vec<ReaderDescriptor>> {
        self.enter("discover").await?;

        let state = self.state.lock();
        if state.failing_transports.contains(&transport) {
            return Err(Error::Discovery {
                transport,
                message: "transport unavailable".into(),
            });
        }

        Ok(state.readers.get(&transport).cloned().unwrap_or_default())
    }

    async fn connect(&mut self, reader: &ReaderDescriptor) -> Result<()> {
        self.enter("connect").await?;

        let mut state = self.state.lock();
        if state.connected.is_some() {
            return Err(Error::AlreadyConnected);
        }
        if let Some(message) = state.connect_error.clone() {
            return Err(Error::ConnectionFailed(message));
        }

        let known = state
            .readers
            .get(&reader.transport)
            .is_some_and(|list| list.iter().any(|r| r.handle == reader.handle));
        if !known {
            return Err(Error::ConnectionFailed(format!("{} is not reachable", reader.name)));
        }

        debug!("sim driver connected to {}", reader.name);
        state.connected = Some(reader.clone());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.enter("disconnect").await?;

        let mut state = self.state.lock();
        state.inventory_running = false;
        state.connected = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected.is_some()
    }

    async fn configure(&mut self, step: &ConfigStep) -> Result<()> {
        self.enter("configure").await?;

        let mut state = self.state.lock();
        Self::require_connected(&state)?;

        if state.failing_steps.contains(step.name()) {
            return Err(Error::operation("configure", format!("{} rejected", step.name())));
        }

        if let ConfigStep::AntennaRf { antenna, power_index, .. } = step {
            state.power.insert(*antenna, *power_index);
        }
        state.applied_steps.push(step.clone());
        Ok(())
    }

    async fn max_power_index(&mut self) -> Result<u16> {
        self.enter("max_power_index").await?;

        let state = self.state.lock();
        Self::require_connected(&state)?;
        Ok(state.max_power_index)
    }

    async fn antenna_power(&mut self, antenna: u16) -> Result<u16> {
        self.enter("antenna_power").await?;

        let state = self.state.lock();
        Self::require_connected(&state)?;
        Ok(state.power.get(&antenna).copied().unwrap_or(0))
    }

    async fn set_antenna_power(&mut self, antenna: u16, power_index: u16) -> Result<()> {
        self.enter("set_antenna_power").await?;

        let mut state = self.state.lock();
        Self::require_connected(&state)?;

        if power_index > state.max_power_index {
            return Err(Error::InvalidUsage(format!("power index {} not supported", power_index)));
        }
        state.power.insert(antenna, power_index);
        Ok(())
    }

    async fn start_inventory(&mut self) -> Result<()> {
        self.enter("start_inventory").await?;

        let mut state = self.state.lock();
        Self::require_connected(&state)?;
        state.inventory_running = true;
        Ok(())
    }

    async fn stop_inventory(&mut self) -> Result<()> {
        self.enter("stop_inventory").await?;

        let mut state = self.state.lock();
        Self::require_connected(&state)?;
        state.inventory_running = false;
        Ok(())
    }

    fn subscribe(&mut self, handler: EventHandler) {
        let mut state = self.state.lock();
        state.calls.push("subscribe");
        state.handler = Some(handler);
    }

    fn unsubscribe(&mut self) {
        let mut state = self.state.lock();
        state.calls.push("unsubscribe");
        state.handler = None;
    }

    async fn dispose(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("dispose");
        state.connected = None;
        state.handler = None;
        state.inventory_running = false;
        state.disposed = true;
        Ok(())
    }
}

/// Control handle for a [`SimulatedDriver`]
///
/// Cloneable; every clone drives the same simulated reader.
#[derive(Clone)]
pub struct SimulatedHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedHandle {
    /// Make a reader discoverable; returns its descriptor
    pub fn add_reader(&self, transport: Transport, name: &str) -> ReaderDescriptor {
        let mut state = self.state.lock();
        let readers = state.readers.entry(transport).or_default();
        let reader = ReaderDescriptor::new(name, transport, format!("{}:{}", transport, readers.len()));
        readers.push(reader.clone());
        reader
    }

    /// Make discovery on a transport fail
    pub fn fail_discovery(&self, transport: Transport) {
        self.state.lock().failing_transports.insert(transport);
    }

    /// Reject a configuration step by name (see [`ConfigStep::name`])
    pub fn fail_step(&self, step: &'static str) {
        self.state.lock().failing_steps.insert(step);
    }

    /// Make connect attempts fail with a message
    pub fn fail_connect(&self, message: impl Into<String>) {
        self.state.lock().connect_error = Some(message.into());
    }

    pub fn set_max_power_index(&self, max: u16) {
        self.state.lock().max_power_index = max;
    }

    /// Delay every driver call
    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().latency = latency;
    }

    /// Deliver an event to the installed callback, if any
    ///
    /// Returns `false` when nobody is subscribed.
    pub fn emit(&self, event: DriverEvent) -> bool {
        let handler = self.state.lock().handler.clone();

        match handler {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    /// Deliver a batch of tag reads
    pub fn read_tags(&self, tags: Vec<TagReadEvent>) -> bool {
        self.emit(DriverEvent::TagsRead(tags))
    }

    /// Press or release the handheld trigger
    pub fn trigger(&self, pressed: bool) -> bool {
        self.emit(DriverEvent::Status(StatusEvent::TriggerPressed(pressed)))
    }

    /// Drop the link the way a sled going out of range does
    pub fn drop_link(&self) -> bool {
        {
            let mut state = self.state.lock();
            state.connected = None;
            state.inventory_running = false;
        }
        self.emit(DriverEvent::Status(StatusEvent::Disconnected))
    }

    /// Announce a reader
    pub fn reader_appeared(&self, name: &str) -> bool {
        self.emit(DriverEvent::ReaderAppeared { name: name.into() })
    }

    /// Withdraw a reader
    pub fn reader_disappeared(&self, name: &str) -> bool {
        self.emit(DriverEvent::ReaderDisappeared { name: name.into() })
    }

    /// Reader currently open
    pub fn connected_reader(&self) -> Option<ReaderDescriptor> {
        self.state.lock().connected.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().handler.is_some()
    }

    pub fn inventory_running(&self) -> bool {
        self.state.lock().inventory_running
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Power index currently set on an antenna
    pub fn power(&self, antenna: u16) -> Option<u16> {
        self.state.lock().power.get(&antenna).copied()
    }

    /// Configuration steps accepted so far
    pub fn applied_steps(&self) -> Vec<ConfigStep> {
        self.state.lock().applied_steps.clone()
    }

    /// Names of driver calls, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().calls.clone()
    }

    /// Number of calls with a given name
    pub fn call_count(&self, call: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_discover_per_transport() {
        let (mut driver, handle) = SimulatedDriver::new();
        handle.add_reader(Transport::Usb, "RFD8500");

        assert!(driver.discover(Transport::Bluetooth).await.unwrap().is_empty());
        assert_eq!(driver.discover(Transport::Usb).await.unwrap().len(), 1);

        handle.fail_discovery(Transport::Serial);
        assert!(matches!(
            driver.discover(Transport::Serial).await,
            Err(Error::Discovery { transport: Transport::Serial, .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_and_configure() {
        let (mut driver, handle) = SimulatedDriver::new();
        let reader = handle.add_reader(Transport::Bluetooth, "RFD40+_A");

        driver.connect(&reader).await.unwrap();
        assert_eq!(driver.connect(&reader).await, Err(Error::AlreadyConnected));

        for step in ConfigStep::standard_sequence(1, 270) {
            driver.configure(&step).await.unwrap();
        }

        assert_eq!(handle.applied_steps().len(), 6);
        assert_eq!(handle.power(1), Some(270));
        assert_eq!(driver.antenna_power(1).await.unwrap(), 270);
    }

    #[tokio::test]
    async fn test_failing_step() {
        let (mut driver, handle) = SimulatedDriver::new();
        let reader = handle.add_reader(Transport::Bluetooth, "RFD40+_A");
        handle.fail_step("singulation");

        driver.connect(&reader).await.unwrap();
        let steps = ConfigStep::standard_sequence(1, 100);
        let result = driver.configure(steps.last().unwrap()).await;

        assert!(matches!(result, Err(Error::OperationFailed { operation: "configure", .. })));
    }

    #[tokio::test]
    async fn test_requires_connection() {
        let (mut driver, _handle) = SimulatedDriver::new();
        assert_eq!(driver.start_inventory().await, Err(Error::NotConnected));
        assert_eq!(driver.max_power_index().await, Err(Error::NotConnected));
    }

    #[tokio::test]
    async fn test_events_reach_handler() {
        let (mut driver, handle) = SimulatedDriver::new();
        let seen = Arc::new(AtomicUsize::new(0));

        assert!(!handle.trigger(true));

        let counter = Arc::clone(&seen);
        driver.subscribe(Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(handle.trigger(true));
        assert!(handle.reader_appeared("RFD8500"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        driver.unsubscribe();
        assert!(!handle.trigger(false));
    }

    #[tokio::test]
    async fn test_dispose() {
        let (mut driver, handle) = SimulatedDriver::new();
        driver.dispose().await.unwrap();

        assert!(handle.is_disposed());
        assert_eq!(driver.discover(Transport::Usb).await, Err(Error::Disposed));
    }
}
