//! Reader session manager

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use rfidlink_core::{ConfigStep, Session, SessionState, select_reader};
use rfidlink_driver::{Driver, DriverEvent};
use rfidlink_types::{ReaderDescriptor, ReaderEvent, StatusEvent};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::ReaderConfig;
use crate::dispatcher::EventDispatcher;
use crate::error::{Error, Result};

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new session was opened
    Connected(ReaderDescriptor),

    /// A session was already open; nothing changed
    AlreadyConnected(ReaderDescriptor),
}

impl ConnectOutcome {
    pub fn reader(&self) -> &ReaderDescriptor {
        match self {
            Self::Connected(reader) | Self::AlreadyConnected(reader) => reader,
        }
    }
}

impl fmt::Display for ConnectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(reader) => write!(f, "Connected to {}", reader.name),
            Self::AlreadyConnected(reader) => write!(f, "Already connected to {}", reader.name),
        }
    }
}

type PendingInit = Shared<BoxFuture<'static, Result<ConnectOutcome>>>;

/// Driver event tagged with the listener generation that received it
type StampedEvent = (u64, DriverEvent);

/// Reader session manager
///
/// Owns the driver and the session of one physical reader. Every call
/// that reaches the driver goes through a single FIFO gate, so lifecycle
/// changes, power changes and inventory control never overlap. Driver
/// callbacks are queued and handled in order by a background task.
///
/// Cheap to clone; clones share the same session.
///
/// # Examples
///
/// ```
/// use rfidlink::{ReaderConfig, ReaderManager, Transport};
/// use rfidlink_driver::SimulatedDriver;
///
/// #[tokio::main]
/// async fn main() -> rfidlink::Result<()> {
///     let (driver, sim) = SimulatedDriver::new();
///     sim.add_reader(Transport::Bluetooth, "RFD40+_211545201D0011");
///
///     let manager = ReaderManager::new(driver, ReaderConfig::default());
///     let mut events = manager.dispatcher().subscribe_channel();
///
///     manager.initialize().await?;
///     assert!(manager.is_connected());
///     println!("{:?}", events.recv().await);
///
///     manager.dispose().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct ReaderManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: ReaderConfig,
    session: Session,
    dispatcher: Arc<EventDispatcher>,

    /// Single-flight gate around the driver
    driver: Mutex<DriverSlot>,

    /// In-flight `initialize`, shared by concurrent callers
    init: parking_lot::Mutex<Option<PendingInit>>,

    /// Listener generation; bumped whenever the driver callback is removed
    epoch: AtomicU64,

    event_tx: mpsc::UnboundedSender<StampedEvent>,
    event_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<StampedEvent>>>,
    pump: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

struct DriverSlot {
    driver: Box<dyn Driver>,
    subscribed: bool,
}

impl ReaderManager {
    /// Create a manager with its own dispatcher
    pub fn new(driver: impl Driver + 'static, config: ReaderConfig) -> Self {
        Self::with_dispatcher(driver, config, Arc::new(EventDispatcher::new()))
    }

    /// Create a manager publishing through an existing dispatcher
    pub fn with_dispatcher(
        driver: impl Driver + 'static,
        config: ReaderConfig,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(ManagerInner {
                config,
                session: Session::new(),
                dispatcher,
                driver: Mutex::new(DriverSlot {
                    driver: Box::new(driver),
                    subscribed: false,
                }),
                init: parking_lot::Mutex::new(None),
                epoch: AtomicU64::new(0),
                event_tx,
                event_rx: parking_lot::Mutex::new(Some(event_rx)),
                pump: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.inner.config
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// Check if a reader is connected (idle or streaming)
    pub fn is_connected(&self) -> bool {
        self.inner.session.is_connected()
    }

    /// Discover and connect to the default reader
    ///
    /// Does nothing once a reader is connected. Concurrent calls share one
    /// attempt and all receive its outcome. A failure is also published as
    /// an `error` event.
    pub async fn initialize(&self) -> Result<ConnectOutcome> {
        let attempt = {
            let mut init = self.inner.init.lock();

            match init.as_ref() {
                Some(attempt) if attempt.peek().is_none() => {
                    debug!("joining in-flight initialize");
                    attempt.clone()
                }
                _ => {
                    let manager = self.clone();
                    let attempt = async move {
                        let result = manager.open_session(None).await;
                        if let Err(e) = &result {
                            warn!("Failed to initialize: {}", e);
                            manager.inner.dispatcher.publish(ReaderEvent::Error {
                                message: e.to_string(),
                            });
                        }
                        result
                    }
                    .boxed()
                    .shared();

                    *init = Some(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.await;

        let mut init = self.inner.init.lock();
        if init.as_ref().is_some_and(|a| a.peek().is_some()) {
            *init = None;
        }

        result
    }

    /// Connect to a reader, optionally picking it by name
    ///
    /// Returns [`ConnectOutcome::AlreadyConnected`] without touching the
    /// driver if a session is already open, whatever the hint.
    ///
    /// # Errors
    ///
    /// - `NoReaderFound` if discovery finds nothing on any transport
    /// - `NotFound` if no reader matches `name_hint`
    /// - `AmbiguousReader` if several readers match nothing in the allow-list
    /// - driver errors if the reader refuses the connection
    pub async fn connect(&self, name_hint: Option<&str>) -> Result<ConnectOutcome> {
        self.open_session(name_hint).await
    }

    /// Disconnect from the reader
    ///
    /// Always succeeds; a `disconnected` event is published only if a
    /// reader was connected.
    pub async fn disconnect(&self) -> Result<()> {
        let mut slot = self.inner.driver.lock().await;
        self.close(&mut slot).await;
        Ok(())
    }

    /// Release the driver for good
    ///
    /// Later calls fail with `Disposed`; repeat calls are no-ops.
    pub async fn dispose(&self) -> Result<()> {
        let mut slot = self.inner.driver.lock().await;

        if self.inner.session.state() == SessionState::Disposed {
            return Ok(());
        }

        self.close(&mut slot).await;

        if let Err(e) = self.call("dispose", slot.driver.dispose()).await {
            warn!("Error disposing: {}", e);
        }

        self.inner.session.dispose();

        if let Some(pump) = self.inner.pump.lock().take() {
            pump.abort();
        }

        info!("Reader manager disposed");
        Ok(())
    }

    /// Begin continuous inventory
    pub async fn start_inventory(&self) -> Result<()> {
        let mut slot = self.inner.driver.lock().await;
        self.inner.session.ensure_connected()?;

        self.call("start inventory", slot.driver.start_inventory()).await?;
        self.inner.session.start_streaming()?;

        info!("Inventory started");
        Ok(())
    }

    /// End continuous inventory
    pub async fn stop_inventory(&self) -> Result<()> {
        let mut slot = self.inner.driver.lock().await;
        self.inner.session.ensure_connected()?;

        self.call("stop inventory", slot.driver.stop_inventory()).await?;
        self.inner.session.stop_streaming()?;

        info!("Inventory stopped");
        Ok(())
    }

    /// Set the transmit power index of the managed antenna
    ///
    /// # Errors
    ///
    /// `NotConnected` without a reader, `OutOfRange` if `power_index`
    /// exceeds the maximum the reader reported at connect.
    pub async fn set_antenna_power(&self, power_index: u32) -> Result<()> {
        let mut slot = self.inner.driver.lock().await;
        self.inner.session.ensure_connected()?;

        let max = self.inner.session.max_power_index().unwrap_or(0);
        let power_index = u16::try_from(power_index)
            .ok()
            .filter(|index| *index <= max)
            .ok_or(rfidlink_core::Error::OutOfRange {
                index: power_index,
                max,
            })?;

        let antenna = self.inner.config.antenna_id;
        self.call("set antenna power", slot.driver.set_antenna_power(antenna, power_index))
            .await?;

        debug!("Power set to {} on antenna {}", power_index, antenna);
        Ok(())
    }

    /// Current transmit power index of the managed antenna
    pub async fn antenna_power(&self) -> Result<u16> {
        let mut slot = self.inner.driver.lock().await;
        self.inner.session.ensure_connected()?;

        self.call("get antenna power", slot.driver.antenna_power(self.inner.config.antenna_id))
            .await
    }

    /// Every reader reachable on the configured transports
    pub async fn available_readers(&self) -> Result<Vec<ReaderDescriptor>> {
        let mut slot = self.inner.driver.lock().await;

        if self.inner.session.state() == SessionState::Disposed {
            return Err(rfidlink_core::Error::Disposed.into());
        }

        let mut readers = Vec::new();
        for transport in &self.inner.config.transports {
            match self.call("discover", slot.driver.discover(*transport)).await {
                Ok(found) => readers.extend(found),
                Err(e) => debug!("No readers on {}: {}", transport, e),
            }
        }

        Ok(readers)
    }

    // Helper methods

    async fn open_session(&self, name_hint: Option<&str>) -> Result<ConnectOutcome> {
        self.ensure_pump();

        let mut slot = self.inner.driver.lock().await;
        let session = &self.inner.session;

        match session.state() {
            SessionState::Disposed => return Err(rfidlink_core::Error::Disposed.into()),
            state if state.is_connected() => {
                if let Some(reader) = session.reader() {
                    debug!("Already connected to {}", reader.name);
                    return Ok(ConnectOutcome::AlreadyConnected(reader));
                }
            }
            _ => {}
        }

        session.begin_discovery()?;

        match self.establish(&mut slot, name_hint).await {
            Ok(reader) => {
                info!("Connected to {}", reader);
                self.inner.dispatcher.publish(ReaderEvent::Connected {
                    reader: reader.name.clone(),
                });
                Ok(ConnectOutcome::Connected(reader))
            }
            Err(e) => {
                warn!("Connection error: {}", e);
                self.unlisten(&mut slot);
                if slot.driver.is_connected() {
                    if let Err(e) = self.call("disconnect", slot.driver.disconnect()).await {
                        debug!("Cleanup after failed connect: {}", e);
                    }
                }
                session.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn establish(&self, slot: &mut DriverSlot, name_hint: Option<&str>) -> Result<ReaderDescriptor> {
        self.listen(slot);

        let readers = self.discover(slot, name_hint).await?;
        let reader = select_reader(&readers, name_hint, &self.inner.config.allow_list)?.clone();

        self.inner.session.begin_connect(reader.clone())?;

        info!("Connecting to {}...", reader);
        self.call("connect", slot.driver.connect(&reader)).await?;

        let max_power_index = match self.call("query power levels", slot.driver.max_power_index()).await {
            Ok(max) => max,
            Err(e) => {
                warn!("Could not read power levels, antenna power locked at 0: {}", e);
                0
            }
        };

        self.configure(slot, max_power_index).await;
        self.inner.session.establish(max_power_index)?;

        Ok(reader)
    }

    /// Try transports in order; the first with readers wins
    ///
    /// With a name hint, a transport only wins if one of its readers
    /// matches; otherwise the first non-empty list is returned so
    /// selection can report `NotFound`.
    async fn discover(&self, slot: &mut DriverSlot, name_hint: Option<&str>) -> Result<Vec<ReaderDescriptor>> {
        let mut fallback = None;

        for transport in &self.inner.config.transports {
            match self.call("discover", slot.driver.discover(*transport)).await {
                Ok(readers) if readers.is_empty() => debug!("No readers on {}", transport),
                Ok(readers) => {
                    debug!("Found {} reader(s) using {} transport", readers.len(), transport);

                    match name_hint {
                        Some(hint) if !readers.iter().any(|r| r.name_contains(hint)) => {
                            fallback.get_or_insert(readers);
                        }
                        _ => return Ok(readers),
                    }
                }
                Err(e) => debug!("No readers on {}: {}", transport, e),
            }
        }

        Ok(fallback.unwrap_or_default())
    }

    async fn configure(&self, slot: &mut DriverSlot, max_power_index: u16) {
        debug!("Configuring reader");

        for step in ConfigStep::standard_sequence(self.inner.config.antenna_id, max_power_index) {
            match self.call("configure", slot.driver.configure(&step)).await {
                Ok(()) => trace!("Applied {}", step),
                Err(e) => warn!("Error configuring reader ({}): {}", step, e),
            }
        }
    }

    /// Tear down whatever is open; never fails
    async fn close(&self, slot: &mut DriverSlot) {
        self.unlisten(slot);

        if slot.driver.is_connected() {
            if let Err(e) = self.call("disconnect", slot.driver.disconnect()).await {
                warn!("Error disconnecting: {}", e);
            }
        }

        if let Some(reader) = self.inner.session.close() {
            info!("Disconnected from {}", reader.name);
            self.inner.dispatcher.publish(ReaderEvent::Disconnected);
        }
    }

    fn listen(&self, slot: &mut DriverSlot) {
        if slot.subscribed {
            return;
        }

        let tx = self.inner.event_tx.clone();
        let epoch = self.inner.epoch.load(Ordering::Acquire);
        slot.driver.subscribe(Arc::new(move |event| {
            // Runs on the driver's callback thread
            let _ = tx.send((epoch, event));
        }));
        slot.subscribed = true;
    }

    /// Remove the driver callback; events it already queued become stale
    fn unlisten(&self, slot: &mut DriverSlot) {
        if !slot.subscribed {
            return;
        }

        slot.driver.unsubscribe();
        slot.subscribed = false;
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::Acquire) == epoch
    }

    /// Run a driver call under the operation timeout
    async fn call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = rfidlink_driver::Result<T>>,
    ) -> Result<T> {
        let limit = self.inner.config.operation_timeout;

        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(Error::from),
            Err(_) => Err(Error::Timeout {
                operation,
                millis: limit.as_millis() as u64,
            }),
        }
    }

    fn ensure_pump(&self) {
        let Some(rx) = self.inner.event_rx.lock().take() else {
            return;
        };

        let handle = tokio::spawn(pump_events(Arc::downgrade(&self.inner), rx));
        *self.inner.pump.lock() = Some(handle);
    }

    async fn handle_driver_event(&self, epoch: u64, event: DriverEvent) {
        if !self.is_current(epoch) {
            trace!("dropping stale driver event: {:?}", event);
            return;
        }

        let dispatcher = &self.inner.dispatcher;

        match event {
            DriverEvent::TagsRead(tags) => {
                if !tags.is_empty() {
                    dispatcher.publish(ReaderEvent::TagRead { tags });
                }
            }
            DriverEvent::Status(StatusEvent::TriggerPressed(pressed)) => {
                dispatcher.publish(ReaderEvent::Trigger { pressed });
            }
            DriverEvent::Status(StatusEvent::Disconnected) => {
                info!("Reader reported disconnection");
                self.force_disconnect(epoch, None).await;
            }
            DriverEvent::Status(StatusEvent::Unknown(code)) => {
                debug!("Status event: {}", code);
            }
            DriverEvent::ReaderAppeared { name } => {
                debug!("Reader appeared: {}", name);
                dispatcher.publish(ReaderEvent::ReaderAppeared { name });
            }
            DriverEvent::ReaderDisappeared { name } => {
                debug!("Reader disappeared: {}", name);
                dispatcher.publish(ReaderEvent::ReaderDisappeared { name: name.clone() });

                if self.inner.session.reader().is_some_and(|r| r.name == name) {
                    self.force_disconnect(epoch, Some(&name)).await;
                }
            }
        }
    }

    /// Disconnect on behalf of the driver
    ///
    /// Queues behind any in-flight command. Ignored if the listener that
    /// saw the event was removed meanwhile. With a name, only the session
    /// for that reader is closed.
    async fn force_disconnect(&self, epoch: u64, name: Option<&str>) {
        let mut slot = self.inner.driver.lock().await;

        if !self.is_current(epoch) {
            debug!("Ignoring disconnect from a previous session");
            return;
        }

        if let Some(name) = name {
            if !self.inner.session.reader().is_some_and(|r| r.name == name) {
                return;
            }
        }

        self.close(&mut slot).await;
    }
}

async fn pump_events(inner: Weak<ManagerInner>, mut rx: mpsc::UnboundedReceiver<StampedEvent>) {
    while let Some((epoch, event)) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        trace!("driver event: {:?}", event);
        ReaderManager { inner }.handle_driver_event(epoch, event).await;
    }

    trace!("driver event pump stopped");
}
