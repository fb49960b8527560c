//! Device driver layer for rfidlink
//!
//! The [`Driver`] trait is the seam between the session manager and the
//! vendor reader SDK. Adapters translate each call into vendor calls and
//! push reader callbacks through an [`EventHandler`].

pub mod error;
pub mod sim;

pub use error::{Error, Result};
pub use sim::{SimulatedDriver, SimulatedHandle};

use std::sync::Arc;

use async_trait::async_trait;
use rfidlink_core::ConfigStep;
use rfidlink_types::{ReaderDescriptor, StatusEvent, TagReadEvent, Transport};

/// Notification raised by the driver on its own callback thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// A reader became reachable
    ReaderAppeared { name: String },

    /// A reader went away
    ReaderDisappeared { name: String },

    /// Tags drained after a read notification
    TagsRead(Vec<TagReadEvent>),

    /// Trigger, link loss and other status codes
    Status(StatusEvent),
}

/// Callback installed through [`Driver::subscribe`]
///
/// Invoked on the driver's callback thread; implementations must return
/// without blocking.
pub type EventHandler = Arc<dyn Fn(DriverEvent) + Send + Sync>;

/// Reader driver adapter
///
/// Calls may be long-running; adapters over blocking vendor APIs should
/// run them on `tokio::task::spawn_blocking`. The session manager owns the
/// driver exclusively and never issues two calls at once.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait Driver: Send + Sync {
    /// List readers reachable over one transport
    async fn discover(&mut self, transport: Transport) -> Result<Vec<ReaderDescriptor>>;

    /// Open a reader returned by [`discover`](Self::discover)
    async fn connect(&mut self, reader: &ReaderDescriptor) -> Result<()>;

    /// Close the open reader
    async fn disconnect(&mut self) -> Result<()>;

    /// Check if a reader is open
    fn is_connected(&self) -> bool;

    /// Apply one configuration step
    async fn configure(&mut self, step: &ConfigStep) -> Result<()>;

    /// Highest transmit power index the reader supports
    async fn max_power_index(&mut self) -> Result<u16>;

    /// Current transmit power index of an antenna
    async fn antenna_power(&mut self, antenna: u16) -> Result<u16>;

    /// Change the transmit power index of an antenna
    async fn set_antenna_power(&mut self, antenna: u16, power_index: u16) -> Result<()>;

    /// Begin continuous inventory
    async fn start_inventory(&mut self) -> Result<()>;

    /// End continuous inventory
    async fn stop_inventory(&mut self) -> Result<()>;

    /// Install the event callback, replacing any previous one
    fn subscribe(&mut self, handler: EventHandler);

    /// Remove the event callback
    fn unsubscribe(&mut self);

    /// Release all SDK resources
    async fn dispose(&mut self) -> Result<()>;
}
