//! # rfidlink
//!
//! Session management for handheld RFID readers.
//!
//! ## Features
//!
//! - Discovery across Bluetooth, USB and serial transports
//! - Single-flight reader lifecycle with driver-initiated disconnects
//! - Single-subscriber event stream (tags, trigger, connection changes)
//! - Named-command gateway with typed error kinds
//! - Runtime permission gate with coalesced prompts
//!
//! ## Quick Start
//!
//! ```no_run
//! use rfidlink::{ReaderConfig, ReaderEvent, ReaderManager};
//! use rfidlink_driver::SimulatedDriver;
//!
//! #[tokio::main]
//! async fn main() -> rfidlink::Result<()> {
//!     let (driver, _sim) = SimulatedDriver::new();
//!     let manager = ReaderManager::new(driver, ReaderConfig::default());
//!     let mut events = manager.dispatcher().subscribe_channel();
//!
//!     // Discover, connect and configure
//!     manager.initialize().await?;
//!     manager.start_inventory().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let ReaderEvent::TagRead { tags } = event {
//!             println!("{} tag(s)", tags.len());
//!         }
//!     }
//!
//!     manager.dispose().await?;
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod manager;

// Re-exports
pub use capability::{AlwaysGranted, CapabilityGate, PermissionPlatform, PermissionStatus, Permissions};
pub use config::ReaderConfig;
pub use dispatcher::{DispatchStats, EventDispatcher, EventSink};
pub use error::{Error, Result};
pub use gateway::{CommandGateway, CommandOutcome, CommandRequest, Payload};
pub use manager::{ConnectOutcome, ReaderManager};

// Re-export types
pub use rfidlink_core::{Command, ErrorKind, SessionSnapshot, SessionState};
pub use rfidlink_driver::{Driver, DriverEvent, SimulatedDriver, SimulatedHandle};
pub use rfidlink_types::{ReaderDescriptor, ReaderEvent, StatusEvent, TagReadEvent, Transport};
