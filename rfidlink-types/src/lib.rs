//! Type definitions for rfidlink
//!
//! Plain data shared by every layer: transports, discovery descriptors,
//! tag observations and the events pushed to subscribers.

pub mod descriptor;
pub mod error;
pub mod event;
pub mod tag;

pub use descriptor::{ReaderDescriptor, Transport};
pub use error::{Error, Result};
pub use event::{ReaderEvent, StatusEvent};
pub use tag::TagReadEvent;
