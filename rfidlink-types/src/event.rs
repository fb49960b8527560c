//! Status and subscriber events

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tag::TagReadEvent;

/// Reader status notification raised by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Handheld trigger changed (`true` = pressed)
    TriggerPressed(bool),

    /// The reader dropped the link
    Disconnected,

    /// Any other status code, passed through raw
    Unknown(u32),
}

/// Event pushed to the active subscriber
///
/// Serializes as an object tagged by `type`, e.g.
/// `{"type":"trigger","pressed":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ReaderEvent {
    Connected {
        reader: String,
    },

    Disconnected,

    ReaderAppeared {
        name: String,
    },

    ReaderDisappeared {
        name: String,
    },

    TagRead {
        tags: Vec<TagReadEvent>,
    },

    Trigger {
        pressed: bool,
    },

    Error {
        message: String,
    },
}

impl ReaderEvent {
    /// Value of the `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected => "disconnected",
            Self::ReaderAppeared { .. } => "readerAppeared",
            Self::ReaderDisappeared { .. } => "readerDisappeared",
            Self::TagRead { .. } => "tagRead",
            Self::Trigger { .. } => "trigger",
            Self::Error { .. } => "error",
        }
    }
}

impl fmt::Display for ReaderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { reader } => write!(f, "connected({})", reader),
            Self::ReaderAppeared { name } | Self::ReaderDisappeared { name } => {
                write!(f, "{}({})", self.kind(), name)
            }
            Self::TagRead { tags } => write!(f, "tagRead({} tags)", tags.len()),
            Self::Trigger { pressed } => write!(f, "trigger(pressed={})", pressed),
            Self::Error { message } => write!(f, "error({})", message),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}
