//! Error types for rfidlink-core

use std::fmt;

use crate::session::SessionState;

/// Result type alias for rfidlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Caller-facing error category
///
/// Every failure that crosses the command gateway is reported as one of
/// these kinds together with a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or mistyped command argument
    InvalidArgument,

    /// Operation requires a connected reader
    NotConnected,

    /// Several readers found and none could be chosen
    AmbiguousReader,

    /// Discovery found nothing on any transport
    NoReaderFound,

    /// Requested reader name not among discovered readers
    NotFound,

    /// Value beyond the device capability
    OutOfRange,

    /// Required platform permissions were refused
    PermissionsDenied,

    /// Session was disposed
    Disposed,

    /// Command name not recognised
    NotImplemented,

    /// Unexpected driver or platform fault
    InternalError,
}

impl ErrorKind {
    /// Stable code reported to callers
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotConnected => "NOT_CONNECTED",
            Self::AmbiguousReader => "AMBIGUOUS_READER",
            Self::NoReaderFound => "NO_READER_FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::PermissionsDenied => "PERMISSIONS_DENIED",
            Self::Disposed => "DISPOSED",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Check if the failure is caused by the session state rather than
    /// by the request itself
    pub fn is_precondition(self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::AmbiguousReader
                | Self::NoReaderFound
                | Self::NotFound
                | Self::OutOfRange
                | Self::Disposed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Core session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transition not allowed from the current state
    #[error("Cannot {operation} from state {from:?}")]
    InvalidSessionState {
        from: SessionState,
        operation: &'static str,
    },

    /// Reader not connected
    #[error("Reader not connected")]
    NotConnected,

    /// Session disposed
    #[error("Session has been disposed")]
    Disposed,

    /// Discovery came back empty
    #[error("No readers found on any transport")]
    NoReaderFound,

    /// Multiple readers and none matched the allow-list
    #[error("Multiple readers found and none is known: {}", candidates.join(", "))]
    AmbiguousReader {
        candidates: Vec<String>,
    },

    /// Named reader not found
    #[error("Reader not found: {name}")]
    NotFound {
        name: String,
    },

    /// Antenna power index beyond the reader maximum
    #[error("Power index {index} out of range (max: {max})")]
    OutOfRange {
        index: u32,
        max: u16,
    },

    /// Unknown command name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

impl Error {
    /// Caller-facing category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSessionState { .. } => ErrorKind::InternalError,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Disposed => ErrorKind::Disposed,
            Self::NoReaderFound => ErrorKind::NoReaderFound,
            Self::AmbiguousReader { .. } => ErrorKind::AmbiguousReader,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::OutOfRange { .. } => ErrorKind::OutOfRange,
            Self::UnknownCommand(_) => ErrorKind::NotImplemented,
        }
    }
}
