//! High-level error types

use rfidlink_core::ErrorKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors are `Clone` so a coalesced operation can hand the same
/// outcome to every caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] rfidlink_core::Error),
    
    #[error("Driver error: {0}")]
    Driver(#[from] rfidlink_driver::Error),
    
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    
    #[error("RFID reader requires permissions to function: {}", denied.join(", "))]
    PermissionsDenied {
        denied: Vec<String>,
    },
    
    #[error("{operation} timed out after {millis}ms")]
    Timeout {
        operation: &'static str,
        millis: u64,
    },
}

impl Error {
    /// Caller-facing category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Core(e) => e.kind(),
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::PermissionsDenied { .. } => ErrorKind::PermissionsDenied,
            Self::Driver(_) | Self::Timeout { .. } => ErrorKind::InternalError,
        }
    }
    
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_driver_faults_are_internal() {
        let err = Error::from(rfidlink_driver::Error::ConnectionClosed);
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.to_string(), "Driver error: Connection closed by reader");
    }
    
    #[test]
    fn test_core_kind_passes_through() {
        let err = Error::from(rfidlink_core::Error::NotConnected);
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        assert_eq!(err.to_string(), "Reader not connected");
    }
}
