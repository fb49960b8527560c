//! Driver errors

use rfidlink_types::Transport;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Already connected")]
    AlreadyConnected,
    
    #[error("Discovery failed on {transport}: {message}")]
    Discovery {
        transport: Transport,
        message: String,
    },
    
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    
    #[error("Connection closed by reader")]
    ConnectionClosed,
    
    /// The vendor layer rejected the call (bad parameters for this reader)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
    
    /// The reader reported a failure while executing the call
    #[error("{operation} failed: {message}")]
    OperationFailed {
        operation: &'static str,
        message: String,
    },
    
    #[error("Driver disposed")]
    Disposed,
}

impl Error {
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation,
            message: message.into(),
        }
    }
}
