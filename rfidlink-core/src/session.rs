//! Session management for a single RFID reader
//!
//! A session represents the logical connection to one reader and tracks:
//! - Lifecycle state
//! - The connected reader descriptor
//! - Maximum antenna power index reported by the reader
//! - Connect time and last failure

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rfidlink_types::ReaderDescriptor;

use crate::error::{Error, Result};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No reader attached
    Disconnected,

    /// Searching transports for readers
    Discovering,

    /// Opening the selected reader
    Connecting,

    /// Connected and configured, idle
    Connected,

    /// Connected with continuous inventory running
    Streaming,

    /// Terminal; all resources released
    Disposed,
}

impl SessionState {
    /// Check if a reader is attached
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Streaming)
    }
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub reader: Option<ReaderDescriptor>,
    pub max_power_index: Option<u16>,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Session state machine
///
/// Thread-safe and can be cloned cheaply (Arc internally). Every
/// transition validates the current state under the write lock, so two
/// racing callers can never both win the same transition.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Current session state
    state: RwLock<SessionState>,

    /// Reader selected for (or attached to) this session
    reader: RwLock<Option<ReaderDescriptor>>,

    /// Max power index (0 when not connected)
    max_power_index: AtomicU16,

    connected_at: RwLock<Option<DateTime<Utc>>>,

    last_error: RwLock<Option<String>>,
}

impl Session {
    /// Create a new disconnected session
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: RwLock::new(SessionState::Disconnected),
                reader: RwLock::new(None),
                max_power_index: AtomicU16::new(0),
                connected_at: RwLock::new(None),
                last_error: RwLock::new(None),
            }),
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if connected (idle or streaming)
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Check if inventory is running
    pub fn is_streaming(&self) -> bool {
        self.state() == SessionState::Streaming
    }

    /// Reader attached to the session, if any
    pub fn reader(&self) -> Option<ReaderDescriptor> {
        self.inner.reader.read().clone()
    }

    /// Maximum power index reported at connect time
    pub fn max_power_index(&self) -> Option<u16> {
        if self.is_connected() {
            Some(self.inner.max_power_index.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Message of the last failed connect attempt
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.read().clone()
    }

    /// Copy of the whole session
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            reader: self.reader(),
            max_power_index: self.max_power_index(),
            connected_at: *self.inner.connected_at.read(),
            last_error: self.last_error(),
        }
    }

    /// Fail unless a reader is attached
    pub fn ensure_connected(&self) -> Result<()> {
        match self.state() {
            SessionState::Connected | SessionState::Streaming => Ok(()),
            SessionState::Disposed => Err(Error::Disposed),
            _ => Err(Error::NotConnected),
        }
    }

    /// Enter discovery
    pub fn begin_discovery(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Disconnected => {
                *state = SessionState::Discovering;
                Ok(())
            }
            SessionState::Disposed => Err(Error::Disposed),
            from => Err(Error::InvalidSessionState {
                from,
                operation: "begin discovery",
            }),
        }
    }

    /// Record the selected reader and start connecting
    pub fn begin_connect(&self, reader: ReaderDescriptor) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Discovering {
            return Err(Error::InvalidSessionState {
                from: *state,
                operation: "begin connect",
            });
        }

        *self.inner.reader.write() = Some(reader);
        *state = SessionState::Connecting;
        Ok(())
    }

    /// Mark the connection established
    pub fn establish(&self, max_power_index: u16) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Connecting {
            return Err(Error::InvalidSessionState {
                from: *state,
                operation: "establish",
            });
        }

        self.inner.max_power_index.store(max_power_index, Ordering::Release);
        *self.inner.connected_at.write() = Some(Utc::now());
        *self.inner.last_error.write() = None;
        *state = SessionState::Connected;

        Ok(())
    }

    /// Abort discovery or connect, recording why
    pub fn fail(&self, error: impl Into<String>) {
        let mut state = self.inner.state.write();

        if matches!(*state, SessionState::Discovering | SessionState::Connecting) {
            *state = SessionState::Disconnected;
            *self.inner.reader.write() = None;
        }

        *self.inner.last_error.write() = Some(error.into());
    }

    /// Connected -> Streaming
    pub fn start_streaming(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Connected | SessionState::Streaming => {
                *state = SessionState::Streaming;
                Ok(())
            }
            SessionState::Disposed => Err(Error::Disposed),
            _ => Err(Error::NotConnected),
        }
    }

    /// Streaming -> Connected
    pub fn stop_streaming(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Connected | SessionState::Streaming => {
                *state = SessionState::Connected;
                Ok(())
            }
            SessionState::Disposed => Err(Error::Disposed),
            _ => Err(Error::NotConnected),
        }
    }

    /// Close session
    ///
    /// Returns the reader that was attached if the session was connected,
    /// so the caller emits exactly one disconnect notification.
    pub fn close(&self) -> Option<ReaderDescriptor> {
        let mut state = self.inner.state.write();
        let was_connected = state.is_connected();

        if *state != SessionState::Disposed {
            *state = SessionState::Disconnected;
        }

        self.inner.max_power_index.store(0, Ordering::Release);
        *self.inner.connected_at.write() = None;
        let reader = self.inner.reader.write().take();

        if was_connected { reader } else { None }
    }

    /// Enter the terminal state
    ///
    /// Returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        let mut state = self.inner.state.write();

        if *state == SessionState::Disposed {
            return false;
        }

        *state = SessionState::Disposed;
        self.inner.max_power_index.store(0, Ordering::Release);
        *self.inner.reader.write() = None;
        *self.inner.connected_at.write() = None;
        true
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
