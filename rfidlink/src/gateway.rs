//! Named-command gateway
//!
//! Turns `(method, arguments)` requests into manager calls and folds every
//! result into a [`CommandOutcome`]. Nothing escapes: unknown names, bad
//! arguments, errors and panics all come back as failures.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use rfidlink_core::{Command, ErrorKind};
use rfidlink_types::ReaderDescriptor;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

use crate::capability::{CapabilityGate, PermissionStatus};
use crate::error::{Error, Result};
use crate::manager::ReaderManager;

/// Shown with a permission denial
pub const PERMISSIONS_HINT: &str = "Please grant Bluetooth and Location permissions in Settings";

/// Incoming command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub method: String,
    pub arguments: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }
}

/// Value returned by a successful command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Unit,
    Bool(bool),
    Int(i64),
    Text(String),
    Readers(Vec<ReaderDescriptor>),
    Permissions(Vec<PermissionStatus>),
}

/// Result of one command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Success(Payload),
    Failure {
        kind: ErrorKind,
        message: String,
        details: Option<Value>,
    },
}

impl CommandOutcome {
    /// Fold an error into a failure
    pub fn from_error(error: &Error) -> Self {
        let details = match error {
            Error::PermissionsDenied { denied } => Some(json!({
                "deniedPermissions": denied,
                "message": PERMISSIONS_HINT,
            })),
            _ => None,
        };

        Self::Failure {
            kind: error.kind(),
            message: error.to_string(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure kind, if any
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure { .. } => None,
        }
    }
}

/// Command gateway
///
/// # Examples
///
/// ```
/// use rfidlink::{CommandGateway, CommandRequest, ReaderConfig, ReaderManager};
/// use rfidlink_driver::SimulatedDriver;
///
/// #[tokio::main]
/// async fn main() {
///     let (driver, _sim) = SimulatedDriver::new();
///     let gateway = CommandGateway::new(ReaderManager::new(driver, ReaderConfig::default()));
///
///     let outcome = gateway.handle(CommandRequest::new("isConnected")).await;
///     assert!(outcome.is_success());
/// }
/// ```
#[derive(Clone)]
pub struct CommandGateway {
    manager: ReaderManager,
    gate: Arc<CapabilityGate>,
}

impl CommandGateway {
    /// Gateway on a host without runtime permissions
    pub fn new(manager: ReaderManager) -> Self {
        Self::with_gate(manager, Arc::new(CapabilityGate::always_granted()))
    }

    pub fn with_gate(manager: ReaderManager, gate: Arc<CapabilityGate>) -> Self {
        Self { manager, gate }
    }

    pub fn manager(&self) -> &ReaderManager {
        &self.manager
    }

    pub fn gate(&self) -> &Arc<CapabilityGate> {
        &self.gate
    }

    /// Run one command
    pub async fn handle(&self, request: CommandRequest) -> CommandOutcome {
        let command = match request.method.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected command {}", request.method);
                return CommandOutcome::from_error(&Error::from(e));
            }
        };

        debug!("Handling {}", command);

        let result = AssertUnwindSafe(self.dispatch(command, &request.arguments))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(payload)) => CommandOutcome::Success(payload),
            Ok(Err(e)) => {
                if e.kind().is_precondition() {
                    debug!("{} rejected: {}", command, e);
                } else {
                    warn!("{} failed: {}", command, e);
                }
                CommandOutcome::from_error(&e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("{} panicked: {}", command, message);
                CommandOutcome::Failure {
                    kind: ErrorKind::InternalError,
                    message: format!("Error executing {}: {}", command, message),
                    details: None,
                }
            }
        }
    }

    async fn dispatch(&self, command: Command, arguments: &Map<String, Value>) -> Result<Payload> {
        let manager = &self.manager;

        if command.requires_permissions() {
            self.gate.request().await?;
        }

        match command {
            Command::Initialize => {
                manager.initialize().await?;
                Ok(Payload::Unit)
            }
            Command::Connect => {
                let name = optional_str(arguments, "readerName")?;
                let outcome = manager.connect(name).await?;
                Ok(Payload::Text(outcome.to_string()))
            }
            Command::Disconnect => {
                manager.disconnect().await?;
                Ok(Payload::Unit)
            }
            Command::IsConnected => Ok(Payload::Bool(manager.is_connected())),
            Command::StartInventory => {
                manager.start_inventory().await?;
                Ok(Payload::Unit)
            }
            Command::StopInventory => {
                manager.stop_inventory().await?;
                Ok(Payload::Unit)
            }
            Command::SetAntennaPower => {
                let level = required_level(arguments, "powerLevel")?;
                manager.set_antenna_power(level).await?;
                Ok(Payload::Unit)
            }
            Command::GetAntennaPower => {
                let level = manager.antenna_power().await?;
                Ok(Payload::Int(i64::from(level)))
            }
            Command::GetAllAvailableReaders => {
                Ok(Payload::Readers(manager.available_readers().await?))
            }
            Command::GetPlatformVersion => {
                Ok(Payload::Text(manager.config().platform_version.clone()))
            }
            Command::CheckPermissions => Ok(Payload::Bool(self.gate.check())),
            Command::RequestPermissions => {
                self.gate.request().await?;
                Ok(Payload::Permissions(self.gate.status()))
            }
        }
    }
}

// Argument helpers

fn optional_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::invalid_argument(format!(
            "{} must be a string, got {}",
            key, other
        ))),
    }
}

/// Non-negative integer argument
///
/// Values beyond `u32` saturate; the manager range check rejects them.
fn required_level(arguments: &Map<String, Value>, key: &str) -> Result<u32> {
    let value = arguments
        .get(key)
        .ok_or_else(|| Error::invalid_argument(format!("{} is required", key)))?;

    match value.as_u64() {
        Some(n) => Ok(u32::try_from(n).unwrap_or(u32::MAX)),
        None => Err(Error::invalid_argument(format!(
            "{} must be a non-negative integer, got {}",
            key, value
        ))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
