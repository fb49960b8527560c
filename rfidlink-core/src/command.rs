//! Command names accepted by the gateway

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Gateway commands
///
/// The set is closed; anything else is reported as not implemented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    // Lifecycle
    Initialize,
    Connect,
    Disconnect,
    IsConnected,

    // Inventory
    StartInventory,
    StopInventory,

    // Antenna
    SetAntennaPower,
    GetAntennaPower,

    // Discovery & platform
    GetAllAvailableReaders,
    GetPlatformVersion,
    CheckPermissions,
    RequestPermissions,
}

impl Command {
    /// Every command, in table order
    pub const ALL: [Command; 12] = [
        Self::Initialize,
        Self::Connect,
        Self::Disconnect,
        Self::IsConnected,
        Self::StartInventory,
        Self::StopInventory,
        Self::SetAntennaPower,
        Self::GetAntennaPower,
        Self::GetAllAvailableReaders,
        Self::GetPlatformVersion,
        Self::CheckPermissions,
        Self::RequestPermissions,
    ];

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::IsConnected => "isConnected",
            Self::StartInventory => "startInventory",
            Self::StopInventory => "stopInventory",
            Self::SetAntennaPower => "setAntennaPower",
            Self::GetAntennaPower => "getAntennaPower",
            Self::GetAllAvailableReaders => "getAllAvailableReaders",
            Self::GetPlatformVersion => "getPlatformVersion",
            Self::CheckPermissions => "checkPermissions",
            Self::RequestPermissions => "requestPermissions",
        }
    }

    /// Check if the command needs platform permissions first
    pub fn requires_permissions(self) -> bool {
        matches!(self, Self::Initialize)
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "initialize" => Ok(Self::Initialize),
            "connect" | "connectReader" => Ok(Self::Connect),
            "disconnect" | "disconnectReader" => Ok(Self::Disconnect),
            "isConnected" | "isReaderConnected" => Ok(Self::IsConnected),
            "startInventory" => Ok(Self::StartInventory),
            "stopInventory" => Ok(Self::StopInventory),
            "setAntennaPower" => Ok(Self::SetAntennaPower),
            "getAntennaPower" => Ok(Self::GetAntennaPower),
            "getAllAvailableReaders" => Ok(Self::GetAllAvailableReaders),
            "getPlatformVersion" => Ok(Self::GetPlatformVersion),
            "checkPermissions" => Ok(Self::CheckPermissions),
            "requestPermissions" => Ok(Self::RequestPermissions),
            _ => Err(Error::UnknownCommand(name.to_string())),
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        name.parse()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
