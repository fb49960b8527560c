//! Reader discovery structures

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Physical link used to reach a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Short-range radio (paired sleds such as the RFD40 family)
    Bluetooth,

    /// USB attached reader exposed by the vendor service
    Usb,

    /// Serial port (integrated readers on handheld terminals)
    Serial,
}

impl Transport {
    /// All transports, in default discovery order
    pub const ALL: [Transport; 3] = [Transport::Bluetooth, Transport::Usb, Transport::Serial];

    /// Short lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Self::Bluetooth => "bluetooth",
            Self::Usb => "usb",
            Self::Serial => "serial",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bluetooth" | "bt" => Ok(Self::Bluetooth),
            "usb" => Ok(Self::Usb),
            "serial" => Ok(Self::Serial),
            other => Err(Error::Parse(format!("unknown transport: {}", other))),
        }
    }
}

/// A connectable reader found during discovery
///
/// Descriptors are produced by the driver and consumed by connect; the
/// `handle` is opaque to everything except the driver that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReaderDescriptor {
    /// Advertised reader name (e.g. `RFD40+_211545201D0011`)
    pub name: String,

    /// Transport the reader was discovered on
    pub transport: Transport,

    /// Driver-specific handle used to open a session
    pub handle: String,
}

impl ReaderDescriptor {
    pub fn new(name: impl Into<String>, transport: Transport, handle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport,
            handle: handle.into(),
        }
    }

    /// Case-insensitive substring match against the reader name
    pub fn name_contains(&self, fragment: &str) -> bool {
        self.name
            .to_lowercase()
            .contains(&fragment.to_lowercase())
    }
}

impl fmt::Display for ReaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_parse() {
        assert_eq!("BT".parse::<Transport>().unwrap(), Transport::Bluetooth);
        assert_eq!("usb".parse::<Transport>().unwrap(), Transport::Usb);
        assert!("wifi".parse::<Transport>().is_err());
    }

    #[test]
    fn test_name_contains_ignores_case() {
        let reader = ReaderDescriptor::new("RFD40+_211545201D0011", Transport::Bluetooth, "bt:0");
        assert!(reader.name_contains("rfd40+"));
        assert!(!reader.name_contains("RFD8500"));
    }

    #[test]
    fn test_descriptor_display() {
        let reader = ReaderDescriptor::new("RFD8500", Transport::Serial, "tty0");
        assert_eq!(reader.to_string(), "RFD8500 (serial)");
    }
}
