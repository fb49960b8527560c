//! Default values

use std::time::Duration;

use rfidlink_types::Transport;

/// Name fragments of readers picked automatically when discovery
/// returns more than one device
pub const DEFAULT_ALLOW_LIST: &[&str] = &[
    "RFD40+",
    "RFD4031",
    "RFD8500",
    "TC27", // TC27 with attached RFID sled
];

/// Discovery order
pub const DEFAULT_TRANSPORTS: [Transport; 3] = Transport::ALL;

/// Antenna configured after connect
pub const DEFAULT_ANTENNA_ID: u16 = 1;

/// Upper bound for a single driver call
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);
