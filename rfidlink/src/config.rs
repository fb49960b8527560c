//! Reader manager configuration

use std::time::Duration;

use rfidlink_core::constants::{
    DEFAULT_ALLOW_LIST, DEFAULT_ANTENNA_ID, DEFAULT_OPERATION_TIMEOUT, DEFAULT_TRANSPORTS,
};
use rfidlink_types::Transport;

/// Configuration for [`ReaderManager`](crate::ReaderManager)
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rfidlink::ReaderConfig;
/// use rfidlink::Transport;
///
/// let config = ReaderConfig::default()
///     .with_allow_list(["RFD40+"])
///     .with_transports([Transport::Usb])
///     .with_operation_timeout(Duration::from_secs(3));
///
/// assert_eq!(config.transports, vec![Transport::Usb]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Name fragments used to pick a reader when several are found
    pub allow_list: Vec<String>,

    /// Transports tried during discovery, in order
    pub transports: Vec<Transport>,

    /// Antenna whose power and singulation are managed
    pub antenna_id: u16,

    /// Upper bound for any single driver call
    pub operation_timeout: Duration,

    /// Reported by `getPlatformVersion`
    pub platform_version: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
            transports: DEFAULT_TRANSPORTS.to_vec(),
            antenna_id: DEFAULT_ANTENNA_ID,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            platform_version: format!(
                "{} rfidlink/{}",
                std::env::consts::OS,
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl ReaderConfig {
    /// Replace the allow-list
    pub fn with_allow_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_list = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the discovery order
    pub fn with_transports(mut self, transports: impl IntoIterator<Item = Transport>) -> Self {
        self.transports = transports.into_iter().collect();
        self
    }

    pub fn with_antenna(mut self, antenna_id: u16) -> Self {
        self.antenna_id = antenna_id;
        self
    }

    /// Set driver call timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }
}
