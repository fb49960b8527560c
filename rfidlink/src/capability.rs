//! Platform permission gate
//!
//! Readers are reached over Bluetooth, which on mobile platforms needs
//! runtime permissions. The host platform is abstracted as a
//! [`PermissionPlatform`]; [`CapabilityGate`] adds the "only one prompt at
//! a time" rule on top of it.

use std::sync::Arc;

use async_trait::async_trait;
use bitflags::bitflags;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// First API level with the split Bluetooth scan/connect permissions
pub const SPLIT_BLUETOOTH_API_LEVEL: u32 = 31;

bitflags! {
    /// Runtime permissions a reader connection may need
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u8 {
        const BLUETOOTH = 1;
        const BLUETOOTH_ADMIN = 1 << 1;
        const BLUETOOTH_SCAN = 1 << 2;
        const BLUETOOTH_CONNECT = 1 << 3;
        const FINE_LOCATION = 1 << 4;
        const COARSE_LOCATION = 1 << 5;
    }
}

impl Permissions {
    /// Permission set needed on a given platform API level
    pub fn required_for_api_level(api_level: u32) -> Self {
        let location = Self::FINE_LOCATION | Self::COARSE_LOCATION;

        if api_level >= SPLIT_BLUETOOTH_API_LEVEL {
            Self::BLUETOOTH_SCAN | Self::BLUETOOTH_CONNECT | location
        } else {
            Self::BLUETOOTH | Self::BLUETOOTH_ADMIN | location
        }
    }

    /// Display name of a single permission
    pub fn label(self) -> &'static str {
        const LABELS: [(Permissions, &str); 6] = [
            (Permissions::BLUETOOTH, "Bluetooth"),
            (Permissions::BLUETOOTH_ADMIN, "Bluetooth Admin"),
            (Permissions::BLUETOOTH_SCAN, "Bluetooth Scan"),
            (Permissions::BLUETOOTH_CONNECT, "Bluetooth Connect"),
            (Permissions::FINE_LOCATION, "Fine Location"),
            (Permissions::COARSE_LOCATION, "Coarse Location"),
        ];

        LABELS
            .iter()
            .find(|(flag, _)| *flag == self)
            .map_or("Multiple", |(_, label)| *label)
    }

    /// Display names of every permission in the set
    pub fn labels(self) -> Vec<String> {
        self.iter().map(|p| p.label().to_string()).collect()
    }
}

/// Grant state of one permission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionStatus {
    pub permission: String,
    pub granted: bool,
}

/// Host platform authorization
#[async_trait]
pub trait PermissionPlatform: Send + Sync {
    /// Permissions the reader needs on this platform
    fn required(&self) -> Permissions;

    /// Permissions currently granted
    fn granted(&self) -> Permissions;

    /// Ask the user for `missing`; resolves with what is granted afterwards
    async fn prompt(&self, missing: Permissions) -> Permissions;
}

/// Platform without runtime permissions
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionPlatform for AlwaysGranted {
    fn required(&self) -> Permissions {
        Permissions::empty()
    }

    fn granted(&self) -> Permissions {
        Permissions::all()
    }

    async fn prompt(&self, _missing: Permissions) -> Permissions {
        Permissions::all()
    }
}

type PendingRequest = Shared<BoxFuture<'static, Result<()>>>;

/// Permission check with single-flight prompting
pub struct CapabilityGate {
    platform: Arc<dyn PermissionPlatform>,
    pending: Mutex<Option<PendingRequest>>,
}

impl CapabilityGate {
    pub fn new(platform: Arc<dyn PermissionPlatform>) -> Self {
        Self {
            platform,
            pending: Mutex::new(None),
        }
    }

    /// Gate that never prompts
    pub fn always_granted() -> Self {
        Self::new(Arc::new(AlwaysGranted))
    }

    /// Required permissions not yet granted
    pub fn missing(&self) -> Permissions {
        self.platform.required() - self.platform.granted()
    }

    /// Check if everything required is granted
    pub fn check(&self) -> bool {
        self.missing().is_empty()
    }

    /// Per-permission grant state
    pub fn status(&self) -> Vec<PermissionStatus> {
        let granted = self.platform.granted();

        self.platform
            .required()
            .iter()
            .map(|p| PermissionStatus {
                permission: p.label().to_string(),
                granted: granted.contains(p),
            })
            .collect()
    }

    /// Make sure all required permissions are granted, prompting if needed
    ///
    /// A call made while a prompt is already showing waits for that prompt
    /// and gets the same outcome.
    pub async fn request(&self) -> Result<()> {
        if self.check() {
            return Ok(());
        }

        let request = {
            let mut pending = self.pending.lock();

            match pending.as_ref() {
                Some(request) if request.peek().is_none() => {
                    debug!("joining pending permission request");
                    request.clone()
                }
                _ => {
                    let request = Self::prompt(Arc::clone(&self.platform)).boxed().shared();
                    *pending = Some(request.clone());
                    request
                }
            }
        };

        let result = request.await;

        let mut pending = self.pending.lock();
        if pending.as_ref().is_some_and(|r| r.peek().is_some()) {
            *pending = None;
        }

        result
    }

    async fn prompt(platform: Arc<dyn PermissionPlatform>) -> Result<()> {
        let missing = platform.required() - platform.granted();
        info!("Requesting permissions: {:?}", missing.labels());

        let granted = platform.prompt(missing).await;
        let denied = missing - granted;

        if denied.is_empty() {
            info!("Permissions granted");
            Ok(())
        } else {
            warn!("Permissions denied: {:?}", denied.labels());
            Err(Error::PermissionsDenied {
                denied: denied.labels(),
            })
        }
    }
}
