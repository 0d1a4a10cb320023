//! Interfaces to the platform signal providers.
//!
//! The host wires these to its notification center and attribution service.
//! The headless implementations here back desktop harnesses where neither
//! exists.

use async_trait::async_trait;

use crate::error::Result;

/// Notification authorization as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Authorized,
    Denied,
    NotDetermined,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authorized => write!(f, "Authorized"),
            Self::Denied => write!(f, "Denied"),
            Self::NotDetermined => write!(f, "NotDetermined"),
        }
    }
}

/// Platform push registration.
///
/// Tokens produced by registration are not returned here; the host feeds
/// them into a [`TokenRelay`](crate::TokenRelay).
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Current authorization status.
    async fn authorization_status(&self) -> PermissionStatus;

    /// Prompt for authorization. Returns whether it was granted.
    async fn request_authorization(&self) -> bool;

    /// Ask the platform to register for remote delivery.
    fn register_for_remote_notifications(&self);
}

/// Install-attribution lookup.
#[async_trait]
pub trait AttributionSource: Send + Sync {
    /// Look up the attribution token. `Ok(None)` means the platform has none.
    async fn lookup(&self) -> Result<Option<String>>;
}

/// Notification platform for hosts without push support. Always denied.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessNotifications;

#[async_trait]
impl NotificationPlatform for HeadlessNotifications {
    async fn authorization_status(&self) -> PermissionStatus {
        PermissionStatus::Denied
    }

    async fn request_authorization(&self) -> bool {
        false
    }

    fn register_for_remote_notifications(&self) {}
}

/// Attribution source returning a fixed value.
#[derive(Debug, Default, Clone)]
pub struct StaticAttribution(pub Option<String>);

#[async_trait]
impl AttributionSource for StaticAttribution {
    async fn lookup(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}
