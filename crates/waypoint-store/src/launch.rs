//! Typed launch state over a [`KeyValueStore`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::KeyValueStore;

/// Key of the first-launch-completed marker.
pub const FIRST_LAUNCH_KEY: &str = "waypoint.first_launch_completed";
/// Key of the redirect address saved from a successful handshake.
pub const REDIRECT_ADDRESS_KEY: &str = "waypoint.redirect_address";
/// Key of the last push token delivered by the platform.
pub const PUSH_TOKEN_KEY: &str = "waypoint.push_token";

/// Snapshot of the persisted launch decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchState {
    pub first_launch_completed: bool,
    pub saved_redirect_address: Option<String>,
}

/// Launch state accessor shared by the gate, the coordinator and the token relay.
#[derive(Clone)]
pub struct LaunchStateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl LaunchStateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Read both launch fields.
    pub fn load(&self) -> Result<LaunchState> {
        Ok(LaunchState {
            first_launch_completed: self.first_launch_completed()?,
            saved_redirect_address: self.saved_redirect_address()?,
        })
    }

    // --- First launch marker ---

    pub fn first_launch_completed(&self) -> Result<bool> {
        self.kv.get_bool(FIRST_LAUNCH_KEY)
    }

    /// Set the marker. Never cleared by this crate.
    pub fn mark_first_launch_completed(&self) -> Result<()> {
        self.kv.set_bool(FIRST_LAUNCH_KEY, true)
    }

    // --- Redirect address ---

    pub fn saved_redirect_address(&self) -> Result<Option<String>> {
        Ok(self
            .kv
            .get_string(REDIRECT_ADDRESS_KEY)?
            .filter(|addr| !addr.is_empty()))
    }

    pub fn save_redirect_address(&self, address: &str) -> Result<()> {
        self.kv.set_string(REDIRECT_ADDRESS_KEY, address)
    }

    /// Forget the saved address. The key holds an empty string afterwards,
    /// which reads as absent.
    pub fn clear_redirect_address(&self) -> Result<()> {
        self.kv.set_string(REDIRECT_ADDRESS_KEY, "")
    }

    // --- Push token cache ---

    pub fn cached_push_token(&self) -> Result<Option<String>> {
        Ok(self
            .kv
            .get_string(PUSH_TOKEN_KEY)?
            .filter(|token| !token.is_empty()))
    }

    pub fn save_push_token(&self, token: &str) -> Result<()> {
        self.kv.set_string(PUSH_TOKEN_KEY, token)
    }
}

impl std::fmt::Debug for LaunchStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchStateStore").finish_non_exhaustive()
    }
}
