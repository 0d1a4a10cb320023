//! Collected device signals.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Push token substituted when no real token could be obtained in time.
pub const FALLBACK_PUSH_TOKEN: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One independently resolving source within a join session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    PushToken,
    Attribution,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PushToken => write!(f, "push-token"),
            Self::Attribution => write!(f, "attribution"),
        }
    }
}

/// Signals gathered for one handshake request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSignals {
    pub bundle_id: String,
    pub push_token: Option<String>,
    pub attribution_token: Option<String>,
}

impl DeviceSignals {
    /// Empty accumulator for the given bundle id.
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            ..Default::default()
        }
    }

    /// Record a slot value. `None` leaves the field untouched.
    pub fn record(&mut self, slot: Slot, value: Option<String>) {
        let Some(value) = value else { return };
        match slot {
            Slot::PushToken => self.push_token = Some(value),
            Slot::Attribution => self.attribution_token = Some(value),
        }
    }
}

/// Normalize a host-supplied bundle identifier.
///
/// A missing identifier, or one containing characters outside
/// `[A-Za-z0-9._-]`, becomes the empty string.
pub fn normalize_bundle_id(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim) else {
        return String::new();
    };

    let well_formed = raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if well_formed {
        raw.to_string()
    } else {
        warn!(bundle_id = raw, "malformed bundle identifier, using empty string");
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_token_shape() {
        assert_eq!(FALLBACK_PUSH_TOKEN.len(), 64);
        assert!(FALLBACK_PUSH_TOKEN.chars().all(|c| c == '0'));
    }

    #[test]
    fn record_ignores_absent_values() {
        let mut signals = DeviceSignals::new("com.foo.bar");
        signals.record(Slot::Attribution, None);
        assert_eq!(signals.attribution_token, None);

        signals.record(Slot::Attribution, Some("att-123".into()));
        signals.record(Slot::PushToken, Some("abcd".into()));
        assert_eq!(signals.attribution_token.as_deref(), Some("att-123"));
        assert_eq!(signals.push_token.as_deref(), Some("abcd"));
    }

    #[test]
    fn bundle_id_normalization() {
        assert_eq!(normalize_bundle_id(Some("com.example.App")), "com.example.App");
        assert_eq!(normalize_bundle_id(Some("  com.foo-bar_1 ")), "com.foo-bar_1");
        assert_eq!(normalize_bundle_id(None), "");
        assert_eq!(normalize_bundle_id(Some("com/evil?x=1")), "");
        assert_eq!(normalize_bundle_id(Some("com.ex ample")), "");
    }

    #[test]
    fn slot_display() {
        assert_eq!(format!("{}", Slot::PushToken), "push-token");
        assert_eq!(format!("{}", Slot::Attribution), "attribution");
    }
}
