//! Gate configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};
use waypoint_handshake::HandshakeConfig;
use waypoint_signals::JoinConfig;

/// Configuration for a [`RedirectGate`](crate::RedirectGate).
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Signal collection settings.
    pub join: JoinConfig,

    /// Handshake endpoint settings.
    pub handshake: HandshakeConfig,

    /// Replay the saved decision on later launches. When off, every launch
    /// collects signals and performs the handshake again.
    pub replay_saved_state: bool,

    /// Also run the host continuation after activating the surface.
    pub continue_after_redirect: bool,

    /// Data directory for the persistent store (host harness only).
    pub data_dir: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            join: JoinConfig::default(),
            handshake: HandshakeConfig::default(),
            replay_saved_state: true,
            continue_after_redirect: false,
            data_dir: PathBuf::from("./waypoint-data"),
        }
    }
}

impl GateConfig {
    /// Create config from environment variables with sensible defaults.
    ///
    /// Unparseable values are logged and replaced by their default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let deadline = env_parse::<u64>("WAYPOINT_DEADLINE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.join.deadline);

        let request_timeout = env_parse::<u64>("WAYPOINT_REQUEST_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.handshake.request_timeout);

        let domain_suffix = std::env::var("WAYPOINT_DOMAIN_SUFFIX")
            .ok()
            .map(|s| s.trim().trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.handshake.domain_suffix.clone());

        let reuse_cached_token =
            env_flag("WAYPOINT_REUSE_CACHED_TOKEN").unwrap_or(defaults.join.reuse_cached_token);
        let replay_saved_state =
            env_flag("WAYPOINT_REPLAY_SAVED_STATE").unwrap_or(defaults.replay_saved_state);
        let continue_after_redirect = env_flag("WAYPOINT_CONTINUE_AFTER_REDIRECT")
            .unwrap_or(defaults.continue_after_redirect);

        let data_dir = std::env::var("WAYPOINT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Self {
            join: JoinConfig::default()
                .with_deadline(deadline)
                .with_cached_token_reuse(reuse_cached_token),
            handshake: defaults
                .handshake
                .with_domain_suffix(domain_suffix)
                .with_request_timeout(request_timeout),
            replay_saved_state,
            continue_after_redirect,
            data_dir,
        }
    }

    /// Reject settings the handshake cannot work with.
    pub fn validate(&self) -> Result<()> {
        let scheme = self.handshake.scheme.to_ascii_lowercase();
        if scheme != "https" && scheme != "http" {
            return Err(Error::Config(format!(
                "unsupported scheme: {}",
                self.handshake.scheme
            )));
        }
        if self.handshake.domain_suffix.is_empty() {
            return Err(Error::Config("domain suffix must not be empty".into()));
        }
        if !self.handshake.path.starts_with('/') {
            return Err(Error::Config(format!(
                "endpoint path must start with '/': {}",
                self.handshake.path
            )));
        }
        Ok(())
    }

    /// Set the signal collection config.
    #[must_use]
    pub fn with_join(mut self, join: JoinConfig) -> Self {
        self.join = join;
        self
    }

    /// Set the handshake config.
    #[must_use]
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Set whether later launches replay the saved decision.
    #[must_use]
    pub fn with_replay(mut self, replay: bool) -> Self {
        self.replay_saved_state = replay;
        self
    }

    /// Set whether the host continuation also runs after a redirect.
    #[must_use]
    pub fn with_continue_after_redirect(mut self, enabled: bool) -> Self {
        self.continue_after_redirect = enabled;
        self
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "invalid value, using default");
            None
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    parse_flag(&raw).or_else(|| {
        warn!(key, value = %raw, "invalid flag, using default");
        None
    })
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GateConfig::default();
        assert_eq!(config.join.deadline, Duration::from_secs(15));
        assert_eq!(config.handshake.domain_suffix, "top");
        assert!(config.replay_saved_state);
        assert!(!config.continue_after_redirect);
    }

    #[test]
    fn validation() {
        assert!(GateConfig::default().validate().is_ok());

        let bad_scheme = GateConfig::default()
            .with_handshake(HandshakeConfig::default().with_scheme("ftp"));
        assert!(matches!(bad_scheme.validate(), Err(Error::Config(_))));

        let no_suffix = GateConfig::default()
            .with_handshake(HandshakeConfig::default().with_domain_suffix(""));
        assert!(no_suffix.validate().is_err());
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(parse_flag("true"), Some(true));
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn builder() {
        let config = GateConfig::default()
            .with_join(JoinConfig::default().with_deadline(Duration::from_secs(7)))
            .with_replay(false)
            .with_continue_after_redirect(true);

        assert_eq!(config.join.deadline, Duration::from_secs(7));
        assert!(!config.replay_saved_state);
        assert!(config.continue_after_redirect);
    }
}
