//! Handshake Client - one GET, raw text answer.
//!
//! The endpoint answers with the redirect address as a plain text body, or
//! with an empty body when the host should continue normally. There is no
//! retry: one attempt per first launch.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use waypoint_signals::DeviceSignals;

use crate::error::{Error, Result};
use crate::payload::HandshakePayload;

/// Configuration for the handshake endpoint.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// URL scheme of the endpoint.
    pub scheme: String,

    /// Path of the endpoint on the derived domain.
    pub path: String,

    /// Explicit port. `None` uses the scheme's default.
    pub port: Option<u16>,

    /// Domains pinned to fixed addresses, bypassing DNS.
    pub resolve: Vec<(String, SocketAddr)>,

    /// Top-level suffix appended to the flattened bundle id.
    pub domain_suffix: String,

    /// Bound on the whole request, body included.
    pub request_timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            path: "/indexn.php".to_string(),
            port: None,
            resolve: Vec::new(),
            domain_suffix: "top".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HandshakeConfig {
    /// Set the endpoint scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Set an explicit endpoint port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Pin `domain` to `addr` (staging hosts, local test servers).
    #[must_use]
    pub fn with_resolved(mut self, domain: impl Into<String>, addr: SocketAddr) -> Self {
        self.resolve.push((domain.into(), addr));
        self
    }

    /// Set the domain suffix.
    #[must_use]
    pub fn with_domain_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.domain_suffix = suffix.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Endpoint domain for a bundle id.
    #[must_use]
    pub fn domain_for(&self, bundle_id: &str) -> String {
        derive_domain(bundle_id, &self.domain_suffix)
    }

    /// Full endpoint URL (without the query) on `domain`.
    #[must_use]
    pub fn endpoint(&self, domain: &str) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}{}", self.scheme, domain, port, self.path),
            None => format!("{}://{}{}", self.scheme, domain, self.path),
        }
    }
}

/// Strip every `.` from the bundle id and append `.{suffix}`.
///
/// `com.example.App` with suffix `top` becomes `comexampleApp.top`.
pub fn derive_domain(bundle_id: &str, suffix: &str) -> String {
    let flattened: String = bundle_id.chars().filter(|&c| c != '.').collect();
    format!("{flattened}.{suffix}")
}

/// Turn a response body into a redirect address.
///
/// Surrounding whitespace is ignored. Bodies without an `http://` or
/// `https://` scheme get `https://` prepended. The result must parse as an
/// absolute URL with a host; it is returned as text, not re-serialized.
pub fn normalize_address(body: &str) -> Result<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyBody);
    }

    let lower = trimmed.to_ascii_lowercase();
    let address = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&address).map_err(|e| Error::MalformedResponse(format!("{e}: {trimmed}")))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::MalformedResponse(format!("no host: {trimmed}")));
    }

    Ok(address)
}

/// Result of one handshake. No address means continue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeOutcome {
    pub redirect_address: Option<String>,
}

impl HandshakeOutcome {
    pub fn redirect(address: impl Into<String>) -> Self {
        Self {
            redirect_address: Some(address.into()),
        }
    }

    pub fn proceed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.redirect_address.is_some()
    }
}

/// HTTP client for the handshake endpoint.
#[derive(Debug, Clone)]
pub struct HandshakeClient {
    config: HandshakeConfig,
    http: reqwest::Client,
}

impl HandshakeClient {
    pub fn new(config: HandshakeConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
        for (domain, addr) in &config.resolve {
            builder = builder.resolve(domain, *addr);
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    #[must_use]
    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Perform the handshake, degrading every failure to "continue".
    pub async fn exchange(&self, domain: &str, signals: &DeviceSignals) -> HandshakeOutcome {
        match self.try_exchange(domain, signals).await {
            Ok(address) => {
                info!(%address, "handshake returned redirect address");
                HandshakeOutcome::redirect(address)
            }
            Err(Error::EmptyBody) => {
                info!("handshake returned empty body, continuing");
                HandshakeOutcome::proceed()
            }
            Err(e) => {
                warn!(error = %e, "handshake failed, continuing");
                HandshakeOutcome::proceed()
            }
        }
    }

    /// Perform the handshake, reporting why no address was produced.
    pub async fn try_exchange(&self, domain: &str, signals: &DeviceSignals) -> Result<String> {
        let payload = HandshakePayload::from_signals(signals);
        let endpoint = self.config.endpoint(domain);

        debug!(
            %endpoint,
            has_push = !payload.apns_token.is_empty(),
            has_attribution = !payload.att_token.is_empty(),
            "sending handshake"
        );

        let response = self
            .http
            .get(&endpoint)
            .query(&[("data", payload.encode())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let body = response.text().await?;
        normalize_address(&body)
    }
}
