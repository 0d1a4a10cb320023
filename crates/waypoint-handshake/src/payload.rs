//! Handshake request payload.
//!
//! The payload is a fixed-order query string,
//! `apns_token=…&att_token=…&bundle_id=…`, base64-encoded as a whole and
//! sent as the `data` query parameter.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use waypoint_signals::DeviceSignals;

use crate::error::{Error, Result};

/// Field values of one handshake request. Missing signals are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub apns_token: String,
    pub att_token: String,
    pub bundle_id: String,
}

impl HandshakePayload {
    pub fn from_signals(signals: &DeviceSignals) -> Self {
        Self {
            apns_token: signals.push_token.clone().unwrap_or_default(),
            att_token: signals.attribution_token.clone().unwrap_or_default(),
            bundle_id: signals.bundle_id.clone(),
        }
    }

    /// The plain query string, fields in wire order.
    #[must_use]
    pub fn query_string(&self) -> String {
        format!(
            "apns_token={}&att_token={}&bundle_id={}",
            self.apns_token, self.att_token, self.bundle_id
        )
    }

    /// The value sent as the `data` parameter.
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(self.query_string())
    }

    /// Parse an encoded `data` parameter back into its fields.
    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| Error::InvalidPayload(e.to_string()))?;
        let query =
            String::from_utf8(bytes).map_err(|e| Error::InvalidPayload(e.to_string()))?;

        let missing = |field: &str| Error::InvalidPayload(format!("missing {field}"));

        let rest = query.strip_prefix("apns_token=").ok_or_else(|| missing("apns_token"))?;
        let (apns_token, rest) = rest.split_once("&att_token=").ok_or_else(|| missing("att_token"))?;
        let (att_token, bundle_id) = rest.split_once("&bundle_id=").ok_or_else(|| missing("bundle_id"))?;

        Ok(Self {
            apns_token: apns_token.to_string(),
            att_token: att_token.to_string(),
            bundle_id: bundle_id.to_string(),
        })
    }
}
