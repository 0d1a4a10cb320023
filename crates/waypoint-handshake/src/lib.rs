//! Waypoint Handshake - Redirect-or-Continue Exchange
//!
//! Sends the collected device signals to `https://{domain}/indexn.php` in a
//! single GET and reads back a plain text body. A non-empty body is the
//! redirect address; anything else means the host continues normally.
//!
//! # Wire format
//!
//! ```text
//! GET https://{domain}/indexn.php?data=base64("apns_token=…&att_token=…&bundle_id=…")
//! ```
//!
//! `domain` is the bundle id with every `.` removed plus a fixed suffix
//! (`com.example.App` → `comexampleApp.top`).

pub mod client;
pub mod error;
pub mod payload;

pub use client::{derive_domain, normalize_address, HandshakeClient, HandshakeConfig, HandshakeOutcome};
pub use error::{Error, Result};
pub use payload::HandshakePayload;
