//! Waypoint Gate - First-Launch Redirect Decision
//!
//! On the first launch the gate collects device signals, performs one
//! handshake with the bundle-derived domain and either activates a content
//! surface with the returned address or hands control back to the host.
//! The decision is persisted and replayed on every later launch.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use waypoint_gate::{GateConfig, RedirectGate, SurfaceHandle};
//!
//! let surface = SurfaceHandle::new();
//! let gate = RedirectGate::new(
//!     GateConfig::from_env(),
//!     store,
//!     platform,
//!     attribution,
//!     Arc::new(surface.clone()),
//! )?;
//!
//! // Host push registration callback:
//! // gate.relay().deliver_device_token(&bytes);
//!
//! gate.run(Some("com.foo.bar"), || start_main_ui()).await;
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod surface;

pub use config::GateConfig;
pub use error::{Error, Result};
pub use gate::{GateOutcome, GateState, RedirectGate};
pub use surface::{Presenter, SurfaceHandle, SurfaceState};
