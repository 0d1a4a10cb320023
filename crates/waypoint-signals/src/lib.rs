//! Waypoint Signals - Device Signal Collection
//!
//! Gathers the device signals sent with the first-launch handshake: the
//! push-notification token and the install-attribution token. Both sources
//! have unbounded, independent latency, so collection is a fan-out joined
//! against one shared deadline.
//!
//! # Overview
//!
//! - [`JoinSession`]: exactly-once completion over two slots and a deadline
//! - [`JoinCoordinator`]: spawns the sources and the timer, awaits the session
//! - [`TokenRelay`]: process-wide "token arrived" event fed by the host
//! - [`NotificationPlatform`] / [`AttributionSource`]: host-provided sources
//!
//! # Guarantees
//!
//! - **Exactly once**: the session continuation fires once for any
//!   interleaving of source arrivals and deadline expiry
//! - **Frozen result**: resolutions after completion are ignored
//! - **No leaked observers**: source tasks are aborted when the session
//!   closes, releasing their token subscriptions
//! - **No errors surface**: failed or denied sources resolve to absent or
//!   fallback values
//!
//! # Example
//!
//! ```rust,ignore
//! use waypoint_signals::{JoinConfig, JoinCoordinator, TokenRelay};
//!
//! let relay = TokenRelay::new(store.clone());
//! let coordinator = JoinCoordinator::new(
//!     JoinConfig::default(),
//!     platform,
//!     attribution,
//!     relay.clone(),
//!     store,
//! );
//!
//! // Host registration callback:
//! // relay.deliver_device_token(&device_token_bytes);
//!
//! let signals = coordinator.collect("com.foo.bar").await;
//! ```

pub mod coordinator;
pub mod error;
pub mod relay;
pub mod session;
pub mod signals;
pub mod sources;

pub use coordinator::{JoinConfig, JoinCoordinator};
pub use error::{Error, Result};
pub use relay::{TokenRelay, TokenSubscription};
pub use session::{JoinSession, SessionState};
pub use signals::{normalize_bundle_id, DeviceSignals, Slot, FALLBACK_PUSH_TOKEN};
pub use sources::{
    AttributionSource, HeadlessNotifications, NotificationPlatform, PermissionStatus,
    StaticAttribution,
};
