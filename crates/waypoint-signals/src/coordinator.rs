//! Deadline Join Coordinator - fan out to the signal sources, join against one deadline.
//!
//! [`JoinCoordinator::collect`] opens a [`JoinSession`], spawns one task per
//! source plus a deadline timer, and waits for the session's continuation.
//! Every spawned task is attached to the session, so whichever path closes
//! it also tears down the others, including the push-token subscription.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use waypoint_store::LaunchStateStore;

use crate::error::Error;
use crate::relay::TokenRelay;
use crate::session::JoinSession;
use crate::signals::{DeviceSignals, Slot, FALLBACK_PUSH_TOKEN};
use crate::sources::{AttributionSource, NotificationPlatform, PermissionStatus};

/// Configuration for signal collection.
#[derive(Debug, Clone)]
pub struct JoinConfig {
    /// Bound on the whole collection phase, measured from fan-out.
    pub deadline: Duration,

    /// Resolve the push slot from the cached token, when one exists,
    /// without registering or waiting for a live token.
    pub reuse_cached_token: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(15),
            reuse_cached_token: false,
        }
    }
}

impl JoinConfig {
    /// Set the collection deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set whether a cached token short-circuits live collection.
    #[must_use]
    pub fn with_cached_token_reuse(mut self, reuse: bool) -> Self {
        self.reuse_cached_token = reuse;
        self
    }
}

/// Collects [`DeviceSignals`] from the push and attribution sources.
#[derive(Clone)]
pub struct JoinCoordinator {
    config: JoinConfig,
    platform: Arc<dyn NotificationPlatform>,
    attribution: Arc<dyn AttributionSource>,
    relay: TokenRelay,
    store: LaunchStateStore,
}

impl JoinCoordinator {
    pub fn new(
        config: JoinConfig,
        platform: Arc<dyn NotificationPlatform>,
        attribution: Arc<dyn AttributionSource>,
        relay: TokenRelay,
        store: LaunchStateStore,
    ) -> Self {
        Self {
            config,
            platform,
            attribution,
            relay,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    /// Gather signals for `bundle_id`, completing no later than the deadline.
    ///
    /// Never fails: every source failure resolves to an absent or fallback
    /// value. Dropping the returned future cancels the session and its
    /// source tasks.
    pub async fn collect(&self, bundle_id: &str) -> DeviceSignals {
        let cached = match self.store.cached_push_token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to read cached push token");
                None
            }
        };
        // Re-read when applied: a token may have been cached since fan-out.
        let fallback_store = self.store.clone();
        let fallback = move || cached_or_sentinel(&fallback_store);

        let (tx, rx) = oneshot::channel();
        let session = JoinSession::open_with_fallback(
            bundle_id,
            self.config.deadline,
            fallback,
            move |signals| {
                // Receiver gone means the caller stopped waiting.
                let _ = tx.send(signals);
            },
        );
        let _guard = CancelOnDrop(Arc::clone(&session));

        info!(
            bundle_id,
            deadline = ?self.config.deadline,
            has_cached_token = cached.is_some(),
            "collecting device signals"
        );

        let timer = {
            let session = Arc::clone(&session);
            let deadline = session.deadline_at();
            tokio::spawn(async move {
                tokio::time::sleep_until(deadline).await;
                session.expire();
            })
        };
        session.attach(timer.abort_handle());

        let reuse = if self.config.reuse_cached_token { cached } else { None };
        let push = tokio::spawn(acquire_push_token(
            Arc::clone(&session),
            Arc::clone(&self.platform),
            self.relay.clone(),
            reuse,
        ));
        session.attach(push.abort_handle());

        let attribution = tokio::spawn(lookup_attribution(
            Arc::clone(&session),
            Arc::clone(&self.attribution),
        ));
        session.attach(attribution.abort_handle());

        match rx.await {
            Ok(signals) => signals,
            Err(_) => {
                // Only reachable if the session was cancelled underneath us.
                warn!("join session closed without completing");
                DeviceSignals::new(bundle_id)
            }
        }
    }
}

impl std::fmt::Debug for JoinCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

struct CancelOnDrop(Arc<JoinSession>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn cached_or_sentinel(store: &LaunchStateStore) -> String {
    match store.cached_push_token() {
        Ok(Some(token)) => token,
        Ok(None) => FALLBACK_PUSH_TOKEN.to_string(),
        Err(e) => {
            warn!(error = %e, "failed to read cached push token");
            FALLBACK_PUSH_TOKEN.to_string()
        }
    }
}

/// Permission check, registration, then wait for the relay to deliver a token.
async fn acquire_push_token(
    session: Arc<JoinSession>,
    platform: Arc<dyn NotificationPlatform>,
    relay: TokenRelay,
    cached: Option<String>,
) {
    if let Some(token) = cached {
        debug!("reusing cached push token");
        session.resolve(Slot::PushToken, Some(token));
        return;
    }

    let status = platform.authorization_status().await;
    let granted = match status {
        PermissionStatus::Authorized => true,
        PermissionStatus::NotDetermined => platform.request_authorization().await,
        PermissionStatus::Denied => false,
    };

    if !granted {
        debug!(%status, error = %Error::PermissionDenied, "using fallback push token");
        session.resolve_push_fallback();
        return;
    }

    // Subscribe before registering so a token delivered during
    // registration is not missed.
    let mut subscription = relay.subscribe();
    if session.is_closed() {
        return;
    }
    platform.register_for_remote_notifications();
    debug!("registered for remote notifications, waiting for token");

    match subscription.next().await {
        Some(token) => {
            session.resolve(Slot::PushToken, Some(token));
        }
        None => {
            session.resolve_push_fallback();
        }
    }
}

async fn lookup_attribution(session: Arc<JoinSession>, source: Arc<dyn AttributionSource>) {
    let token = match source.lookup().await {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(error = %e, "attribution lookup failed");
            None
        }
    };
    session.resolve(Slot::Attribution, token);
}
