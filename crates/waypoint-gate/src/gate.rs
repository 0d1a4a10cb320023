//! Redirect Gate - first-launch state machine.
//!
//! ```text
//!                  ┌─ flag unset ─> FirstLaunchProcessing ─┬─ address ──> Redirecting
//! NotLaunchedBefore┤                                       └─ none ─────> Continuing
//!                  └─ flag set ───> ReplayingSavedState ───┬─ saved ────> Redirecting
//!                                                          └─ none ─────> Continuing
//! ```
//!
//! The first-launch flag is written before collection starts, so a crash
//! mid-collection does not contact the server again on relaunch.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};
use waypoint_handshake::HandshakeClient;
use waypoint_signals::{
    normalize_bundle_id, AttributionSource, JoinCoordinator, NotificationPlatform, TokenRelay,
};
use waypoint_store::{KeyValueStore, LaunchStateStore};

use crate::config::GateConfig;
use crate::error::Result;
use crate::surface::Presenter;

/// State of the redirect gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NotLaunchedBefore,
    FirstLaunchProcessing,
    ReplayingSavedState,
    /// Terminal: the host continuation ran.
    Continuing,
    /// Terminal: the surface was activated.
    Redirecting,
}

impl GateState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Continuing | Self::Redirecting)
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLaunchedBefore => write!(f, "NotLaunchedBefore"),
            Self::FirstLaunchProcessing => write!(f, "FirstLaunchProcessing"),
            Self::ReplayingSavedState => write!(f, "ReplayingSavedState"),
            Self::Continuing => write!(f, "Continuing"),
            Self::Redirecting => write!(f, "Redirecting"),
        }
    }
}

/// How a launch was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The surface was activated with this address.
    Redirected(String),
    /// The host continued its normal startup.
    Continued,
}

impl GateOutcome {
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirected(_))
    }
}

/// Decides, once per launch, between redirecting and continuing.
pub struct RedirectGate {
    config: GateConfig,
    store: LaunchStateStore,
    relay: TokenRelay,
    coordinator: JoinCoordinator,
    client: HandshakeClient,
    presenter: Arc<dyn Presenter>,
    state: Mutex<GateState>,
}

impl RedirectGate {
    /// Assemble a gate and its collaborators over the host's storage and sources.
    pub fn new(
        config: GateConfig,
        kv: Arc<dyn KeyValueStore>,
        platform: Arc<dyn NotificationPlatform>,
        attribution: Arc<dyn AttributionSource>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self> {
        config.validate()?;

        let store = LaunchStateStore::new(kv);
        let relay = TokenRelay::new(store.clone());
        let coordinator = JoinCoordinator::new(
            config.join.clone(),
            platform,
            attribution,
            relay.clone(),
            store.clone(),
        );
        let client = HandshakeClient::new(config.handshake.clone())?;

        let initial = match store.first_launch_completed() {
            Ok(true) if config.replay_saved_state => GateState::ReplayingSavedState,
            Ok(_) => GateState::NotLaunchedBefore,
            Err(e) => {
                warn!(error = %e, "failed to read launch state");
                GateState::NotLaunchedBefore
            }
        };

        debug!(
            deadline = ?config.join.deadline,
            replay = config.replay_saved_state,
            state = %initial,
            "redirect gate assembled"
        );

        Ok(Self {
            config,
            store,
            relay,
            coordinator,
            client,
            presenter,
            state: Mutex::new(initial),
        })
    }

    /// The relay the host's push registration callback must feed.
    pub fn relay(&self) -> TokenRelay {
        self.relay.clone()
    }

    /// Launch state accessor backing this gate.
    pub fn store(&self) -> &LaunchStateStore {
        &self.store
    }

    /// Current state. Before [`run`](Self::run) this reflects the stored
    /// first-launch flag: `ReplayingSavedState` when a decision will be
    /// replayed, `NotLaunchedBefore` otherwise.
    #[must_use]
    pub fn state(&self) -> GateState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide this launch.
    ///
    /// `on_continue` runs exactly once when the gate does not redirect (and
    /// also after a redirect when `continue_after_redirect` is set). A
    /// missing or malformed bundle id is treated as empty. Never fails:
    /// store, source and network errors all degrade to one of the two
    /// outcomes.
    pub async fn run<F>(&self, bundle_id: Option<&str>, on_continue: F) -> GateOutcome
    where
        F: FnOnce() + Send,
    {
        let bundle_id = normalize_bundle_id(bundle_id);

        let completed = match self.store.first_launch_completed() {
            Ok(completed) => completed,
            Err(e) => {
                warn!(error = %e, "failed to read launch state, continuing");
                return self.proceed(on_continue);
            }
        };

        if completed && self.config.replay_saved_state {
            self.transition(GateState::ReplayingSavedState);
            return match self.store.saved_redirect_address() {
                Ok(Some(address)) => self.redirect(address, on_continue),
                Ok(None) => self.proceed(on_continue),
                Err(e) => {
                    warn!(error = %e, "failed to read saved address, continuing");
                    self.proceed(on_continue)
                }
            };
        }

        self.transition(GateState::FirstLaunchProcessing);
        if let Err(e) = self.store.mark_first_launch_completed() {
            warn!(error = %e, "failed to persist first-launch marker");
        }

        let domain = self.client.config().domain_for(&bundle_id);
        let signals = self.coordinator.collect(&bundle_id).await;
        let outcome = self.client.exchange(&domain, &signals).await;

        match outcome.redirect_address {
            Some(address) => {
                if let Err(e) = self.store.save_redirect_address(&address) {
                    warn!(error = %e, "failed to persist redirect address");
                }
                self.redirect(address, on_continue)
            }
            None => {
                // Only reachable after a completed launch when replay is off.
                if completed {
                    if let Err(e) = self.store.clear_redirect_address() {
                        warn!(error = %e, "failed to clear stale redirect address");
                    }
                }
                self.proceed(on_continue)
            }
        }
    }

    fn redirect<F: FnOnce()>(&self, address: String, on_continue: F) -> GateOutcome {
        self.transition(GateState::Redirecting);
        self.presenter.activate(&address);
        if self.config.continue_after_redirect {
            on_continue();
        }
        GateOutcome::Redirected(address)
    }

    fn proceed<F: FnOnce()>(&self, on_continue: F) -> GateOutcome {
        self.transition(GateState::Continuing);
        on_continue();
        GateOutcome::Continued
    }

    fn transition(&self, next: GateState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            info!(from = %*state, to = %next, "gate transition");
            *state = next;
        }
    }
}

impl std::fmt::Debug for RedirectGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectGate")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
