//! Process-wide push token relay.
//!
//! The host forwards its platform registration callback here. Every
//! delivered token is cached in the launch store and broadcast to the
//! currently open subscriptions.

use tokio::sync::broadcast;
use tracing::{debug, warn};
use waypoint_store::LaunchStateStore;

const RELAY_CAPACITY: usize = 4;

/// Hub for the "token arrived" event.
#[derive(Debug, Clone)]
pub struct TokenRelay {
    tx: broadcast::Sender<String>,
    store: LaunchStateStore,
}

impl TokenRelay {
    pub fn new(store: LaunchStateStore) -> Self {
        let (tx, _) = broadcast::channel(RELAY_CAPACITY);
        Self { tx, store }
    }

    /// Deliver a raw device token as handed over by the platform.
    ///
    /// The token is rendered as lowercase hex before delivery. Returns the
    /// rendered token.
    pub fn deliver_device_token(&self, raw: &[u8]) -> String {
        let token = hex::encode(raw);
        self.deliver_token(token.clone());
        token
    }

    /// Deliver an already rendered token.
    pub fn deliver_token(&self, token: impl Into<String>) {
        let token = token.into();

        if let Err(e) = self.store.save_push_token(&token) {
            warn!(error = %e, "failed to cache push token");
        }

        // No receivers is fine: the token is cached for the next session.
        let receivers = self.tx.send(token).unwrap_or(0);
        debug!(receivers, "push token delivered");
    }

    /// Subscribe to future token deliveries. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> TokenSubscription {
        TokenSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live registration for token deliveries.
#[derive(Debug)]
pub struct TokenSubscription {
    rx: broadcast::Receiver<String>,
}

impl TokenSubscription {
    /// Wait for the next delivered token. `None` once the relay is gone.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(token) => return Some(token),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "token subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
