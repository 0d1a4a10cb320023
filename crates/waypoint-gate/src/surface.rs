//! Presentation surface command and observable state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Consumer of the "activate surface with address" command.
pub trait Presenter: Send + Sync {
    fn activate(&self, address: &str);
}

/// What the host UI should currently show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    pub visible: bool,
    pub address: Option<String>,
}

/// Observable surface state. Host UI subscribes and renders the content
/// view when `visible` flips.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    tx: Arc<watch::Sender<SurfaceState>>,
}

impl SurfaceHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SurfaceState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Watch for changes.
    pub fn subscribe(&self) -> watch::Receiver<SurfaceState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> SurfaceState {
        self.tx.borrow().clone()
    }
}

impl Default for SurfaceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for SurfaceHandle {
    fn activate(&self, address: &str) {
        info!(address, "activating content surface");
        self.tx.send_replace(SurfaceState {
            visible: true,
            address: Some(address.to_string()),
        });
    }
}
