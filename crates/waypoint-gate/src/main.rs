//! Waypoint Gate binary
//!
//! Runs one launch decision against a RocksDB-backed store. Push is
//! unavailable here; the attribution token comes from the environment.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint_gate::{GateConfig, GateOutcome, RedirectGate, SurfaceHandle};
use waypoint_signals::{HeadlessNotifications, StaticAttribution};
use waypoint_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "waypoint_gate=info,waypoint_signals=info,waypoint_handshake=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GateConfig::from_env();
    tracing::info!(data_dir = %config.data_dir.display(), "Starting Waypoint Gate");

    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    let bundle_id = std::env::var("WAYPOINT_BUNDLE_ID").ok();
    let attribution = std::env::var("WAYPOINT_ATTRIBUTION_TOKEN")
        .ok()
        .filter(|token| !token.is_empty());

    let surface = SurfaceHandle::new();
    let gate = RedirectGate::new(
        config,
        store,
        Arc::new(HeadlessNotifications),
        Arc::new(StaticAttribution(attribution)),
        Arc::new(surface.clone()),
    )?;

    let outcome = gate
        .run(bundle_id.as_deref(), || {
            tracing::info!("continuing to host startup");
        })
        .await;

    match outcome {
        GateOutcome::Redirected(address) => {
            tracing::info!(%address, visible = surface.current().visible, "launch redirected");
        }
        GateOutcome::Continued => tracing::info!("launch continued"),
    }

    Ok(())
}
