//! Shared fixtures for the end-to-end launch tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use waypoint_gate::{GateConfig, Presenter};
use waypoint_handshake::{HandshakeConfig, HandshakePayload};
use waypoint_signals::{NotificationPlatform, PermissionStatus, TokenRelay};
use wiremock::MockServer;

/// Notification platform with a scripted permission answer.
///
/// When `device_token` is set and permission is granted, registration feeds
/// the raw bytes into the relay bound with [`ScriptedPlatform::bind`], the
/// way a host's registration callback would. Rebinding replaces the relay,
/// and [`ScriptedPlatform::unbind`] releases it along with its store.
pub struct ScriptedPlatform {
    status: PermissionStatus,
    grant_on_request: bool,
    device_token: Option<Vec<u8>>,
    relay: Mutex<Option<TokenRelay>>,
    queries: AtomicUsize,
    registrations: AtomicUsize,
}

impl ScriptedPlatform {
    pub fn denied() -> Self {
        Self::new(PermissionStatus::Denied, false, None)
    }

    /// Permission is undetermined and granted when asked.
    pub fn granting(device_token: Option<Vec<u8>>) -> Self {
        Self::new(PermissionStatus::NotDetermined, true, device_token)
    }

    fn new(status: PermissionStatus, grant_on_request: bool, device_token: Option<Vec<u8>>) -> Self {
        Self {
            status,
            grant_on_request,
            device_token,
            relay: Mutex::new(None),
            queries: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
        }
    }

    /// Route registration results into `relay`.
    pub fn bind(&self, relay: TokenRelay) {
        if let Ok(mut bound) = self.relay.lock() {
            *bound = Some(relay);
        }
    }

    /// Drop the bound relay.
    pub fn unbind(&self) {
        if let Ok(mut bound) = self.relay.lock() {
            bound.take();
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationPlatform for ScriptedPlatform {
    async fn authorization_status(&self) -> PermissionStatus {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.status
    }

    async fn request_authorization(&self) -> bool {
        self.grant_on_request
    }

    fn register_for_remote_notifications(&self) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        let relay = self.relay.lock().ok().and_then(|bound| bound.clone());
        if let (Some(bytes), Some(relay)) = (&self.device_token, relay) {
            relay.deliver_device_token(bytes);
        }
    }
}

/// Presenter that records every activation.
#[derive(Default)]
pub struct RecordingPresenter {
    activations: Mutex<Vec<String>>,
}

impl RecordingPresenter {
    pub fn activations(&self) -> Vec<String> {
        self.activations
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

impl Presenter for RecordingPresenter {
    fn activate(&self, address: &str) {
        if let Ok(mut activations) = self.activations.lock() {
            activations.push(address.to_string());
        }
    }
}

/// Gate config whose handshake for `domain` lands on `server`.
pub fn config_for(server: &MockServer, domain: &str) -> GateConfig {
    let addr: SocketAddr = *server.address();
    GateConfig::default().with_handshake(
        HandshakeConfig::default()
            .with_scheme("http")
            .with_port(addr.port())
            .with_resolved(domain, addr),
    )
}

/// Decode the payloads of every handshake `server` has received.
pub async fn received_payloads(server: &MockServer) -> Vec<HandshakePayload> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "data")
                .and_then(|(_, data)| HandshakePayload::decode(&data).ok())
        })
        .collect()
}
