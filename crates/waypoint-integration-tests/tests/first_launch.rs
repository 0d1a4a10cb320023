//! End-to-end launch tests: real handshake over HTTP, gate state persisted
//! through the store, sources scripted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use waypoint_gate::{GateConfig, GateOutcome, GateState, RedirectGate, SurfaceHandle};
use waypoint_integration_tests::{config_for, received_payloads, RecordingPresenter, ScriptedPlatform};
use waypoint_signals::{JoinConfig, StaticAttribution, FALLBACK_PUSH_TOKEN};
use waypoint_store::{KeyValueStore, LaunchStateStore, MemoryStore, RocksStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BUNDLE: &str = "com.foo.bar";
const DOMAIN: &str = "comfoobar.top";

async fn server_replying(status: u16, body: &'static str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexn.php"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn gate(
    config: GateConfig,
    kv: Arc<dyn KeyValueStore>,
    platform: &Arc<ScriptedPlatform>,
    attribution: Option<&str>,
    presenter: &Arc<RecordingPresenter>,
) -> RedirectGate {
    let gate = RedirectGate::new(
        config,
        kv,
        platform.clone(),
        Arc::new(StaticAttribution(attribution.map(str::to_string))),
        presenter.clone(),
    )
    .unwrap();
    platform.bind(gate.relay());
    gate
}

#[tokio::test]
async fn denied_push_with_attribution_redirects() {
    let server = server_replying(200, "https://promo.example").await;
    let kv = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());

    let gate = gate(config_for(&server, DOMAIN), kv.clone(), &platform, Some("att-123"), &presenter);

    let mut continued = false;
    let outcome = gate.run(Some(BUNDLE), || continued = true).await;

    assert_eq!(outcome, GateOutcome::Redirected("https://promo.example".into()));
    assert!(!continued);
    assert_eq!(presenter.activations(), vec!["https://promo.example".to_string()]);
    assert_eq!(platform.registrations(), 0);

    let payloads = received_payloads(&server).await;
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].apns_token, FALLBACK_PUSH_TOKEN);
    assert_eq!(payloads[0].att_token, "att-123");
    assert_eq!(payloads[0].bundle_id, BUNDLE);

    let state = LaunchStateStore::new(kv).load().unwrap();
    assert!(state.first_launch_completed);
    assert_eq!(state.saved_redirect_address.as_deref(), Some("https://promo.example"));
}

#[tokio::test]
async fn granted_push_token_reaches_the_server() {
    let server = server_replying(200, "promo.example/landing").await;
    let kv = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::granting(Some(vec![0xde, 0xad, 0xbe, 0xef])));
    let presenter = Arc::new(RecordingPresenter::default());

    let gate = gate(config_for(&server, DOMAIN), kv.clone(), &platform, None, &presenter);
    let outcome = gate.run(Some(BUNDLE), || {}).await;

    // Scheme-less bodies are normalized before activation and persistence.
    assert_eq!(outcome, GateOutcome::Redirected("https://promo.example/landing".into()));
    assert_eq!(platform.registrations(), 1);

    let payloads = received_payloads(&server).await;
    assert_eq!(payloads[0].apns_token, "deadbeef");
    assert_eq!(payloads[0].att_token, "");

    let store = LaunchStateStore::new(kv);
    assert_eq!(store.cached_push_token().unwrap().as_deref(), Some("deadbeef"));
    assert_eq!(
        store.saved_redirect_address().unwrap().as_deref(),
        Some("https://promo.example/landing")
    );
}

#[tokio::test]
async fn silent_push_source_is_cut_off_by_deadline() {
    let server = server_replying(200, "").await;
    let platform = Arc::new(ScriptedPlatform::granting(None));
    let presenter = Arc::new(RecordingPresenter::default());
    let config = config_for(&server, DOMAIN)
        .with_join(JoinConfig::default().with_deadline(Duration::from_millis(200)));

    let gate = gate(config, Arc::new(MemoryStore::new()), &platform, Some("att-9"), &presenter);

    let started = Instant::now();
    let outcome = gate.run(Some(BUNDLE), || {}).await;

    assert_eq!(outcome, GateOutcome::Continued);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(gate.relay().subscriber_count(), 0);

    let payloads = received_payloads(&server).await;
    assert_eq!(payloads[0].apns_token, FALLBACK_PUSH_TOKEN);
    assert_eq!(payloads[0].att_token, "att-9");
}

#[tokio::test]
async fn empty_body_continues_once() {
    let server = server_replying(200, "  \n").await;
    let kv = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());

    let gate = gate(config_for(&server, DOMAIN), kv.clone(), &platform, None, &presenter);

    let mut continuations = 0;
    let outcome = gate.run(Some(BUNDLE), || continuations += 1).await;

    assert_eq!(outcome, GateOutcome::Continued);
    assert_eq!(continuations, 1);
    assert_eq!(gate.state(), GateState::Continuing);
    assert!(presenter.activations().is_empty());

    let state = LaunchStateStore::new(kv).load().unwrap();
    assert!(state.first_launch_completed);
    assert_eq!(state.saved_redirect_address, None);
}

#[tokio::test]
async fn server_error_continues_without_saving() {
    let server = server_replying(503, "https://promo.example").await;
    let kv = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());

    let gate = gate(config_for(&server, DOMAIN), kv.clone(), &platform, None, &presenter);
    let outcome = gate.run(Some(BUNDLE), || {}).await;

    assert_eq!(outcome, GateOutcome::Continued);
    assert!(presenter.activations().is_empty());
    assert_eq!(LaunchStateStore::new(kv).saved_redirect_address().unwrap(), None);
}

#[tokio::test]
async fn unreachable_server_continues() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = GateConfig::default().with_handshake(
        waypoint_handshake::HandshakeConfig::default()
            .with_scheme("http")
            .with_port(addr.port())
            .with_resolved(DOMAIN, addr)
            .with_request_timeout(Duration::from_secs(2)),
    );
    let kv = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());

    let gate = gate(config, kv.clone(), &platform, None, &presenter);
    let outcome = gate.run(Some(BUNDLE), || {}).await;

    assert_eq!(outcome, GateOutcome::Continued);
    assert!(LaunchStateStore::new(kv).first_launch_completed().unwrap());
}

#[tokio::test]
async fn later_launches_replay_without_contacting_server() {
    let server = server_replying(200, "https://promo.example").await;
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());

    for _ in 0..3 {
        let gate = gate(config_for(&server, DOMAIN), kv.clone(), &platform, None, &presenter);
        let outcome = gate.run(Some(BUNDLE), || {}).await;
        assert_eq!(outcome, GateOutcome::Redirected("https://promo.example".into()));
    }

    assert_eq!(received_payloads(&server).await.len(), 1);
    assert_eq!(platform.queries(), 1);
    assert_eq!(presenter.activations().len(), 3);
}

#[tokio::test]
async fn decision_survives_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let server = server_replying(200, "https://promo.example").await;
    let presenter = Arc::new(RecordingPresenter::default());

    {
        let platform = Arc::new(ScriptedPlatform::denied());
        let kv = Arc::new(RocksStore::open(dir.path()).unwrap());
        let gate = gate(config_for(&server, DOMAIN), kv, &platform, None, &presenter);
        gate.run(Some(BUNDLE), || {}).await;
    }

    // The database lock is only free once every handle from the first launch is gone.
    let platform = Arc::new(ScriptedPlatform::denied());
    let kv = Arc::new(RocksStore::open(dir.path()).unwrap());
    let gate = gate(config_for(&server, DOMAIN), kv, &platform, None, &presenter);
    let outcome = gate.run(Some(BUNDLE), || {}).await;

    assert_eq!(outcome, GateOutcome::Redirected("https://promo.example".into()));
    assert_eq!(received_payloads(&server).await.len(), 1);
    assert_eq!(platform.queries(), 0);
}

#[tokio::test]
async fn finished_gate_releases_its_store() {
    let server = server_replying(200, "").await;
    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());
    let kv = Arc::new(MemoryStore::new());
    let weak = Arc::downgrade(&kv);

    let gate = gate(config_for(&server, DOMAIN), kv, &platform, None, &presenter);
    gate.run(Some(BUNDLE), || {}).await;
    drop(gate);

    // The platform still holds the relay, and through it the store.
    assert!(weak.upgrade().is_some());
    platform.unbind();
    assert!(weak.upgrade().is_none());
}

#[tokio::test]
async fn cached_token_takes_precedence_over_sentinel() {
    let server = server_replying(200, "").await;
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    LaunchStateStore::new(kv.clone()).save_push_token("cafe01").unwrap();

    let platform = Arc::new(ScriptedPlatform::denied());
    let presenter = Arc::new(RecordingPresenter::default());
    let gate = gate(config_for(&server, DOMAIN), kv, &platform, None, &presenter);
    gate.run(Some(BUNDLE), || {}).await;

    let payloads = received_payloads(&server).await;
    assert_eq!(payloads[0].apns_token, "cafe01");
}

#[tokio::test]
async fn surface_handle_observes_redirect() {
    let server = server_replying(200, "https://promo.example").await;
    let platform = Arc::new(ScriptedPlatform::denied());
    let surface = SurfaceHandle::new();
    let mut rx = surface.subscribe();

    let gate = RedirectGate::new(
        config_for(&server, DOMAIN),
        Arc::new(MemoryStore::new()),
        platform.clone(),
        Arc::new(StaticAttribution(None)),
        Arc::new(surface.clone()),
    )
    .unwrap();
    gate.run(Some(BUNDLE), || {}).await;

    rx.changed().await.unwrap();
    let state = rx.borrow().clone();
    assert!(state.visible);
    assert_eq!(state.address.as_deref(), Some("https://promo.example"));
}
