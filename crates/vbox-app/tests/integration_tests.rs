// Integration tests for the quotation watcher.
//
// These exercise the full stack through the public APIs: credential store,
// failover dispatcher, typed client, status diffing, and the poller's timer
// and overlap behavior under paused tokio time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, Semaphore};

use vbox_api::{
    HttpClient, HttpError, HttpRequest, HttpResponse, MarketplaceClient, ScriptedHttpClient,
    TraceBuffer,
};
use vbox_app::{CycleOutcome, QuotePoller, StatusChange};
use vbox_core::config::{ApiConfig, PollerConfig};
use vbox_core::db::QUOTE_STATUS_KEY;
use vbox_core::models::QuotationStatus;
use vbox_core::{CredentialStore, Database};

// ===========================================================================
// Test helpers
// ===========================================================================

const PRIMARY: &str = "https://primary.test";
const FALLBACK: &str = "https://fallback.test";
const AUTH: &str = "https://auth.test";

struct Fixture {
    db: Arc<Database>,
    client: Arc<MarketplaceClient>,
    poller: Arc<QuotePoller>,
    events: mpsc::Receiver<StatusChange>,
}

fn fixture(http: Arc<dyn HttpClient>) -> Fixture {
    let db = Arc::new(Database::open(":memory:").unwrap());
    let api = ApiConfig {
        primary_url: PRIMARY.into(),
        fallback_url: FALLBACK.into(),
        auth_url: AUTH.into(),
    };
    let client = Arc::new(MarketplaceClient::new(
        http,
        &api,
        Arc::new(TraceBuffer::new(32)),
        CredentialStore::new(db.clone()),
    ));
    let (tx, rx) = mpsc::channel(16);
    let poller = Arc::new(QuotePoller::new(
        client.clone(),
        db.clone(),
        tx,
        &PollerConfig::default(),
    ));
    Fixture {
        db,
        client,
        poller,
        events: rx,
    }
}

fn page_json(entries: &[(&str, &str)]) -> String {
    let quotations: Vec<_> = entries
        .iter()
        .map(|(n, s)| json!({"quotation_number": n, "status": s}))
        .collect();
    json!({"quotations": quotations, "total": entries.len()}).to_string()
}

/// Let spawned tasks run to their next await point.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Transport that holds every request until a permit is released.
struct GatedHttpClient {
    gate: Semaphore,
    calls: AtomicUsize,
    body: String,
}

impl GatedHttpClient {
    fn new(body: String) -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            body,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl HttpClient for GatedHttpClient {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| HttpError::new("gate closed"))?;
        permit.forget();
        Ok(HttpResponse::ok_json(self.body.clone()))
    }
}

// ===========================================================================
// Timer behavior
// ===========================================================================

#[tokio::test]
async fn armed_poller_fires_immediately_then_every_interval() {
    tokio::time::pause();
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[("Q-1", "pending")])));
    let f = fixture(http.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    settle().await;
    assert_eq!(http.requests().len(), 1, "first cycle runs on arm");

    tokio::time::advance(Duration::from_secs(59)).await;
    settle().await;
    assert_eq!(http.requests().len(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(http.requests().len(), 2);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(http.requests().len(), 3);
}

#[tokio::test]
async fn disarm_stops_future_cycles() {
    tokio::time::pause();
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[])));
    let f = fixture(http.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    settle().await;
    f.poller.disarm();
    assert!(!f.poller.is_armed());

    tokio::time::advance(Duration::from_secs(300)).await;
    settle().await;
    assert_eq!(http.requests().len(), 1);

    // Re-arming starts a fresh schedule with an immediate cycle.
    f.poller.arm();
    settle().await;
    assert_eq!(http.requests().len(), 2);
}

#[tokio::test]
async fn disarm_right_after_arm_still_runs_first_cycle() {
    tokio::time::pause();
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[("Q-1", "pending")])));
    let f = fixture(http.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    f.poller.disarm();
    settle().await;
    assert_eq!(http.requests().len(), 1);

    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    assert_eq!(http.requests().len(), 1);
    assert_eq!(
        f.db.load_state(QUOTE_STATUS_KEY).unwrap(),
        Some(json!({"Q-1": "pending"}))
    );
}

#[tokio::test]
async fn ticks_without_credential_do_not_fetch() {
    tokio::time::pause();
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[])));
    let f = fixture(http.clone());

    f.poller.arm();
    settle().await;
    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    assert!(http.requests().is_empty());

    // Logging in mid-schedule picks up on the next tick.
    f.client.credentials().set("tok");
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn dropping_poller_stops_timer() {
    tokio::time::pause();
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[])));
    let f = fixture(http.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    settle().await;
    drop(f.poller);

    tokio::time::advance(Duration::from_secs(180)).await;
    settle().await;
    assert_eq!(http.requests().len(), 1);
}

// ===========================================================================
// Overlap guard
// ===========================================================================

#[tokio::test]
async fn overlapping_check_is_skipped_not_queued() {
    let gated = Arc::new(GatedHttpClient::new(page_json(&[("Q-1", "pending")])));
    let f = fixture(gated.clone());
    f.client.credentials().set("tok");

    let first = tokio::spawn({
        let poller = f.poller.clone();
        async move { poller.check_for_updates().await }
    });
    settle().await;
    assert!(f.poller.is_polling());
    assert_eq!(gated.calls(), 1);

    assert_eq!(
        f.poller.check_for_updates().await,
        CycleOutcome::AlreadyPolling
    );
    assert_eq!(gated.calls(), 1);

    gated.release();
    assert_eq!(
        first.await.unwrap(),
        CycleOutcome::Completed { changes: 0 }
    );
    assert!(!f.poller.is_polling());

    // The skipped check was dropped, not deferred.
    settle().await;
    assert_eq!(gated.calls(), 1);
}

#[tokio::test]
async fn tick_during_slow_cycle_is_dropped() {
    tokio::time::pause();
    let gated = Arc::new(GatedHttpClient::new(page_json(&[])));
    let f = fixture(gated.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    settle().await;
    assert_eq!(gated.calls(), 1);

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(gated.calls(), 1, "tick while in flight must not fetch");

    gated.release();
    settle().await;
    assert!(!f.poller.is_polling());

    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(gated.calls(), 2);
    gated.release();
}

#[tokio::test]
async fn disarm_lets_in_flight_cycle_finish() {
    let gated = Arc::new(GatedHttpClient::new(page_json(&[("Q-1", "accepted")])));
    let f = fixture(gated.clone());
    f.client.credentials().set("tok");

    f.poller.arm();
    settle().await;
    assert!(f.poller.is_polling());

    f.poller.disarm();
    gated.release();
    settle().await;

    assert!(!f.poller.is_polling());
    assert_eq!(
        f.db.load_state(QUOTE_STATUS_KEY).unwrap(),
        Some(json!({"Q-1": "accepted"}))
    );
}

// ===========================================================================
// End-to-end
// ===========================================================================

#[tokio::test]
async fn login_then_watch_reports_changes_through_fallback() {
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(
        AUTH,
        HttpResponse::ok_json(
            r#"{"success":true,"token":"fresh","user":{"id":"u1","name":"Asha"}}"#,
        ),
    );
    http.respond(PRIMARY, HttpResponse::new(503, "maintenance"));
    http.respond(
        FALLBACK,
        HttpResponse::ok_json(page_json(&[("Q-1", "pending"), ("Q-2", "negotiating")])),
    )
    .respond(
        FALLBACK,
        HttpResponse::ok_json(page_json(&[("Q-1", "converted_to_order"), ("Q-2", "negotiating")])),
    );
    let mut f = fixture(http.clone());

    f.client.verify_otp("a@b.test", "123456").await.unwrap();

    assert_eq!(
        f.poller.check_for_updates().await,
        CycleOutcome::Completed { changes: 0 }
    );
    assert_eq!(
        f.poller.check_for_updates().await,
        CycleOutcome::Completed { changes: 1 }
    );

    let change = f.events.recv().await.unwrap();
    assert_eq!(change.status, QuotationStatus::ConvertedToOrder);
    assert_eq!(change.title(), "📦 Quote Q-1");
    assert_eq!(change.description(), "Status changed to \"Converted to Order\"");
    assert_eq!(change.link(), "/quote/Q-1");

    // Every data call carried the stored token and failed over once.
    let data_calls: Vec<_> = http
        .requests()
        .into_iter()
        .filter(|r| !r.url.starts_with(AUTH))
        .collect();
    assert_eq!(data_calls.len(), 4);
    for request in &data_calls {
        assert_eq!(request.header("authorization"), Some("Bearer fresh"));
    }

    let latest = f.client.traces().latest().unwrap();
    assert!(latest.succeeded);
    assert_eq!(latest.primary().status, Some(503));
    assert_eq!(latest.fallback().unwrap().status, Some(200));
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("vbox.db");
    let db_path = db_path.to_str().unwrap();

    let api = ApiConfig {
        primary_url: PRIMARY.into(),
        fallback_url: FALLBACK.into(),
        auth_url: AUTH.into(),
    };
    let run = |status: &'static str| {
        let http = Arc::new(ScriptedHttpClient::new());
        http.respond(PRIMARY, HttpResponse::ok_json(page_json(&[("Q-7", status)])));
        let db = Arc::new(Database::open(db_path).unwrap());
        let credentials = CredentialStore::new(db.clone());
        let client = Arc::new(MarketplaceClient::new(
            http,
            &api,
            Arc::new(TraceBuffer::new(4)),
            credentials,
        ));
        let (tx, rx) = mpsc::channel(4);
        let poller = QuotePoller::new(client.clone(), db, tx, &PollerConfig::default());
        (client, poller, rx)
    };

    let (client, poller, _rx) = run("pending");
    client.credentials().set("tok");
    assert_eq!(
        poller.check_for_updates().await,
        CycleOutcome::Completed { changes: 0 }
    );
    drop((client, poller));

    // A fresh process sees both the stored token and the stored snapshot.
    let (_client, poller, mut rx) = run("rejected");
    assert_eq!(
        poller.check_for_updates().await,
        CycleOutcome::Completed { changes: 1 }
    );
    assert_eq!(rx.recv().await.unwrap().previous, QuotationStatus::Pending);
}

// ===========================================================================
// Error reporting
// ===========================================================================

#[tokio::test]
async fn rejected_call_reports_every_host_in_error_chain() {
    let http = Arc::new(ScriptedHttpClient::new());
    http.respond(PRIMARY, HttpResponse::new(503, "maintenance"));
    http.respond(FALLBACK, HttpResponse::new(401, r#"{"detail":"Token expired"}"#));
    let f = fixture(http);
    f.client.credentials().set("tok");

    let err = f.client.fetch_quotations(50, 0).await.unwrap_err();
    assert_eq!(err.to_string(), "Token expired");

    // This is what `main` prints when a command fails.
    let report = format!("{:?}", anyhow::Error::from(err));
    assert!(report.starts_with("Token expired"), "{report}");
    assert!(report.contains("request failed for /vboxtrade/quotations/"), "{report}");
    assert!(report.contains("primary: https://primary.test/"), "{report}");
    assert!(report.contains("503"), "{report}");
    assert!(report.contains("fallback: https://fallback.test/"), "{report}");
    assert!(report.contains("401"), "{report}");
}
