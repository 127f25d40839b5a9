//! # Integration Tests for anchor-api
//!
//! Drives the full router against a real SQLite audit file and an in-memory
//! signing identity: the anchoring scenarios, duplicate handling,
//! terminality, readiness gating, the relay, audit queries, probes, and
//! metrics.

use std::sync::Arc;
use std::time::Duration;

use anchor_api::routes::anchoring::{RelayResponse, ValidateResponse};
use anchor_api::routes::health::HealthReport;
use anchor_api::state::{ApiSettings, AppState};
use anchor_chain::{ChainSubmitter, MockSigningIdentity, RpcClient, SignerSlot};
use anchor_core::{AnchorStatus, ProcessingId};
use anchor_store::{AuditLedger, StoreConfig};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const CONTRACT: &str = "0x00000000000000000000000000000000000000aa";

struct Harness {
    _dir: TempDir,
    app: axum::Router,
    ledger: AuditLedger,
    mock: Arc<MockSigningIdentity>,
    signer: SignerSlot,
}

impl Harness {
    /// Install the mock identity (startup unlock completing).
    fn unlock(&self) {
        assert!(self.signer.install(self.mock.clone()));
    }

    async fn status_of(&self, id: &str) -> AnchorStatus {
        self.ledger
            .get(&ProcessingId::new(id).unwrap())
            .await
            .unwrap()
            .status
    }
}

async fn harness_with(
    mock: MockSigningIdentity,
    ready: bool,
    rpc: Option<Arc<RpcClient>>,
    settings: ApiSettings,
) -> Harness {
    let dir = TempDir::new().unwrap();
    let ledger = AuditLedger::open(&StoreConfig::new(dir.path().join("audit.db")))
        .await
        .unwrap();
    let mock = Arc::new(mock);
    let signer = SignerSlot::new();
    let submitter = Arc::new(ChainSubmitter::new(
        signer.clone(),
        CONTRACT,
        Duration::from_secs(5),
    ));
    let state = AppState::new(ledger.clone(), submitter, rpc, settings);
    let harness = Harness {
        _dir: dir,
        app: anchor_api::app(state),
        ledger,
        mock,
        signer,
    };
    if ready {
        harness.unlock();
    }
    harness
}

async fn harness(ready: bool) -> Harness {
    harness_with(MockSigningIdentity::new(), ready, None, ApiSettings::default()).await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn validate_body(id: &str, source: &str, result: &str) -> Value {
    json!({"processingId": id, "sourceHash": source, "resultHash": result})
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn body_string(app: &axum::Router, req: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

// -- Anchoring scenarios ------------------------------------------------------

#[tokio::test]
async fn validate_anchors_and_records_sent() {
    let h = harness(true).await;

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::OK);
    let resp: ValidateResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.status, "SUCCESS");
    assert_eq!(resp.tx_hash, h.mock.tx_hash_for(0).as_str());

    let rec = h.ledger.get(&ProcessingId::new("p1").unwrap()).await.unwrap();
    assert_eq!(rec.status, AnchorStatus::Sent);
    assert_eq!(rec.tx_hash.unwrap().as_str(), resp.tx_hash);
    assert_eq!(h.mock.sent().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicates_submit_once() {
    let h = harness_with(
        MockSigningIdentity::new().with_delay(Duration::from_millis(50)),
        true,
        None,
        ApiSettings::default(),
    )
    .await;

    let a = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb")));
    let b = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb")));
    let ((sa, ba), (sb, bb)) = tokio::join!(a, b);

    assert_eq!(sa, StatusCode::OK);
    assert_eq!(sb, StatusCode::OK);
    assert_eq!(ba["txHash"], bb["txHash"]);
    assert_eq!(h.mock.sent().len(), 1, "exactly one ledger transaction");
    assert_eq!(h.status_of("p1").await, AnchorStatus::Sent);
}

#[tokio::test]
async fn not_ready_fails_and_records_failed() {
    let h = harness(false).await;

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["message"], "Blockchain not ready");
    assert_eq!(body["code"], "NOT_READY");
    assert_eq!(h.status_of("p1").await, AnchorStatus::Failed);
    assert!(h.mock.sent().is_empty());
    assert_eq!(h.mock.nonce_queries(), 0, "submitter never consulted the identity");
}

#[tokio::test]
async fn ledger_rejection_records_failed() {
    let h = harness(true).await;
    h.mock.reject_with("execution reverted: caller is not a validator");

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["code"], "SUBMISSION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("execution reverted"));

    let rec = h.ledger.get(&ProcessingId::new("p1").unwrap()).await.unwrap();
    assert_eq!(rec.status, AnchorStatus::Failed);
    assert!(rec.tx_hash.is_none());
}

#[tokio::test]
async fn disconnected_caller_does_not_strand_the_attempt() {
    let h = harness_with(
        MockSigningIdentity::new().with_delay(Duration::from_millis(200)),
        true,
        None,
        ApiSettings::default(),
    )
    .await;

    let gone = tokio::time::timeout(
        Duration::from_millis(50),
        h.app
            .clone()
            .oneshot(post_json("/validate", validate_body("p1", "0xaa", "0xbb"))),
    )
    .await;
    assert!(gone.is_err(), "caller gave up before the ledger answered");

    tokio::time::sleep(Duration::from_millis(400)).await;
    let rec = h.ledger.get(&ProcessingId::new("p1").unwrap()).await.unwrap();
    assert_eq!(rec.status, AnchorStatus::Sent);
    assert_eq!(rec.tx_hash.as_ref(), Some(&h.mock.tx_hash_for(0)));

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["txHash"], h.mock.tx_hash_for(0).as_str());
    assert_eq!(h.mock.sent().len(), 1);
}

#[tokio::test]
async fn slow_ledger_times_out_as_failed() {
    let dir = TempDir::new().unwrap();
    let ledger = AuditLedger::open(&StoreConfig::new(dir.path().join("audit.db")))
        .await
        .unwrap();
    let mock = Arc::new(MockSigningIdentity::new().with_delay(Duration::from_secs(2)));
    let submitter = Arc::new(ChainSubmitter::new(
        SignerSlot::ready(mock),
        CONTRACT,
        Duration::from_millis(100),
    ));
    let app = anchor_api::app(AppState::new(
        ledger.clone(),
        submitter,
        None,
        ApiSettings::default(),
    ));

    let (status, body) = send(&app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("timed out"));
    let rec = ledger.get(&ProcessingId::new("p1").unwrap()).await.unwrap();
    assert_eq!(rec.status, AnchorStatus::Failed);
}

// -- Validation ---------------------------------------------------------------

#[tokio::test]
async fn malformed_input_creates_no_record() {
    let h = harness(true).await;

    for body in [
        validate_body("", "0xaa", "0xbb"),
        validate_body("p1", "aa", "0xbb"),
        validate_body("p1", "0xaa", "0xzz"),
        json!({"processingId": "p1"}),
    ] {
        let (status, resp) = send(&h.app, post_json("/validate", body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp["status"], "ERROR");
        assert_eq!(resp["code"], "VALIDATION_ERROR");
    }

    let (status, resp) = send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/validate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp["code"], "VALIDATION_ERROR");

    assert!(h.ledger.find(&ProcessingId::new("p1").unwrap()).await.unwrap().is_none());
    assert!(h.mock.sent().is_empty());
}

// -- Terminality --------------------------------------------------------------

#[tokio::test]
async fn sent_record_is_never_resubmitted() {
    let h = harness(true).await;
    let (_, first) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    let (status, second) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["txHash"], second["txHash"]);
    assert_eq!(h.mock.sent().len(), 1);
}

#[tokio::test]
async fn failed_record_stays_failed() {
    let h = harness(true).await;
    h.mock.reject_with("execution reverted");
    send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;
    h.mock.accept();

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("previously failed"));
    assert_eq!(h.status_of("p1").await, AnchorStatus::Failed);
    assert!(h.mock.sent().is_empty());
}

#[tokio::test]
async fn reused_id_with_other_hashes_conflicts() {
    let h = harness(true).await;
    send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xcc"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFLICT");
    let rec = h.ledger.get(&ProcessingId::new("p1").unwrap()).await.unwrap();
    assert_eq!(rec.result_hash.as_str(), "0xbb");
    assert_eq!(h.mock.sent().len(), 1);
}

#[tokio::test]
async fn crash_orphan_is_not_resubmitted() {
    let h = harness(true).await;
    let sub = anchor_core::EvidenceSubmission::parse("p1", "0xaa", "0xbb").unwrap();
    h.ledger.create_pending(&sub).await.unwrap();

    let (status, body) = send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(h.status_of("p1").await, AnchorStatus::Pending);
    assert!(h.mock.sent().is_empty());
}

// -- Readiness ----------------------------------------------------------------

#[tokio::test]
async fn health_follows_unlock() {
    let h = harness(false).await;

    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let report: HealthReport = serde_json::from_value(body).unwrap();
    assert_eq!(report, HealthReport::for_readiness(false));
    let (status, text) = body_string(&h.app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(text, "signing identity locked");

    h.unlock();

    let (_, body) = send(&h.app, get("/health")).await;
    assert_eq!(body["status"], "ALIVE");
    assert_eq!(body["wallet"], "UNLOCKED");
    assert_eq!(body["db_type"], "sqlite");
    let (status, text) = body_string(&h.app, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ready");

    let (status, _) = send(&h.app, post_json("/validate", validate_body("p2", "0xaa", "0xbb"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn liveness_is_always_ok() {
    let h = harness(false).await;
    let (status, text) = body_string(&h.app, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ok");
}

// -- Relay --------------------------------------------------------------------

#[tokio::test]
async fn relay_generates_id_and_anchors() {
    let h = harness(true).await;

    let (status, body) = send(
        &h.app,
        post_json("/relay/anchor", json!({"input_hash": "0xaa", "output_hash": "0xbb"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let resp: RelayResponse = serde_json::from_value(body).unwrap();
    assert_eq!(resp.status, "SUCCESS");
    assert_eq!(resp.timestamp_source, "Local Time");
    assert_eq!(resp.relay_processed_id.len(), 66);
    assert!(resp.relay_processed_id.starts_with("0x"));
    assert_eq!(
        resp.validator_response.unwrap().tx_hash,
        h.mock.tx_hash_for(0).as_str()
    );

    // A 32-byte hex id goes on-chain as-is.
    let sent = h.mock.sent();
    assert_eq!(&sent[0].data[10..74], &resp.relay_processed_id[2..]);
    assert_eq!(h.status_of(&resp.relay_processed_id).await, AnchorStatus::Sent);
}

#[tokio::test]
async fn relay_uses_block_time_when_node_answers() {
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_getBlockByNumber"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"number": "0x2a", "timestamp": "0x6553f100"}
        })))
        .mount(&server)
        .await;
    let rpc = Arc::new(RpcClient::new(server.uri().parse().unwrap(), Duration::from_secs(5)).unwrap());
    let h = harness_with(MockSigningIdentity::new(), true, Some(rpc), ApiSettings::default()).await;

    let (_, body) = send(
        &h.app,
        post_json("/relay/anchor", json!({"input_hash": "0xaa", "output_hash": "0xbb"})),
    )
    .await;

    assert_eq!(body["status"], "SUCCESS");
    assert_eq!(body["timestamp_source"], "Blockchain Block Time");
}

#[tokio::test]
async fn relay_reports_validator_failure_in_band() {
    let h = harness(false).await;

    let (status, body) = send(
        &h.app,
        post_json("/relay/anchor", json!({"input_hash": "0xaa", "output_hash": "0xbb"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["validator_error"]["status"], "ERROR");
    assert_eq!(body["validator_error"]["message"], "Blockchain not ready");
    let id = body["relay_processed_id"].as_str().unwrap();
    assert_eq!(h.status_of(id).await, AnchorStatus::Failed);
}

#[tokio::test]
async fn relay_rejects_malformed_body() {
    let h = harness(true).await;
    let (status, _) = send(&h.app, post_json("/relay/anchor", json!({"input_hash": "0xaa"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn relay_is_rate_limited_per_client() {
    let h = harness_with(
        MockSigningIdentity::new(),
        true,
        None,
        ApiSettings {
            relay_rate_limit_per_minute: 2,
            ..ApiSettings::default()
        },
    )
    .await;

    let relay_from = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/relay/anchor")
            .header("content-type", "application/json")
            .header("cf-connecting-ip", ip)
            .body(Body::from(
                json!({"input_hash": "0xaa", "output_hash": "0xbb"}).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(send(&h.app, relay_from("203.0.113.1")).await.0, StatusCode::OK);
    assert_eq!(send(&h.app, relay_from("203.0.113.1")).await.0, StatusCode::OK);
    let (status, body) = send(&h.app, relay_from("203.0.113.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    assert_eq!(send(&h.app, relay_from("203.0.113.2")).await.0, StatusCode::OK);
    // /validate is not rate limited.
    for i in 0..3 {
        let (status, _) = send(
            &h.app,
            post_json("/validate", validate_body(&format!("v{i}"), "0xaa", "0xbb")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn relay_buckets_direct_clients_by_peer_address() {
    use axum::extract::ConnectInfo;
    use std::net::SocketAddr;

    let h = harness_with(
        MockSigningIdentity::new(),
        true,
        None,
        ApiSettings {
            relay_rate_limit_per_minute: 1,
            ..ApiSettings::default()
        },
    )
    .await;

    let relay_from_peer = |peer: &str| {
        let addr: SocketAddr = peer.parse().unwrap();
        Request::builder()
            .method("POST")
            .uri("/relay/anchor")
            .header("content-type", "application/json")
            .extension(ConnectInfo(addr))
            .body(Body::from(
                json!({"input_hash": "0xaa", "output_hash": "0xbb"}).to_string(),
            ))
            .unwrap()
    };

    assert_eq!(send(&h.app, relay_from_peer("198.51.100.1:40000")).await.0, StatusCode::OK);
    assert_eq!(
        send(&h.app, relay_from_peer("198.51.100.1:40001")).await.0,
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(send(&h.app, relay_from_peer("198.51.100.2:40000")).await.0, StatusCode::OK);
}

// -- Audit queries ------------------------------------------------------------

#[tokio::test]
async fn audit_record_lookup() {
    let h = harness(true).await;
    send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;

    let (status, body) = send(&h.app, get("/v1/audit/p1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processing_id"], "p1");
    assert_eq!(body["status"], "SENT");
    assert_eq!(body["source_hash"], "0xaa");
    assert!(body["tx_hash"].is_string());

    let (status, body) = send(&h.app, get("/v1/audit/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn audit_list_by_status() {
    let h = harness(false).await;
    for id in ["a", "b"] {
        send(&h.app, post_json("/validate", validate_body(id, "0xaa", "0xbb"))).await;
    }
    let sub = anchor_core::EvidenceSubmission::parse("c", "0xaa", "0xbb").unwrap();
    h.ledger.create_pending(&sub).await.unwrap();

    let (status, body) = send(&h.app, get("/v1/audit?status=failed")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FAILED");
    assert_eq!(body["count"], 2);

    let (_, body) = send(&h.app, get("/v1/audit")).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["records"][0]["processing_id"], "c");

    let (_, body) = send(&h.app, get("/v1/audit?status=FAILED&limit=1")).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn audit_list_rejects_bad_query() {
    let h = harness(true).await;
    for uri in [
        "/v1/audit?status=DONE",
        "/v1/audit?limit=0",
        "/v1/audit?limit=1001",
        "/v1/audit?limit=ten",
    ] {
        let (status, body) = send(&h.app, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn metrics_report_outcomes_and_rows() {
    let h = harness(true).await;
    send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;
    send(&h.app, post_json("/validate", validate_body("p1", "0xaa", "0xbb"))).await;
    send(&h.app, post_json("/validate", validate_body("", "0xaa", "0xbb"))).await;

    let (status, text) = body_string(&h.app, get("/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(text.contains("anchor_outcomes_total{outcome=\"sent\"} 1"));
    assert!(text.contains("anchor_outcomes_total{outcome=\"duplicate\"} 1"));
    assert!(text.contains("anchor_outcomes_total{outcome=\"rejected\"} 1"));
    assert!(text.contains("anchor_audit_records{status=\"SENT\"} 1"));
    assert!(text.contains("anchor_audit_records{status=\"PENDING\"} 0"));
    assert!(text.contains("anchor_http_requests_total"));
    assert!(text.contains("path=\"/validate\""));
}

#[tokio::test]
async fn metrics_can_be_disabled() {
    let h = harness_with(
        MockSigningIdentity::new(),
        true,
        None,
        ApiSettings {
            metrics_enabled: false,
            ..ApiSettings::default()
        },
    )
    .await;
    let (status, _) = body_string(&h.app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
