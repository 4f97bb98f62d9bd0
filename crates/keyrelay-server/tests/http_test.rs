//! End-to-end tests: a real keyrelay server in front of a mock upstream that
//! stands in for both the Anthropic and ElevenLabs APIs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use keyrelay_config::{ClientKeyConfig, Config, Secrets};
use keyrelay_server::{AppState, CancellationToken, serve};
use keyrelay_store::{JsonFileStore, MemoryKeyStore};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const K0: &str = "sk-ant-key-zero";
const K1: &str = "sk-ant-key-one";
const BAD_KEY: &str = "sk-ant-revoked";
const ADMIN: &str = "hunter2";

// ============================================================================
// Mock upstream
// ============================================================================

#[derive(Clone, Default)]
struct Seen {
    chats: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn mock_messages(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    seen.chats.lock().push((headers.clone(), body.clone()));

    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(BAD_KEY) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })),
        )
            .into_response();
    }

    if body["stream"] == true {
        let sse = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        return ([("content-type", "text/event-stream")], sse).into_response();
    }

    Json(json!({
        "id": "msg_1",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Hello"}],
    }))
    .into_response()
}

async fn mock_signed_url(
    headers: HeaderMap,
    Query(q): Query<std::collections::HashMap<String, String>>,
) -> Response {
    let key = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if key.is_empty() {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "missing key"}))).into_response();
    }
    let agent = q.get("agent_id").cloned().unwrap_or_default();
    Json(json!({"signed_url": format!("wss://voice.test/{agent}?k={key}")})).into_response()
}

async fn start_mock_upstream() -> (SocketAddr, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/v1/messages", post(mock_messages))
        .route(
            "/v1/convai/conversation/get-signed-url",
            get(mock_signed_url),
        )
        .with_state(seen.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

// ============================================================================
// keyrelay under test
// ============================================================================

struct TestServer {
    base: String,
    http: reqwest::Client,
    seen: Seen,
    dir: tempfile::TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(vec![K0.into(), K1.into()], Some(ADMIN.into())).await
    }

    async fn start_with(keys: Vec<String>, admin_password: Option<String>) -> Self {
        let (upstream, seen) = start_mock_upstream().await;
        let dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.upstream.base_url = format!("http://{upstream}");
        config.voice.base_url = format!("http://{upstream}");
        config.storage.data_dir = dir.path().to_string_lossy().into_owned();
        config.admin.cache_ttl_secs = 0;
        config.clients = vec![ClientKeyConfig {
            key: "sk_acme_demo".into(),
            company: "Acme".into(),
            limit: 5000,
            used: 200,
            active: true,
            price_per_minute: 1.5,
        }];

        let secrets = Secrets {
            claude_keys: keys,
            admin_password,
            elevenlabs_api_key: Some("xi-primary".into()),
            elevenlabs_agent_id: Some("agent-main".into()),
            elevenlabs_api_key_2: Some("xi-secondary".into()),
            elevenlabs_agent_id_2: Some("agent-alt".into()),
        };

        let store = Arc::new(JsonFileStore::from_config(&config.storage));
        let clients = Arc::new(MemoryKeyStore::from_config(&config.clients));
        let state = AppState::new(&config, &secrets, store, clients).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            serve(listener, state, token).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            http: reqwest::Client::new(),
            seen,
            dir,
            shutdown,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self.http.post(self.url(path)).json(&body).send().await.unwrap();
        decode(resp).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        decode(self.http.get(self.url(path)).send().await.unwrap()).await
    }

    async fn admin(&self, method: reqwest::Method, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self
            .http
            .request(method, self.url("/generate-api-key"))
            .bearer_auth(ADMIN);
        if let Some(body) = body {
            req = req.json(&body);
        }
        decode(req.send().await.unwrap()).await
    }

    async fn admin_report(&self) -> (StatusCode, Value) {
        let req = self.http.get(self.url("/admin-data")).bearer_auth(ADMIN);
        decode(req.send().await.unwrap()).await
    }

    async fn assign(&self, email: &str) -> Value {
        let (status, body) = self.post("/assign-api-key", json!({"userEmail": email})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn decode(resp: reqwest::Response) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

// ============================================================================
// Key assignment
// ============================================================================

#[tokio::test]
async fn test_assignment_first_unused_then_wraparound() {
    let server = TestServer::start().await;

    let a = server.assign("a@x.com").await;
    let b = server.assign("b@x.com").await;
    let c = server.assign("c@x.com").await;
    assert_eq!(a["apiKey"], K0);
    assert_eq!(b["apiKey"], K1);
    assert_eq!(c["apiKey"], K0);
    assert_eq!(a["isNewUser"], true);
    assert_eq!(c["isNewUser"], true);
    assert_eq!(a["userInfo"]["apiKeyIndex"], 0);
    assert_eq!(a["userInfo"]["totalMessages"], 0);
    assert!(a["userInfo"]["lastAccessed"].is_string());

    for _ in 0..3 {
        let again = server.assign("  A@X.com ").await;
        assert_eq!(again["apiKey"], K0);
        assert_eq!(again["isNewUser"], false);
    }

    let raw = std::fs::read_to_string(server.dir.path().join("users.json")).unwrap();
    let users: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(users.as_object().unwrap().len(), 3);
    assert_eq!(users["b@x.com"]["apiKeyIndex"], 1);
}

#[tokio::test]
async fn test_assignment_validation() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/assign-api-key", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "User email is required"}));

    let (status, body) = server
        .post("/assign-api-key", json!({"userEmail": "not-an-email"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid user email is required");

    let resp = server
        .http
        .post(server.url("/assign-api-key"))
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();
    let (status, body) = decode(resp).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON payload");
}

#[tokio::test]
async fn test_assignment_with_empty_pool() {
    let server = TestServer::start_with(Vec::new(), None).await;
    let (status, body) = server
        .post("/assign-api-key", json!({"userEmail": "a@x.com"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No valid API keys configured");
}

// ============================================================================
// Chat relay
// ============================================================================

#[tokio::test]
async fn test_chat_relay_and_usage() {
    let server = TestServer::start().await;
    server.assign("a@x.com").await;

    let (status, body) = server
        .post(
            "/claude-chat",
            json!({"userEmail": "a@x.com", "message": "Hi", "apiKey": K0}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["response"], "Hello");
    assert_eq!(body["usage"]["inputTokens"], 1);
    assert_eq!(body["usage"]["outputTokens"], 1);
    let cost = body["usage"]["estimatedCost"].as_f64().unwrap();
    assert!(cost > 0.0 && cost < 0.001);

    {
        let chats = server.seen.chats.lock();
        let (headers, sent) = &chats[0];
        assert_eq!(headers["x-api-key"], K0);
        assert_eq!(headers["anthropic-version"], "2023-06-01");
        assert_eq!(sent["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(sent["max_tokens"], 4000);
        assert_eq!(sent["messages"], json!([{"role": "user", "content": "Hi"}]));
        assert!(sent["system"].as_str().unwrap().contains("UTC"));
    }

    let usage: Value = serde_json::from_str(
        &std::fs::read_to_string(server.dir.path().join("usage.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(usage["a@x.com"][0]["message"], "Hi");
    assert_eq!(usage["a@x.com"][0]["messageLength"], 2);
    assert_eq!(usage["a@x.com"][0]["responseLength"], 5);

    let again = server.assign("a@x.com").await;
    assert_eq!(again["userInfo"]["totalMessages"], 1);
}

#[tokio::test]
async fn test_chat_stream_is_drained() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/claude-chat",
            json!({"userEmail": "s@x.com", "message": "Hi", "apiKey": K1, "stream": true}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["response"], "Hello");
    assert_eq!(server.seen.chats.lock()[0].1["stream"], true);
}

#[tokio::test]
async fn test_chat_upstream_error() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post(
            "/claude-chat",
            json!({"userEmail": "a@x.com", "message": "Hi", "apiKey": BAD_KEY}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Claude API error: 401 Unauthorized");
    assert_eq!(body["details"]["error"]["type"], "authentication_error");
    assert_eq!(body["details"]["error"]["message"], "invalid x-api-key");
}

#[tokio::test]
async fn test_chat_missing_fields() {
    let server = TestServer::start().await;
    let (status, body) = server
        .post("/claude-chat", json!({"userEmail": "a@x.com", "message": "Hi"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert!(server.seen.chats.lock().is_empty());
}

// ============================================================================
// Admin report
// ============================================================================

#[tokio::test]
async fn test_admin_data_auth() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/admin-data").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authorization required");

    let resp = server
        .http
        .get(server.url("/admin-data"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    let (status, body) = decode(resp).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid admin credentials");
}

#[tokio::test]
async fn test_admin_data_empty_then_populated() {
    let server = TestServer::start().await;
    let (status, empty) = server.admin_report().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["stats"]["totalUsers"], 0);
    assert_eq!(empty["stats"]["totalApiKeys"], 2);
    assert_eq!(empty["recentActivity"], json!([]));
    assert_eq!(empty["users"], json!({}));

    server.assign("alice@x.com").await;
    server.assign("bob@y.org").await;
    server
        .post(
            "/claude-chat",
            json!({"userEmail": "alice@x.com", "message": "Hi", "apiKey": K0}),
        )
        .await;

    let (_, report) = server.admin_report().await;
    assert_eq!(report["stats"]["totalUsers"], 2);
    assert_eq!(report["stats"]["activeUsers"], 1);
    assert_eq!(report["stats"]["totalMessages"], 1);
    assert_eq!(report["keyDistribution"][0]["keyName"], "Key 1");
    assert_eq!(report["keyDistribution"][0]["users"], json!(["al***@x.com"]));
    assert_eq!(report["keyDistribution"][1]["users"], json!(["bo***@y.org"]));
    assert_eq!(report["recentActivity"][0]["user"], "al***@x.com");
    assert!(report["users"].get("al***@x.com").is_some());
    assert_eq!(report["analytics"]["userGrowth"]["newUsersLast7Days"], 2);
    assert_eq!(report["performance"]["cacheHit"], false);
}

#[tokio::test]
async fn test_admin_data_open_without_password() {
    let server = TestServer::start_with(vec![K0.into()], None).await;
    let (status, body) = server.get("/admin-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalApiKeys"], 1);

    let (status, body) = server.get("/generate-api-key").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Admin password not configured");
}

// ============================================================================
// Client keys
// ============================================================================

#[tokio::test]
async fn test_verify_key() {
    let server = TestServer::start().await;

    let resp = server
        .http
        .get(server.url("/verify-key"))
        .header("x-api-key", "sk_acme_demo")
        .send()
        .await
        .unwrap();
    let (status, body) = decode(resp).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "valid": true,
            "company": "Acme",
            "usage": {"used": 200, "limit": 5000, "remaining": 4800},
            "active": true,
        })
    );

    let (status, body) = server.get("/verify-key").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"valid": false, "error": "Invalid API key"}));
}

#[tokio::test]
async fn test_generate_api_key_lifecycle() {
    use reqwest::Method;

    let server = TestServer::start().await;

    let (status, body) = server
        .admin(Method::POST, Some(json!({"company": "Big Co", "limit": 50})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["apiKey"].as_str().unwrap().to_string();
    assert!(key.starts_with("sk_bigco_"));
    assert_eq!(body["pricePerMinute"], 1.5);

    let resp = server
        .http
        .get(server.url("/verify-key"))
        .header("x-api-key", &key)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let (status, body) = server
        .admin(Method::PUT, Some(json!({"apiKey": key, "active": false, "limit": 75})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);
    assert_eq!(body["data"]["limit"], 75);

    let (status, body) = server.admin(Method::GET, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalKeys"], 2);
    assert_eq!(body["totalRevenue"], "300.00");

    let (status, _) = server
        .admin(Method::DELETE, Some(json!({"apiKey": key})))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server
        .admin(Method::DELETE, Some(json!({"apiKey": key})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "API key not found");

    let (status, body) = server.admin(Method::POST, Some(json!({"limit": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Company name is required");
}

#[tokio::test]
async fn test_conversation_charges_client_key() {
    use reqwest::Method;

    let server = TestServer::start().await;

    let converse = |key: &str| {
        server
            .http
            .post(server.url("/conversation"))
            .header("x-api-key", key)
            .json(&json!({"message": "Merhaba", "sessionId": "s-9"}))
            .send()
    };

    let (status, body) = decode(converse("sk_nobody").await.unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or inactive API key");
    assert!(server.seen.chats.lock().is_empty());

    let (status, body) = server
        .admin(Method::POST, Some(json!({"company": "Tiny Shop", "limit": 1})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let key = body["apiKey"].as_str().unwrap().to_string();

    let (status, body) = decode(converse(&key).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Hello");
    assert_eq!(
        body["usage"],
        json!({"used": 1, "limit": 1, "remaining": 0, "company": "Tiny Shop"})
    );
    assert_eq!(body["metadata"]["sessionId"], "s-9");
    assert_eq!(body["metadata"]["language"], "tr");
    {
        let chats = server.seen.chats.lock();
        let (headers, sent) = &chats[0];
        assert_eq!(headers["x-api-key"], K0);
        assert!(sent["system"].as_str().unwrap().contains("Tiny Shop"));
    }

    let resp = server
        .http
        .get(server.url("/verify-key"))
        .header("x-api-key", &key)
        .send()
        .await
        .unwrap();
    let (_, body) = decode(resp).await;
    assert_eq!(body["usage"]["used"], 1);

    let (status, body) = decode(converse(&key).await.unwrap()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({"error": "Usage limit exceeded", "limit": 1, "used": 1})
    );
    assert_eq!(server.seen.chats.lock().len(), 1);
}

// ============================================================================
// Voice and operational endpoints
// ============================================================================

#[tokio::test]
async fn test_voice_endpoints() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/get-agent-id").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"agentId": "agent-main"}));

    let (status, body) = server.get("/elevenlabs-signed-url").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "agent-main");
    assert_eq!(body["signed_url"], "wss://voice.test/agent-main?k=xi-primary");

    let (_, body) = server.get("/elevenlabs-signed-url?agent_id=agent-alt").await;
    assert_eq!(body["signed_url"], "wss://voice.test/agent-alt?k=xi-secondary");

    let (_, body) = server.get("/elevenlabs-signed-url?agent_id=unknown").await;
    assert_eq!(body["agent_id"], "agent-main");
}

#[tokio::test]
async fn test_health_headers_and_cors() {
    let server = TestServer::start().await;

    let resp = server.http.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    assert_eq!(resp.headers()["x-frame-options"], "DENY");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let preflight = server
        .http
        .request(reqwest::Method::OPTIONS, server.url("/claude-chat"))
        .header("origin", "https://widget.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(preflight.headers()["access-control-allow-origin"], "*");
}
