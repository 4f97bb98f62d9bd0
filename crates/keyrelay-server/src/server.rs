//! Router assembly and the serve loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use keyrelay_config::{Config, Secrets};
use keyrelay_core::DEFAULT_SHUTDOWN_TIMEOUT_SECS;
use keyrelay_store::{JsonFileStore, MemoryKeyStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::handlers::{admin, assign, chat, clients, conversation, health, verify, voice};
use crate::state::AppState;

/// How long in-flight requests get after shutdown is requested.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS);

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
        ]);

    Router::new()
        .route("/health", get(health::health))
        .route("/assign-api-key", post(assign::assign_api_key))
        .route("/claude-chat", post(chat::claude_chat))
        .route("/conversation", post(conversation::conversation))
        .route("/admin-data", get(admin::admin_data))
        .route("/verify-key", get(verify::verify_key))
        .route(
            "/generate-api-key",
            get(clients::list)
                .post(clients::create)
                .put(clients::update)
                .delete(clients::delete),
        )
        .route("/get-agent-id", get(voice::get_agent_id))
        .route("/elevenlabs-signed-url", get(voice::elevenlabs_signed_url))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "listening");

    let graceful = shutdown.clone();
    let server = async move {
        axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { graceful.cancelled().await })
            .await
    };
    let deadline = async {
        shutdown.cancelled().await;
        tokio::time::sleep(DEFAULT_SHUTDOWN_TIMEOUT).await;
    };

    tokio::select! {
        res = server => res?,
        _ = deadline => warn!(
            timeout_secs = DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
            "graceful shutdown timed out, dropping open connections"
        ),
    }
    info!("server stopped");
    Ok(())
}

/// Build the default stores from `config` and serve until `shutdown`.
pub async fn run_with_shutdown(
    config: Config,
    secrets: Secrets,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let store = Arc::new(JsonFileStore::from_config(&config.storage));
    let clients = Arc::new(MemoryKeyStore::from_config(&config.clients));

    info!(
        keys = secrets.claude_keys.len(),
        clients = clients.len(),
        data_dir = %config.storage.data_dir,
        model = %config.upstream.model,
        "starting keyrelay"
    );
    if secrets.claude_keys.is_empty() {
        warn!(
            prefix = %config.keys.env_prefix,
            "no valid API keys configured, key assignment will fail"
        );
    }
    if secrets.admin_password.is_none() {
        warn!("ADMIN_PASSWORD not set: /admin-data is open and /generate-api-key is disabled");
    }

    let state = AppState::new(&config, &secrets, store, clients)?;
    let listener = TcpListener::bind(&config.server.listen).await?;
    serve(listener, state, shutdown).await
}
