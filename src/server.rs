//! HTTP and WebSocket server.
//!
//! Serves the answer engine over a JSON HTTP API and a WebSocket channel.
//! Both carry the same inbound envelope (see [`crate::protocol`]).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/ws` | WebSocket; one inbound message per text frame |
//! | `POST` | `/message` | One inbound message; `204` for feedback |
//! | `POST` | `/train` | Training intake `{query, answer, intent?}` |
//! | `GET`  | `/intents` | Active intents and discovered clusters |
//! | `GET`  | `/keywords` | Ranked corpus keywords |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! HTTP error responses share one shape:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "malformed: missing field `text`" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! On the WebSocket, a bad frame is answered with
//! `{"kind":"error","code":...,"message":...}` and the connection stays open.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser clients can
//! connect from any page.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{Engine, IntentsView};
use crate::error::EngineError;
use crate::keywords::Keyword;
use crate::models::TrainingData;
use crate::protocol::{self, Inbound, Outbound};
use crate::scheduler::Scheduler;
use crate::store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Open the store, start the engine and the background scheduler, then
/// serve on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let engine = Arc::new(Engine::start(config, Arc::new(store)).await?);

    let scheduler = Arc::new(Scheduler::new(Arc::clone(&engine), &config.schedule));
    let tasks = Arc::clone(&scheduler).start();

    let result = run_server_with_engine(engine, &config.server.bind).await;

    scheduler.shutdown();
    for task in tasks {
        task.abort();
    }
    result
}

/// Serve an already started engine. No background jobs are scheduled.
pub async fn run_server_with_engine(engine: Arc<Engine>, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "answer server listening");
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

/// Build the router with every route and the CORS layer.
pub fn router(engine: Arc<Engine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(handle_ws))
        .route("/message", post(handle_message))
        .route("/train", post(handle_train))
        .route("/intents", get(handle_intents))
        .route("/keywords", get(handle_keywords))
        .route("/health", get(handle_health))
        .fallback(handle_not_found)
        .layer(cors)
        .with_state(AppState { engine })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::InvalidTraining(_) => bad_request(message),
            _ => internal(message),
        }
    }
}

async fn handle_not_found(uri: axum::http::Uri) -> AppError {
    not_found(format!("no route for {}", uri.path()))
}

// ============ GET /ws ============

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(state.engine, socket))
}

async fn serve_socket(engine: Arc<Engine>, mut socket: WebSocket) {
    debug!("websocket connected");
    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "websocket receive failed");
                break;
            }
        };

        let reply = match protocol::decode(text.as_str()) {
            Ok(Inbound::Query { text }) => Some(Outbound::response(engine.answer(&text).await.text)),
            Ok(inbound) => {
                if let Some(feedback) = inbound.into_feedback() {
                    engine.feedback(&feedback).await;
                }
                None
            }
            Err(e) => {
                debug!(error = %e, "rejected websocket frame");
                Some(e.to_outbound())
            }
        };

        if let Some(reply) = reply {
            if let Err(e) = socket.send(Message::Text(reply.to_json().into())).await {
                warn!(error = %e, "websocket send failed");
                break;
            }
        }
    }
    debug!("websocket closed");
}

// ============ POST /message ============

async fn handle_message(State(state): State<AppState>, body: String) -> Result<Response, AppError> {
    match protocol::decode(&body).map_err(|e| bad_request(e.to_string()))? {
        Inbound::Query { text } => {
            let answer = state.engine.answer(&text).await;
            Ok(Json(Outbound::response(answer.text)).into_response())
        }
        inbound => {
            if let Some(feedback) = inbound.into_feedback() {
                state.engine.feedback(&feedback).await;
            }
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

// ============ POST /train ============

#[derive(Serialize)]
struct TrainResponse {
    status: &'static str,
}

async fn handle_train(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<TrainResponse>, AppError> {
    let entry: TrainingData = serde_json::from_str(&body)
        .map_err(|e| bad_request(format!("invalid training payload: {}", e)))?;
    state.engine.train(entry).await?;
    Ok(Json(TrainResponse { status: "success" }))
}

// ============ GET /intents ============

async fn handle_intents(State(state): State<AppState>) -> Json<IntentsView> {
    Json(state.engine.intents().await)
}

// ============ GET /keywords ============

#[derive(Serialize)]
struct KeywordsResponse {
    keywords: Vec<Keyword>,
}

async fn handle_keywords(State(state): State<AppState>) -> Json<KeywordsResponse> {
    Json(KeywordsResponse {
        keywords: state.engine.keywords().await,
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
