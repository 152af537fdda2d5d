//! HTTP boundary for AuthChain
//!
//! `GET /tip` returns the hex tip hash. `POST /submit` takes a hex-encoded
//! marshaled block and only validates it; `POST /append` validates, appends
//! and persists it.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::validate_block_hex;
use crate::error::ChainError;
use crate::node::Node;

pub const WELCOME_MESSAGE: &str = "Welcome to my permissioned blockchain!\n";
pub const VALID_BLOCK: &str = "Valid block.\n";
pub const INVALID_BLOCK: &str = "Invalid block.\n";

#[derive(Debug)]
pub enum ApiError {
    Rejected(ChainError),
    InvalidInput(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rejected(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Io(msg) => ApiError::InternalError(msg),
            other => ApiError::Rejected(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
pub struct AppendResponse {
    pub hash: String,
    pub height: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain: String,
    pub height: usize,
    pub tip: String,
}

fn body_text(body: &Bytes) -> Result<&str, ApiError> {
    std::str::from_utf8(body).map_err(|_| ApiError::InvalidInput("Body must be hex text".to_string()))
}

async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

async fn tip(State(node): State<Node>) -> String {
    format!("{}\n", hex::encode(node.tip_hash().await))
}

/// Validation-only probe; never touches the ledger.
async fn submit(body: Bytes) -> &'static str {
    let result = std::str::from_utf8(&body)
        .map_err(|e| ChainError::Decode(e.to_string()))
        .and_then(validate_block_hex);
    match result {
        Ok(block) => {
            tracing::info!(hash = %block.hash_str(), "submitted block is valid");
            VALID_BLOCK
        }
        Err(e) => {
            tracing::info!("submitted block is invalid: {}", e);
            INVALID_BLOCK
        }
    }
}

async fn append(State(node): State<Node>, body: Bytes) -> Result<Json<AppendResponse>, ApiError> {
    let block = validate_block_hex(body_text(&body)?)?;
    let (hash, height) = node.append_and_persist(block).await?;
    Ok(Json(AppendResponse {
        hash: hex::encode(hash),
        height,
    }))
}

async fn health_check(State(node): State<Node>) -> Json<HealthResponse> {
    let ledger = node.ledger.read().await;
    Json(HealthResponse {
        status: "healthy",
        chain: ledger.label().to_string(),
        height: ledger.len(),
        tip: hex::encode(ledger.tip_hash()),
    })
}

/// Logs method, path, status and duration for every request.
async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );
    response
}

/// Build the router with all endpoints (also used by tests)
pub fn build_api_router(node: Node) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![http::Method::GET, http::Method::POST, http::Method::OPTIONS])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(welcome))
        .route("/tip", get(tip))
        .route("/submit", post(submit))
        .route("/append", post(append))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

pub async fn run_api_server(node: Node) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", node.config.server.bind_address, node.config.server.port).parse()?;
    let app = build_api_router(node);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("ledger server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
