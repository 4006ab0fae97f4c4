//! Atelier HTTP API
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, serde_json::Value)`. The inner functions are tested
//! directly; `tests/http_integration.rs` covers the axum wiring.
//!
//! Endpoints:
//! - GET  /         banner
//! - GET  /health   SQLite status and table counts
//! - GET  /version  server version info
//! - POST /login    username or email plus password
//! - POST /chat     run one conversation turn

use std::sync::Arc;

use anyhow::Result;
use atelier_core::api::{ChatRequest, LoginRequest, LoginResponse, PROTOCOL};
use atelier_core::auth::verify_password;
use atelier_core::AtelierConfig;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::store;
use crate::workflow::Assistant;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pool: SqlitePool,
    pub config: AtelierConfig,
    pub assistant: Arc<Assistant>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/login", post(login_handler))
        .route("/chat", post(chat_handler))
        .with_state(state)
}

/// Serve on `http.host:http.port` until the shutdown signal fires.
pub async fn start_http_server(state: HttpState, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Atelier HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn root_inner() -> serde_json::Value {
    serde_json::json!({ "msg": "Atelier shopping assistant is running" })
}

/// SQLite version and row counts, or 503 when the database is unreachable.
pub async fn health_inner(pool: &SqlitePool) -> (StatusCode, serde_json::Value) {
    let sqlite_version = match atelier_core::db::health_check(pool).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string(),
                }),
            );
        }
    };

    match atelier_core::db::table_counts(pool).await {
        Ok((users, products, orders)) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "sqlite": sqlite_version,
                "users": users,
                "products": products,
                "orders": orders,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "sqlite": sqlite_version,
                "error": e.to_string(),
            }),
        ),
    }
}

pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL,
    })
}

pub async fn login_inner(pool: &SqlitePool, req: LoginRequest) -> (StatusCode, serde_json::Value) {
    let response = match store::find_user(pool, req.username_or_email.trim()).await {
        Ok(None) => LoginResponse::denied("User not found"),
        Ok(Some(user)) => {
            if verify_password(&req.password, &user.password) {
                tracing::info!(user_id = user.user_id, username = %user.username, "Login successful");
                LoginResponse::ok(user.user_id)
            } else {
                LoginResponse::denied("Incorrect password")
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Login lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!(LoginResponse::denied(format!("Database error: {}", e))),
            );
        }
    };
    (StatusCode::OK, serde_json::json!(response))
}

pub async fn chat_inner(assistant: &Assistant, req: ChatRequest) -> (StatusCode, serde_json::Value) {
    let response = assistant.chat(req).await;
    (StatusCode::OK, serde_json::json!(response))
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(root_inner()))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.pool).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn login_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let (status, body) = login_inner(&state.pool, req).await;
    (status, Json(body))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let (status, body) = chat_inner(&state.assistant, req).await;
    (status, Json(body))
}
