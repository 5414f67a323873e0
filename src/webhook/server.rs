//! Admission Webhook Server
//!
//! Serves both placement webhooks over HTTPS, plus health and metrics
//! endpoints on a separate plain-HTTP listener.
//!
//! TLS certificates are read from the configured PEM files. When they are
//! missing the admission listener falls back to plain HTTP, which the API
//! server will refuse; this mode is meant for local development only.

use super::handler::{review_mutation, review_validation, Review, WebhookState};
use crate::error::{Error, Result};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// =============================================================================
// Server Configuration
// =============================================================================

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";

/// Configuration for the webhook server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Admission webhook bind address
    pub webhook_addr: SocketAddr,
    /// Health and metrics bind address
    pub health_addr: SocketAddr,
    /// TLS certificate path (PEM)
    pub tls_cert_path: PathBuf,
    /// TLS private key path (PEM)
    pub tls_key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            webhook_addr: SocketAddr::from(([0, 0, 0, 0], 9443)),
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            tls_cert_path: PathBuf::from(WEBHOOK_CERT_PATH),
            tls_key_path: PathBuf::from(WEBHOOK_KEY_PATH),
        }
    }
}

impl ServerConfig {
    /// Whether both TLS files are present
    pub fn tls_available(&self) -> bool {
        self.tls_cert_path.is_file() && self.tls_key_path.is_file()
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the admission router, one route per webhook policy
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    let mutate_path = state.modifier.path;
    let validate_path = state.validator_policy.path;

    Router::new()
        .route(mutate_path, post(mutate_pv))
        .route(validate_path, post(validate_pv))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the health and metrics router
pub fn create_health_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/livez", get(health_check))
        .route("/readyz", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn mutate_pv(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<Review>,
) -> impl IntoResponse {
    let (status, review) = review_mutation(&state, review).await;
    (status, Json(review))
}

async fn validate_pv(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<Review>,
) -> impl IntoResponse {
    let (status, review) = review_validation(&state, review);
    (status, Json(review))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics(State(state): State<Arc<WebhookState>>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// =============================================================================
// Serving
// =============================================================================

/// Run the admission listener until it fails
pub async fn run_webhook_server(config: &ServerConfig, state: Arc<WebhookState>) -> Result<()> {
    let app = create_webhook_router(state);

    if config.tls_available() {
        use axum_server::tls_rustls::RustlsConfig;

        let tls = RustlsConfig::from_pem_file(&config.tls_cert_path, &config.tls_key_path)
            .await
            .map_err(|e| Error::Configuration(format!("Invalid TLS certificate: {}", e)))?;

        info!(addr = %config.webhook_addr, "Webhook server listening with TLS");
        axum_server::bind_rustls(config.webhook_addr, tls)
            .serve(app.into_make_service())
            .await?;
    } else {
        warn!(
            cert = %config.tls_cert_path.display(),
            key = %config.tls_key_path.display(),
            "TLS certificate not found, serving webhooks over plain HTTP"
        );
        serve_plain(config.webhook_addr, app).await?;
    }

    Ok(())
}

/// Run the health and metrics listener until it fails
pub async fn run_health_server(config: &ServerConfig, state: Arc<WebhookState>) -> Result<()> {
    info!(addr = %config.health_addr, "Health server listening");
    serve_plain(config.health_addr, create_health_router(state)).await
}

async fn serve_plain(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind listener");
        e
    })?;

    axum::serve(listener, app).await?;

    Ok(())
}
