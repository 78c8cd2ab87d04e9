//! Main axum router and HTTP request handlers for the mirror service.
//!
//! Routes:
//! - `POST /webhook`  - push-notification receiver; runs the mirror pipeline
//! - `GET  /healthz`  - health check
//! - `GET  /metrics`  - Prometheus metrics
//!
//! The webhook responds with exactly one of three bodies: `200 "Pushed to
//! GitLab"`, `403 "Forbidden: Invalid token"`, or `500 "Mirror failed"`.
//! Everything the pipeline reports beyond that goes to the log, never to the
//! caller.

use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::metrics::{Outcome, OutcomeLabels};
use crate::mirror::{self, MirrorRequest};
use crate::payload::PushEvent;
use crate::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`] with all HTTP routes and shared state.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/healthz", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query parameter types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WebhookQuery {
    token: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /webhook?token=<shared-secret>`
///
/// Authenticates the request, then runs the mirror pipeline to completion
/// before answering.  Authentication failure is the only error reported
/// distinctly; every pipeline failure collapses to an opaque 500.
#[instrument(skip_all)]
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Response {
    if crate::auth::verify_token(query.token.as_deref(), &state.webhook_token).is_err() {
        warn!("rejected webhook: invalid or missing token");
        count_outcome(&state, Outcome::Forbidden);
        return (StatusCode::FORBIDDEN, "Forbidden: Invalid token").into_response();
    }

    match process(&state, &body).await {
        Ok(()) => {
            count_outcome(&state, Outcome::Success);
            (StatusCode::OK, "Pushed to GitLab").into_response()
        }
        Err(e) => {
            error!(error = ?e, "mirror pipeline failed");
            count_outcome(&state, Outcome::Failed);
            (StatusCode::INTERNAL_SERVER_ERROR, "Mirror failed").into_response()
        }
    }
}

/// Parse the payload and run the pipeline.  Every error funnels into the
/// generic failure path of the caller.
async fn process(state: &AppState, body: &[u8]) -> anyhow::Result<()> {
    let event: PushEvent =
        serde_json::from_slice(body).context("failed to parse push payload")?;
    let request = MirrorRequest::from_event(event)?;

    info!(
        repo = %request.repo_name,
        branch = %request.branch,
        source = %request.clone_url,
        destination = %state.config.destination.base_url,
        "mirroring pushed branch"
    );

    mirror::run(state, &request).await
}

fn count_outcome(state: &AppState, outcome: Outcome) {
    state
        .metrics
        .metrics
        .webhook_requests
        .get_or_create(&OutcomeLabels { outcome })
        .inc();
}

/// `GET /healthz`
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health_state = crate::health::HealthState {
        config: Arc::clone(&state.config),
        http_client: state.http_client.clone(),
    };
    crate::health::health_handler(axum::extract::State(health_state)).await
}

/// `GET /metrics`
///
/// Returns Prometheus metrics collected by the service.
async fn handle_metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buf = String::new();
    if let Err(e) = prometheus_client::encoding::text::encode(&mut buf, &state.metrics.registry) {
        error!(error = %e, "metrics encoding failed");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        buf,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
