use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::config::Config;
use crate::git::commands;

/// Timeout for the `git --version` probe; the health endpoint must answer
/// quickly even when the system is wedged.
const GIT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub git: CheckResult,
    pub workspace: CheckResult,
    pub destination: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CheckResult {
    fn healthy() -> Self {
        Self {
            ok: true,
            detail: None,
        }
    }

    fn healthy_with(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
        }
    }

    fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state expected by the handler
// ---------------------------------------------------------------------------

/// Minimal subset of `AppState` required by the health-check handler.
#[derive(Clone)]
pub struct HealthState {
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
}

// ---------------------------------------------------------------------------
// Individual checks
// ---------------------------------------------------------------------------

async fn check_git() -> CheckResult {
    match commands::version(GIT_PROBE_TIMEOUT).await {
        Ok(version) => CheckResult::healthy_with(version),
        Err(e) => CheckResult::unhealthy(format!("git probe failed: {e}")),
    }
}

/// The workspace root must exist and accept writes, or every pipeline run
/// will fail at the clone step.
async fn check_workspace(temp_dir: &Path) -> CheckResult {
    if let Err(e) = tokio::fs::create_dir_all(temp_dir).await {
        return CheckResult::unhealthy(format!(
            "cannot create workspace root {}: {e}",
            temp_dir.display()
        ));
    }

    let probe = temp_dir.join(".healthcheck");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            CheckResult::healthy()
        }
        Err(e) => CheckResult::unhealthy(format!(
            "workspace root {} is not writable: {e}",
            temp_dir.display()
        )),
    }
}

/// Probe the destination host with a credential-free request.
///
/// Any HTTP response counts as reachable; without credentials the host is
/// expected to answer 401 or 404.  Only a transport-level failure marks the
/// check unhealthy.
async fn check_destination(client: &reqwest::Client, base_url: &str) -> CheckResult {
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return CheckResult::healthy_with("non-http destination; reachability not probed");
    }

    match client.head(base_url).send().await {
        Ok(resp) => CheckResult::healthy_with(format!("HEAD returned {}", resp.status())),
        Err(e) => CheckResult::unhealthy(format!("HEAD {base_url} failed: {e}")),
    }
}

// ---------------------------------------------------------------------------
// Aggregate status
// ---------------------------------------------------------------------------

fn aggregate_status(checks: &HealthChecks) -> HealthStatus {
    // No git binary or no writable workspace means no pipeline can run at
    // all; an unreachable destination may be a transient network condition.
    if !checks.git.ok || !checks.workspace.ok {
        HealthStatus::Unhealthy
    } else if !checks.destination.ok {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    }
}

// ---------------------------------------------------------------------------
// Axum handler
// ---------------------------------------------------------------------------

/// `GET /healthz` handler.  Returns 200 on Ok/Degraded, 503 on Unhealthy.
pub async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let (git, workspace, destination) = tokio::join!(
        check_git(),
        check_workspace(&state.config.mirror.temp_dir),
        check_destination(&state.http_client, &state.config.destination.base_url),
    );

    let checks = HealthChecks {
        git,
        workspace,
        destination,
    };
    let status = aggregate_status(&checks);
    let body = HealthResponse { status, checks };

    let http_status = match status {
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (http_status, Json(body))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
