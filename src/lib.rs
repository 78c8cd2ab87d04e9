//! Webhook-driven branch mirror.
//!
//! Receives a push notification from one source control host, clones the
//! referenced branch into a local workspace, and replicates it to a second
//! host.  One synchronous pipeline per request; no scheduler and no state
//! beyond the workspace directories.

pub mod auth;
pub mod config;
pub mod coordination;
pub mod git;
pub mod health;
pub mod http;
pub mod metrics;
pub mod mirror;
pub mod payload;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::coordination::locks::RepoLocks;
use crate::metrics::MetricsRegistry;

/// Global state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Shared secret expected in the webhook `token` query parameter.
    pub webhook_token: String,
    /// Credential embedded into the destination push URL.  Never logged.
    pub destination_token: String,
    /// Per-repository-name locks serializing pipelines that share a
    /// workspace.
    pub locks: RepoLocks,
    /// Bounds the number of concurrently running mirror pipelines.
    pub mirror_semaphore: Arc<Semaphore>,
    pub metrics: MetricsRegistry,
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Assemble the shared state.  Secrets are passed in resolved so callers
    /// decide where they come from (the environment in production, literals
    /// in tests).
    pub fn new(config: Config, webhook_token: String, destination_token: String) -> Result<Self> {
        let max_concurrent = config.mirror.max_concurrent_mirrors;

        let http_client = reqwest::Client::builder()
            .user_agent("mirrorhook/0.1")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            config: Arc::new(config),
            webhook_token,
            destination_token,
            locks: RepoLocks::new(),
            mirror_semaphore: Arc::new(Semaphore::new(max_concurrent)),
            metrics: MetricsRegistry::new(),
            http_client,
        })
    }
}
