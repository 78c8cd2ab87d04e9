use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Replication strategy
// ---------------------------------------------------------------------------

/// How the pushed branch is replicated to the destination remote.
///
/// | Variant   | Clone        | Remote setup                       | Pre-push               |
/// |-----------|--------------|------------------------------------|------------------------|
/// | `merge`   | full history | destination added as second remote | rebase-pull, tolerated |
/// | `shallow` | depth 1      | default remote replaced outright   | none                   |
///
/// `merge` preserves any history already present on the destination branch;
/// `shallow` moves the least data and assumes the destination follows the
/// source fast-forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorStrategy {
    #[default]
    Merge,
    Shallow,
}

impl MirrorStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Shallow => "shallow",
        }
    }

    fn parse(s: &str) -> Result<Self> {
        match s {
            "merge" => Ok(Self::Merge),
            "shallow" => Ok(Self::Shallow),
            other => anyhow::bail!("unknown mirror strategy: {other:?} (expected merge or shallow)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub destination: DestinationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DestinationConfig {
    /// Base URL of the destination repository, without credentials
    /// (e.g. `https://gitlab.example.com/acme/demo.git`).  This is the only
    /// form of the destination URL that ever reaches the logs.
    pub base_url: String,
    /// Name of the environment variable that holds the token embedded into
    /// the push URL as `oauth2:<token>@`.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "GITLAB_TOKEN".to_string()
}

// ---------------------------------------------------------------------------
// Inbound auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Name of the environment variable that holds the shared secret expected
    /// in the webhook's `token` query parameter.
    #[serde(default = "default_webhook_token_env")]
    pub webhook_token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            webhook_token_env: default_webhook_token_env(),
        }
    }
}

fn default_webhook_token_env() -> String {
    "WEBHOOK_TOKEN".to_string()
}

// ---------------------------------------------------------------------------
// Mirror behaviour
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// Root directory under which per-repository workspaces are created.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    #[serde(default)]
    pub strategy: MirrorStrategy,
    /// Timeout (seconds) applied to every git invocation.
    #[serde(default = "default_git_timeout")]
    pub git_timeout_secs: u64,
    /// How long (seconds) a request will wait for the per-repository lock
    /// before failing.
    #[serde(default = "default_lock_wait_timeout")]
    pub lock_wait_timeout_secs: u64,
    /// Semaphore limit for concurrently running mirror pipelines.
    #[serde(default = "default_max_concurrent_mirrors")]
    pub max_concurrent_mirrors: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            strategy: MirrorStrategy::default(),
            git_timeout_secs: default_git_timeout(),
            lock_wait_timeout_secs: default_lock_wait_timeout(),
            max_concurrent_mirrors: default_max_concurrent_mirrors(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("/tmp/repos")
}

fn default_git_timeout() -> u64 {
    600
}

fn default_lock_wait_timeout() -> u64 {
    90
}

fn default_max_concurrent_mirrors() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the HTTP listener (e.g. `0.0.0.0:3000`).
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}

// ---------------------------------------------------------------------------
// Secret resolution
// ---------------------------------------------------------------------------

impl Config {
    /// Resolve the inbound shared secret from the configured env var.
    pub fn webhook_token(&self) -> Result<String> {
        std::env::var(&self.auth.webhook_token_env).with_context(|| {
            format!(
                "webhook secret env var {} is not set",
                self.auth.webhook_token_env
            )
        })
    }

    /// Resolve the destination push token from the configured env var.
    pub fn destination_token(&self) -> Result<String> {
        std::env::var(&self.destination.token_env).with_context(|| {
            format!(
                "destination token env var {} is not set",
                self.destination.token_env
            )
        })
    }
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Load a [`Config`] either from a YAML file or, when no path is given, from
/// the environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?
        }
        None => from_env()?,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Build a [`Config`] from environment variables.
fn from_env() -> Result<Config> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Environment-shaped loader with an injectable variable lookup.
fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let base_url = lookup("GITLAB_REPO_URL")
        .context("GITLAB_REPO_URL must be set (destination remote base URL)")?;

    let listen = match lookup("PORT") {
        Some(port) => {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port:?}"))?;
            format!("0.0.0.0:{port}")
        }
        None => default_listen(),
    };

    let strategy = match lookup("MIRROR_STRATEGY") {
        Some(s) => MirrorStrategy::parse(&s)?,
        None => MirrorStrategy::default(),
    };

    Ok(Config {
        destination: DestinationConfig {
            base_url,
            token_env: default_token_env(),
        },
        auth: AuthConfig::default(),
        mirror: MirrorConfig {
            temp_dir: lookup("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_temp_dir),
            strategy,
            git_timeout_secs: parse_or(&lookup, "GIT_TIMEOUT_SECS", default_git_timeout())?,
            lock_wait_timeout_secs: parse_or(
                &lookup,
                "LOCK_WAIT_TIMEOUT_SECS",
                default_lock_wait_timeout(),
            )?,
            max_concurrent_mirrors: parse_or(
                &lookup,
                "MAX_CONCURRENT_MIRRORS",
                default_max_concurrent_mirrors(),
            )?,
        },
        server: ServerConfig { listen },
    })
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

/// Basic sanity checks that cannot be expressed purely with serde.
fn validate_config(config: &Config) -> Result<()> {
    anyhow::ensure!(
        !config.destination.base_url.trim().is_empty(),
        "destination base_url must not be empty"
    );
    anyhow::ensure!(
        config.mirror.git_timeout_secs >= 1,
        "git_timeout_secs must be at least 1"
    );
    anyhow::ensure!(
        config.mirror.max_concurrent_mirrors >= 1,
        "max_concurrent_mirrors must be at least 1"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn env_defaults() {
        let config = from_lookup(lookup_from(&[(
            "GITLAB_REPO_URL",
            "https://gitlab.example.com/acme/demo.git",
        )]))
        .unwrap();

        assert_eq!(
            config.destination.base_url,
            "https://gitlab.example.com/acme/demo.git"
        );
        assert_eq!(config.destination.token_env, "GITLAB_TOKEN");
        assert_eq!(config.auth.webhook_token_env, "WEBHOOK_TOKEN");
        assert_eq!(config.mirror.temp_dir, PathBuf::from("/tmp/repos"));
        assert_eq!(config.mirror.strategy, MirrorStrategy::Merge);
        assert_eq!(config.server.listen, "0.0.0.0:3000");
    }

    #[test]
    fn env_overrides() {
        let config = from_lookup(lookup_from(&[
            ("GITLAB_REPO_URL", "https://gitlab.example.com/a/b.git"),
            ("TEMP_DIR", "/var/lib/mirrors"),
            ("PORT", "8080"),
            ("MIRROR_STRATEGY", "shallow"),
            ("GIT_TIMEOUT_SECS", "30"),
            ("MAX_CONCURRENT_MIRRORS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.mirror.temp_dir, PathBuf::from("/var/lib/mirrors"));
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.mirror.strategy, MirrorStrategy::Shallow);
        assert_eq!(config.mirror.git_timeout_secs, 30);
        assert_eq!(config.mirror.max_concurrent_mirrors, 2);
    }

    #[test]
    fn missing_destination_is_an_error() {
        let err = from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GITLAB_REPO_URL"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let err = from_lookup(lookup_from(&[
            ("GITLAB_REPO_URL", "https://gitlab.example.com/a/b.git"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let err = from_lookup(lookup_from(&[
            ("GITLAB_REPO_URL", "https://gitlab.example.com/a/b.git"),
            ("MIRROR_STRATEGY", "rsync"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("strategy"));
    }

    #[test]
    fn yaml_round_trip() {
        let yaml = r#"
destination:
  base_url: https://gitlab.example.com/acme/demo.git
mirror:
  strategy: shallow
  temp_dir: /srv/mirrors
server:
  listen: 127.0.0.1:9000
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        validate_config(&config).unwrap();
        assert_eq!(config.mirror.strategy, MirrorStrategy::Shallow);
        assert_eq!(config.mirror.git_timeout_secs, 600);
        assert_eq!(config.server.listen, "127.0.0.1:9000");
    }

    #[test]
    fn validation_rejects_zero_timeout() {
        let mut config = from_lookup(lookup_from(&[(
            "GITLAB_REPO_URL",
            "https://gitlab.example.com/a/b.git",
        )]))
        .unwrap();
        config.mirror.git_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
