//! Configuration loading for partsdesk services
//!
//! Resolution priority per key: environment variable (`PARTSDESK_*`)
//! over TOML config file over compiled default. Credentials and tuning
//! constants (rate-limit gap, retry cap, batch concurrency) are all
//! collaborator concerns; the core receives the resolved values.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn default_min_gap_ms() -> u64 {
    400
}

fn default_max_attempts() -> u32 {
    5
}

fn default_concurrency() -> usize {
    1
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the commerce admin API, e.g. `https://shop.example/admin/api/2024-01`
    pub api_base_url: String,

    /// Static access token sent on every remote call
    pub access_token: String,

    /// Minimum gap between remote calls, shared across the whole process
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,

    /// Attempt cap for rate-limited/server-error retries
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Records reconciled in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Directory for per-record classification snapshots
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// `PARTSDESK_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Read config {} failed: {}", path.display(), e))
                })?;
                let config: Config = toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("Parse config {} failed: {}", path.display(), e))
                })?;
                info!("Configuration loaded from {}", path.display());
                config
            }
            None => Config {
                api_base_url: String::new(),
                access_token: String::new(),
                min_gap_ms: default_min_gap_ms(),
                max_attempts: default_max_attempts(),
                concurrency: default_concurrency(),
                snapshot_dir: default_snapshot_dir(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PARTSDESK_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(token) = std::env::var("PARTSDESK_ACCESS_TOKEN") {
            self.access_token = token;
        }
        if let Ok(gap) = std::env::var("PARTSDESK_MIN_GAP_MS") {
            match gap.parse() {
                Ok(gap) => self.min_gap_ms = gap,
                Err(_) => warn!("Ignoring non-numeric PARTSDESK_MIN_GAP_MS: {}", gap),
            }
        }
        if let Ok(attempts) = std::env::var("PARTSDESK_MAX_ATTEMPTS") {
            match attempts.parse() {
                Ok(attempts) => self.max_attempts = attempts,
                Err(_) => warn!("Ignoring non-numeric PARTSDESK_MAX_ATTEMPTS: {}", attempts),
            }
        }
        if let Ok(n) = std::env::var("PARTSDESK_CONCURRENCY") {
            match n.parse() {
                Ok(n) => self.concurrency = n,
                Err(_) => warn!("Ignoring non-numeric PARTSDESK_CONCURRENCY: {}", n),
            }
        }
        if let Ok(dir) = std::env::var("PARTSDESK_SNAPSHOT_DIR") {
            self.snapshot_dir = PathBuf::from(dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config(
                "api_base_url not configured. Set it in the TOML config or \
                 PARTSDESK_API_BASE_URL"
                    .to_string(),
            ));
        }
        if self.access_token.trim().is_empty() {
            return Err(Error::Config(
                "access_token not configured. Set it in the TOML config or \
                 PARTSDESK_ACCESS_TOKEN"
                    .to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}
