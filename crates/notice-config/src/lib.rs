//! Process configuration loading: `.notice.toml` plus environment
//! overrides, nested table per concern with env vars overriding the
//! file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notice_retry::RetryStrategyConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = ".notice.toml";

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Storage instance/database identifiers for the event store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub database_id: Option<String>,
    /// Filesystem root for `FileEventStore` when no managed instance is
    /// configured (local/dev/test runs).
    #[serde(default)]
    pub local_state_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobConfig {
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub local_root: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub notification_subscription_id: Option<String>,
}

/// Per-channel topic ids. `email_topic_id` is the only one required at
/// minimum; `webhook_topic_id` is optional since webhook delivery is
/// an optional convenience this core provides (see `notice-dispatcher`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub email_topic_id: Option<String>,
    #[serde(default)]
    pub webhook_topic_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub retry: RetryStrategyConfig,
}

impl Config {
    /// Apply environment-variable overrides for the identifiers an
    /// operator would otherwise have to bake into a committed
    /// `.notice.toml`.
    pub fn with_env_overrides(mut self) -> Self {
        self.project_id = self.project_id.or_else(|| std::env::var("PROJECT_ID").ok());
        self.queue.notification_subscription_id = self
            .queue
            .notification_subscription_id
            .or_else(|| std::env::var("NOTIFICATION_SUBSCRIPTION_ID").ok());
        self.channels.email_topic_id = self
            .channels
            .email_topic_id
            .or_else(|| std::env::var("EMAIL_TOPIC_ID").ok());
        self.channels.webhook_topic_id = self
            .channels
            .webhook_topic_id
            .or_else(|| std::env::var("WEBHOOK_TOPIC_ID").ok());
        self
    }

    /// Validate that the fatal-at-startup requirements are present.
    /// Missing required configuration is a fatal startup error, not a
    /// per-message one.
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_none() {
            anyhow::bail!("missing required configuration: project_id (or PROJECT_ID)");
        }
        if self.queue.notification_subscription_id.is_none() {
            anyhow::bail!(
                "missing required configuration: queue.notification_subscription_id (or NOTIFICATION_SUBSCRIPTION_ID)"
            );
        }
        if self.channels.email_topic_id.is_none() {
            anyhow::bail!(
                "missing required configuration: channels.email_topic_id (or EMAIL_TOPIC_ID)"
            );
        }
        Ok(())
    }
}

/// Load configuration from `<dir>/.notice.toml`, falling back to
/// defaults if the file is absent, then apply environment overrides.
/// Does not validate — call [`Config::validate`] once the caller knows
/// whether it's running against managed or local-filesystem
/// collaborators.
pub fn load_config(dir: &Path) -> Result<Config> {
    let path = config_path(dir);
    if !path.exists() {
        return Ok(Config::default().with_env_overrides());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config.with_env_overrides())
}
