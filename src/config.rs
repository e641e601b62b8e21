use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::worker::intervention::InterventionPolicy;

/// Main configuration structure for Foreman
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForemanConfig {
    /// Intervention policy settings
    pub intervention: InterventionConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Monitor persistence settings
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterventionConfig {
    /// Minutes of idle time before a Working agent is considered stalled
    pub stale_after_minutes: u64,
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level filter when RUST_LOG is unset
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Path where the worker table snapshot is persisted
    pub snapshot_path: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            snapshot_path: ".foreman/workers.json".to_string(),
        }
    }
}

impl ForemanConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. foreman.toml in the working directory
    /// 3. Environment variables (prefixed with FOREMAN_)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if Path::new("foreman.toml").exists() {
            builder = builder.add_source(File::with_name("foreman"));
        }

        builder = builder.add_source(
            Environment::with_prefix("FOREMAN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Intervention policy configured by this file.
    pub fn intervention_policy(&self) -> InterventionPolicy {
        InterventionPolicy::new(chrono::Duration::minutes(
            self.intervention.stale_after_minutes as i64,
        ))
    }
}
