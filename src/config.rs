//! Configuration — TOML file defaults + environment variable overrides.
//!
//! Tunables live in `config/default.toml`. The database URL and anything
//! secret come from environment variables.

use serde::Deserialize;
use std::env;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub rooms: RoomsConfig,
    pub sweeper: SweeperConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}
fn default_port() -> u16 {
    8080
}

/// Room lifecycle timing knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomsConfig {
    /// Hours participants get to agree once the room fills.
    #[serde(default = "default_agreement_hours")]
    pub agreement_deadline_hours: i64,
    /// Hours participants get to press start once everyone has agreed.
    #[serde(default = "default_start_hours")]
    pub start_deadline_hours: i64,
}

fn default_agreement_hours() -> i64 {
    24
}
fn default_start_hours() -> i64 {
    2
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            agreement_deadline_hours: default_agreement_hours(),
            start_deadline_hours: default_start_hours(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_output: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from `config/default.toml` merged with env vars
    /// prefixed with `SM`.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("SM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = builder.try_deserialize()?;

        // The database URL should never live in TOML
        if let Ok(v) = env::var("DATABASE_URL") {
            cfg.database.url = v;
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_defaults_match_lifecycle_rules() {
        let cfg = RoomsConfig::default();
        assert_eq!(cfg.agreement_deadline_hours, 24);
        assert_eq!(cfg.start_deadline_hours, 2);
    }
}
