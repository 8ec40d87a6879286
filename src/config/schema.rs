use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::catalog::{CatalogOptions, PropagationDelay, DEFAULT_SCHEMA};

pub const ENV_PREFIX: &str = "REMOTE_CATALOG";

#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct RemoteCatalogConfig {
    pub meta: Meta,
    #[serde(default)]
    pub heartbeat: Heartbeat,
    #[serde(default)]
    pub misc: Misc,
}

/// Where the metadata service lives.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Meta {
    Grpc(Grpc),
    #[serde(rename = "memory")]
    InMemory(InMemory),
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Grpc {
    pub dsn: String,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct InMemory {}

#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct Heartbeat {
    pub interval_ms: u64,
    pub propagation_multiplier: f64,
    pub node_id: Option<String>,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            propagation_multiplier: PropagationDelay::DEFAULT_MULTIPLIER,
            node_id: None,
        }
    }
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(default)]
pub struct Misc {
    pub log_format: LogFormat,
    pub default_schema: String,
}

impl Default for Misc {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl RemoteCatalogConfig {
    pub fn catalog_options(&self) -> CatalogOptions {
        let heartbeat_interval = Duration::from_millis(self.heartbeat.interval_ms);
        let defaults = CatalogOptions::default();

        CatalogOptions {
            heartbeat_interval,
            propagation_delay: PropagationDelay::from_heartbeat(
                heartbeat_interval,
                self.heartbeat.propagation_multiplier,
            ),
            node_id: self.heartbeat.node_id.clone().unwrap_or(defaults.node_id),
        }
    }
}

pub fn validate_config(config: RemoteCatalogConfig) -> Result<RemoteCatalogConfig, ConfigError> {
    if config.heartbeat.interval_ms == 0 {
        return Err(ConfigError::Message(
            "The heartbeat interval must be positive".to_string(),
        ));
    }

    // A shorter wait returns before the other frontends had a full heartbeat
    // period to see the change.
    let multiplier = config.heartbeat.propagation_multiplier;
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(ConfigError::Message(format!(
            "The propagation multiplier must be at least 1.0 and finite, got {multiplier}"
        )));
    }
    let interval = Duration::from_millis(config.heartbeat.interval_ms);
    if PropagationDelay::checked_from_heartbeat(interval, multiplier).is_none() {
        return Err(ConfigError::Message(format!(
            "The propagation delay of {multiplier} x {}ms is out of range",
            config.heartbeat.interval_ms
        )));
    }

    if config.misc.default_schema.is_empty() {
        return Err(ConfigError::Message(
            "The default schema name can't be empty".to_string(),
        ));
    }

    Ok(config)
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

pub fn load_config(path: &Path) -> Result<RemoteCatalogConfig, ConfigError> {
    let path = path.to_str().ok_or_else(|| {
        ConfigError::Message(format!("Invalid config path {}", path.display()))
    })?;
    let config = Config::builder()
        .add_source(File::with_name(path))
        .add_source(environment());

    config.build()?.try_deserialize().and_then(validate_config)
}

// Load a config from a string (to test our structs are defined correctly)
pub fn load_config_from_string(
    config_str: &str,
    skip_validation: bool,
) -> Result<RemoteCatalogConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(config_str, FileFormat::Toml))
        .add_source(environment());

    if skip_validation {
        config.build()?.try_deserialize()
    } else {
        config.build()?.try_deserialize().and_then(validate_config)
    }
}
