//! Process configuration.
//!
//! Settings come from three layers, later ones winning: built-in defaults
//! (matching the public-broker setup the bridge ships with), an optional TOML
//! file, and `PLANTBRIDGE_*` environment variables. Missing configuration
//! degrades to defaults rather than preventing startup.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::mqtt::MqttConfig;

const CONFIG_PATH_VAR: &str = "PLANTBRIDGE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "plantbridge.toml";
const CLIENT_ID: &str = "plantbridge";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Hostname of the MQTT broker
    pub broker_host: String,
    /// MQTT port on the broker
    pub broker_port: u16,
    /// Topic the sensor publishes readings to
    pub topic: String,
    /// TCP port the query service listens on
    pub listen_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.hivemq.com".to_string(),
            broker_port: 1883,
            topic: "plant/watering/system".to_string(),
            listen_port: 5000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value in `{var}`: {value}")]
    InvalidEnv { var: String, value: String },
}

impl BridgeConfig {
    /// Loads configuration: defaults, then the TOML file (if any), then
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let parsed = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
            info!("Loaded configuration from {}", path);
            parsed
        } else {
            debug!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("PLANTBRIDGE_BROKER_HOST") {
            self.broker_host = host;
        }
        if let Ok(topic) = std::env::var("PLANTBRIDGE_TOPIC") {
            self.topic = topic;
        }
        self.broker_port = parse_port(
            "PLANTBRIDGE_BROKER_PORT",
            std::env::var("PLANTBRIDGE_BROKER_PORT").ok(),
            self.broker_port,
        )?;
        self.listen_port = parse_port(
            "PLANTBRIDGE_LISTEN_PORT",
            std::env::var("PLANTBRIDGE_LISTEN_PORT").ok(),
            self.listen_port,
        )?;
        Ok(())
    }

    /// Connection parameters for the subscription client.
    pub fn mqtt(&self) -> MqttConfig {
        MqttConfig {
            broker_host: self.broker_host.clone(),
            broker_port: self.broker_port,
            topic: self.topic.clone(),
            client_id: CLIENT_ID.to_string(),
        }
    }
}

fn parse_port(var: &str, value: Option<String>, fallback: u16) -> Result<u16, ConfigError> {
    match value {
        None => Ok(fallback),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
            var: var.to_string(),
            value,
        }),
    }
}
