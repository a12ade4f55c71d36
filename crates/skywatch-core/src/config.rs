//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// MQTT transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host.
    pub broker: String,

    /// Broker port.
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// Client ID; a random suffix is generated when unset.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Username for authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// Keep-alive interval in seconds.
    #[serde(default = "default_keep_alive")]
    pub keep_alive: u64,
}

fn default_broker_port() -> u16 {
    1883
}

fn default_keep_alive() -> u64 {
    30
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "localhost".to_string(),
            port: default_broker_port(),
            client_id: None,
            username: None,
            password: None,
            keep_alive: default_keep_alive(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the database file.
    pub path: PathBuf,
}

/// Threshold refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between full threshold refreshes.
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
}

fn default_refresh_interval() -> u64 {
    300
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval(),
        }
    }
}

impl RefreshConfig {
    /// Refresh interval as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
