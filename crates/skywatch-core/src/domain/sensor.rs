//! Sensor records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Parameter, Protocol};

/// A configured field sensor.
///
/// The ingestion pipeline consumes the threshold fields; everything else is
/// carried for the management surfaces that share the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: i64,
    pub organization_id: String,
    pub name: String,
    pub parameter: Parameter,
    #[serde(default)]
    pub unit: String,
    /// Readings below this value raise a warning alert.
    #[serde(default)]
    pub threshold_low: Option<f64>,
    /// Readings above this value raise a critical alert.
    #[serde(default)]
    pub threshold_high: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub protocol: Protocol,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}
