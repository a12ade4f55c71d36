//! Sensor readings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Parameter, Protocol, ReadingQuality};

/// A single time-series reading from a sensor.
///
/// Identity is `(sensor_id, timestamp)`. Readings are immutable once
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: i64,
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub parameter: Parameter,
    pub protocol: Protocol,
    pub quality: ReadingQuality,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Input for creating a new reading.
///
/// Unset fields are defaulted by the ingestion gateway: `timestamp` to the
/// current time, `quality` to `good`, `parameter` to `none`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingInput {
    pub sensor_id: i64,
    pub organization_id: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub value: f64,
    #[serde(default)]
    pub parameter: Option<Parameter>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub quality: Option<ReadingQuality>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
