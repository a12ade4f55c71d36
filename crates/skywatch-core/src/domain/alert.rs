//! Threshold alerts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AlertSeverity, Protocol};

/// An alert raised when a reading violates a sensor's thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Store-assigned identifier, 0 until persisted.
    #[serde(default)]
    pub id: u64,
    pub sensor_id: i64,
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    pub trigger_value: f64,
    #[serde(default)]
    pub threshold_value: Option<f64>,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub acknowledged_by: String,
    #[serde(default)]
    pub notes: String,
    pub protocol: Protocol,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Input for creating a new alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertInput {
    pub sensor_id: i64,
    pub organization_id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub message: String,
    pub trigger_value: f64,
    #[serde(default)]
    pub threshold_value: Option<f64>,
    pub protocol: Protocol,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CreateAlertInput {
    /// Materialize the alert record the store will persist.
    pub fn into_alert(self) -> Alert {
        Alert {
            id: 0,
            sensor_id: self.sensor_id,
            organization_id: self.organization_id,
            timestamp: self.timestamp,
            severity: self.severity,
            message: self.message,
            trigger_value: self.trigger_value,
            threshold_value: self.threshold_value,
            acknowledged: false,
            acknowledged_at: None,
            acknowledged_by: String::new(),
            notes: String::new(),
            protocol: self.protocol,
            metadata: self.metadata,
        }
    }
}
