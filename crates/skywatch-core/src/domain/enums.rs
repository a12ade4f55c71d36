//! String-backed enums used throughout the domain model.

use serde::{Deserialize, Serialize};

/// Severity level of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    Emergency,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
            AlertSeverity::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

/// Parameter measured by a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    #[default]
    None,
    Ph,
    Chlorine,
    DissolvedOxygen,
    Turbidity,
    Temperature,
    Conductivity,
    Flow,
    Pressure,
    Level,
    Vibration,
}

/// Communication protocol a reading arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Mqtt,
    OpcUa,
    Modbus,
    Http,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Protocol::Mqtt => "mqtt",
            Protocol::OpcUa => "opc_ua",
            Protocol::Modbus => "modbus",
            Protocol::Http => "http",
        };
        f.write_str(s)
    }
}

/// Quality annotation attached to a reading by the producing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingQuality {
    #[default]
    Good,
    Uncertain,
    Bad,
    Simulated,
}
