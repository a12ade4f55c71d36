//! Payload decoding into typed message variants.
//!
//! The action segment of the topic tags which schema the payload must
//! follow. Decoding is pure and does no semantic range validation; a
//! negative value is the evaluator's problem, not the decoder's.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use skywatch_core::domain::{CreateReadingInput, Parameter, Protocol, ReadingQuality};

use crate::error::{Error, Result};
use crate::topic::ParsedTopic;

/// A single published reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMessage {
    /// Sensor id; 0 means "use the topic's sensor id" (batch items).
    #[serde(default)]
    pub sensor_id: i64,
    pub value: f64,
    /// RFC3339 timestamp. Absent or unparseable falls back to ingest time.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parameter: Option<Parameter>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub quality: Option<ReadingQuality>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Treat `""` (and `null`) as an unset enum field so the gateway's defaults
/// apply; devices commonly send empty strings for fields they don't fill.
fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(ref s) if s.is_empty() => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// A batch of readings published in one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMessage {
    pub readings: Vec<ReadingMessage>,
}

/// A device's response to a previously issued command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponseMessage {
    pub command_id: i64,
    pub status: String,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Closed set of decoded message kinds, tagged by the topic's action.
#[derive(Debug, Clone)]
pub enum MqttMessage {
    Reading(ReadingMessage),
    Batch(BatchMessage),
    CommandResponse(CommandResponseMessage),
}

/// Decode raw payload bytes for the given action.
pub fn decode_message(payload: &[u8], action: &str) -> Result<MqttMessage> {
    match action {
        "readings" => Ok(MqttMessage::Reading(serde_json::from_slice(payload)?)),
        "batch" => Ok(MqttMessage::Batch(serde_json::from_slice(payload)?)),
        "command-response" => Ok(MqttMessage::CommandResponse(serde_json::from_slice(
            payload,
        )?)),
        other => Err(Error::UnsupportedAction(other.to_string())),
    }
}

impl ReadingMessage {
    /// Build the ingestion input for a single-reading publish.
    ///
    /// The topic's sensor id is authoritative; an id carried in the payload
    /// is ignored.
    pub fn into_input(self, topic: &ParsedTopic) -> CreateReadingInput {
        let sensor_id = topic.sensor_id;
        self.build_input(sensor_id, topic)
    }

    /// Build the ingestion input for one batch item.
    ///
    /// Items without their own sensor id inherit the topic's; an explicit
    /// nonzero id is preserved.
    pub fn into_batch_input(self, topic: &ParsedTopic) -> CreateReadingInput {
        let sensor_id = if self.sensor_id == 0 {
            topic.sensor_id
        } else {
            self.sensor_id
        };
        self.build_input(sensor_id, topic)
    }

    /// An unparseable timestamp string is treated as absent.
    fn build_input(self, sensor_id: i64, topic: &ParsedTopic) -> CreateReadingInput {
        let timestamp: Option<DateTime<Utc>> = self
            .timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        CreateReadingInput {
            sensor_id,
            organization_id: topic.organization_id.clone(),
            timestamp,
            value: self.value,
            parameter: self.parameter,
            protocol: Some(Protocol::Mqtt),
            quality: self.quality,
            notes: String::new(),
            metadata: self.metadata,
        }
    }
}
