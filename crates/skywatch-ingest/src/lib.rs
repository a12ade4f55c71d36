//! Skywatch ingestion pipeline.
//!
//! The path from an inbound MQTT publish to durable storage and alerting:
//!
//! - **topic** — topic grammar parsing
//! - **message** — payload decoding into typed variants
//! - **ingestion** — normalization, the durable write, evaluation hand-off
//! - **cache** — per-sensor threshold cache (lazy fill + periodic refresh)
//! - **evaluator** — threshold checks and alert emission on a bounded pool
//! - **worker** — rumqttc session ownership and dispatch
//!
//! Readings are written synchronously; everything after the write is
//! best-effort and detached from the message handler.

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod ingestion;
pub mod message;
pub mod refresh;
pub mod topic;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{ThresholdCache, ThresholdEntry};
pub use error::{Error, Result};
pub use evaluator::{check_thresholds, Evaluator, EvaluatorPool, Violation};
pub use ingestion::IngestionService;
pub use message::{decode_message, BatchMessage, CommandResponseMessage, MqttMessage, ReadingMessage};
pub use refresh::spawn_refresh_loop;
pub use topic::{parse_topic, ParsedTopic, SUBSCRIBE_FILTER, TOPIC_ROOT};
pub use worker::{MqttWorker, MqttWorkerHandle};
