//! Ingestion gateway.
//!
//! Normalizes a decoded reading, writes it durably, then hands it to the
//! evaluation pool. The write is the only synchronous external call on the
//! hot path; evaluation is detached and never fails the ingestion call.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use skywatch_core::domain::{CreateReadingInput, Protocol, Reading};
use skywatch_storage::ReadingStore;

use crate::error::Result;
use crate::evaluator::EvaluatorPool;

/// Gateway between decoded messages and durable storage.
pub struct IngestionService {
    readings: Arc<dyn ReadingStore>,
    pool: EvaluatorPool,
}

impl IngestionService {
    pub fn new(readings: Arc<dyn ReadingStore>, pool: EvaluatorPool) -> Self {
        Self { readings, pool }
    }

    /// Persist one reading and schedule its threshold evaluation.
    ///
    /// Defaults applied here: timestamp = now when unset, quality = good,
    /// parameter = none. A storage failure propagates to the caller;
    /// evaluation scheduling cannot fail the call.
    pub async fn handle_reading(&self, input: CreateReadingInput) -> Result<Reading> {
        let reading = Reading {
            sensor_id: input.sensor_id,
            organization_id: input.organization_id,
            timestamp: input.timestamp.unwrap_or_else(Utc::now),
            value: input.value,
            parameter: input.parameter.unwrap_or_default(),
            protocol: input.protocol.unwrap_or(Protocol::Mqtt),
            quality: input.quality.unwrap_or_default(),
            notes: input.notes,
            metadata: input.metadata,
        };

        self.readings.create(&reading).await?;

        debug!(
            sensor_id = reading.sensor_id,
            value = reading.value,
            "Reading ingested"
        );

        // Fire-and-forget: the handler is not held up by cache fetches or
        // alert writes.
        self.pool.submit(reading.clone());

        Ok(reading)
    }
}
