//! Threshold evaluation and alert emission.
//!
//! Evaluation is best-effort and runs off the ingestion hot path on a small
//! bounded worker pool. Every failure in here is logged and swallowed; a
//! reading that was durably written never becomes un-ingested because its
//! evaluation went wrong.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use skywatch_core::domain::{Alert, AlertSeverity, CreateAlertInput, Reading};
use skywatch_storage::AlertStore;

use crate::cache::{ThresholdCache, ThresholdEntry};

/// A threshold violation found for a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
    pub severity: AlertSeverity,
    pub threshold: f64,
}

/// Decide whether a value violates the cached thresholds.
///
/// Checked in priority order, first match wins: above max is critical,
/// below min is a warning. Comparisons are strict; a value exactly equal
/// to a threshold does not alert.
pub fn check_thresholds(value: f64, entry: ThresholdEntry) -> Option<Violation> {
    if let Some(max) = entry.max {
        if value > max {
            return Some(Violation {
                severity: AlertSeverity::Critical,
                threshold: max,
            });
        }
    }
    if let Some(min) = entry.min {
        if value < min {
            return Some(Violation {
                severity: AlertSeverity::Warning,
                threshold: min,
            });
        }
    }
    None
}

/// Evaluates readings against cached thresholds and persists alerts.
pub struct Evaluator {
    cache: Arc<ThresholdCache>,
    alerts: Arc<dyn AlertStore>,
}

impl Evaluator {
    pub fn new(cache: Arc<ThresholdCache>, alerts: Arc<dyn AlertStore>) -> Self {
        Self { cache, alerts }
    }

    /// Evaluate one reading. Never returns an error; at most one alert is
    /// emitted per reading.
    pub async fn evaluate(&self, reading: &Reading) -> Option<Alert> {
        let entry = match self
            .cache
            .get(reading.sensor_id, &reading.organization_id)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!(
                    sensor_id = reading.sensor_id,
                    "Failed to fetch thresholds for evaluation: {}", e
                );
                return None;
            }
        };

        let violation = check_thresholds(reading.value, entry)?;

        let message = match violation.severity {
            AlertSeverity::Critical => format!(
                "Value {} exceeds maximum threshold {}",
                reading.value, violation.threshold
            ),
            _ => format!(
                "Value {} below minimum threshold {}",
                reading.value, violation.threshold
            ),
        };

        let input = CreateAlertInput {
            sensor_id: reading.sensor_id,
            organization_id: reading.organization_id.clone(),
            timestamp: reading.timestamp,
            severity: violation.severity,
            message,
            trigger_value: reading.value,
            threshold_value: Some(violation.threshold),
            protocol: reading.protocol,
            metadata: Default::default(),
        };

        match self.alerts.create(input).await {
            Ok(alert) => {
                info!(
                    sensor_id = reading.sensor_id,
                    alert_id = alert.id,
                    severity = %alert.severity,
                    "Alert created"
                );
                Some(alert)
            }
            Err(e) => {
                error!(sensor_id = reading.sensor_id, "Failed to create alert: {}", e);
                None
            }
        }
    }
}

/// Bounded pool of evaluation workers fed by a fire-and-forget queue.
///
/// Submission never blocks the ingestion path: when the queue is full the
/// reading's evaluation is dropped and logged. In-flight evaluations are
/// not awaited on shutdown.
pub struct EvaluatorPool {
    tx: async_channel::Sender<Reading>,
    workers: Vec<JoinHandle<()>>,
}

impl EvaluatorPool {
    /// Spawn `workers` evaluation tasks sharing a queue of `capacity`.
    pub fn spawn(
        evaluator: Evaluator,
        workers: usize,
        capacity: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (tx, rx) = async_channel::bounded::<Reading>(capacity);
        let evaluator = Arc::new(evaluator);

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let evaluator = evaluator.clone();
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            reading = rx.recv() => match reading {
                                Ok(reading) => {
                                    evaluator.evaluate(&reading).await;
                                }
                                Err(_) => break,
                            },
                            changed = shutdown.changed() => {
                                if changed.is_err() || *shutdown.borrow() {
                                    break;
                                }
                            }
                        }
                    }
                    debug!(worker, "Evaluation worker stopped");
                })
            })
            .collect();

        Self {
            tx,
            workers: handles,
        }
    }

    /// Submit a reading for evaluation. Fire-and-forget: a full or closed
    /// queue drops the evaluation, never the ingestion.
    pub fn submit(&self, reading: Reading) {
        if let Err(e) = self.tx.try_send(reading) {
            warn!("Dropping threshold evaluation: {}", e);
        }
    }

    /// Number of worker tasks (for wiring logs).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}
