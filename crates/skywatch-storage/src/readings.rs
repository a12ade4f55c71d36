//! Reading persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable};
use serde::{Deserialize, Serialize};

use skywatch_core::domain::Reading;

use crate::db::READINGS_TABLE;
use crate::error::{Error, Result};

/// Query parameters for listing readings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingQuery {
    pub organization_id: String,
    #[serde(default)]
    pub sensor_id: Option<i64>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Persistence contract for readings.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist one reading. Identity is `(sensor_id, timestamp)`.
    async fn create(&self, reading: &Reading) -> Result<()>;

    /// List readings matching the query, in timestamp order per sensor.
    async fn list(&self, query: ReadingQuery) -> Result<Vec<Reading>>;
}

/// redb-backed reading store.
pub struct RedbReadingStore {
    db: Arc<Database>,
}

impl RedbReadingStore {
    /// Create a store over an opened database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReadingStore for RedbReadingStore {
    async fn create(&self, reading: &Reading) -> Result<()> {
        let key = (reading.sensor_id, reading.timestamp.timestamp_micros());
        let json = serde_json::to_string(reading)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(READINGS_TABLE)?;
            table.insert(key, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    async fn list(&self, query: ReadingQuery) -> Result<Vec<Reading>> {
        if query.organization_id.is_empty() {
            return Err(Error::InvalidInput(
                "organization_id is required".to_string(),
            ));
        }

        let start = query
            .start_time
            .map(|t| t.timestamp_micros())
            .unwrap_or(i64::MIN);
        let end = query
            .end_time
            .map(|t| t.timestamp_micros())
            .unwrap_or(i64::MAX);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(READINGS_TABLE)?;

        let mut readings = Vec::new();
        let limit = query.limit.unwrap_or(usize::MAX);

        match query.sensor_id {
            Some(sensor_id) => {
                for result in table.range((sensor_id, start)..=(sensor_id, end))? {
                    let (_key, value) = result?;
                    let reading: Reading = serde_json::from_str(value.value())?;
                    if reading.organization_id == query.organization_id {
                        readings.push(reading);
                        if readings.len() >= limit {
                            break;
                        }
                    }
                }
            }
            None => {
                for result in table.iter()? {
                    let (key, value) = result?;
                    let (_sensor_id, micros) = key.value();
                    if micros < start || micros > end {
                        continue;
                    }
                    let reading: Reading = serde_json::from_str(value.value())?;
                    if reading.organization_id == query.organization_id {
                        readings.push(reading);
                        if readings.len() >= limit {
                            break;
                        }
                    }
                }
            }
        }

        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use skywatch_core::domain::{Parameter, Protocol, ReadingQuality};

    fn reading(sensor_id: i64, micros: i64, value: f64) -> Reading {
        Reading {
            sensor_id,
            organization_id: "acme".to_string(),
            timestamp: Utc.timestamp_micros(micros).unwrap(),
            value,
            parameter: Parameter::Temperature,
            protocol: Protocol::Mqtt,
            quality: ReadingQuality::Good,
            notes: String::new(),
            metadata: Default::default(),
        }
    }

    fn open_store() -> (tempfile::TempDir, RedbReadingStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open_database(dir.path().join("test.redb")).unwrap();
        (dir, RedbReadingStore::new(db))
    }

    #[tokio::test]
    async fn create_and_list_by_sensor() {
        let (_dir, store) = open_store();

        store.create(&reading(7, 1_000, 20.5)).await.unwrap();
        store.create(&reading(7, 2_000, 21.0)).await.unwrap();
        store.create(&reading(8, 1_500, 99.0)).await.unwrap();

        let results = store
            .list(ReadingQuery {
                organization_id: "acme".to_string(),
                sensor_id: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value, 20.5);
        assert_eq!(results[1].value, 21.0);
    }

    #[tokio::test]
    async fn list_honors_time_range_and_limit() {
        let (_dir, store) = open_store();

        for i in 0..10 {
            store.create(&reading(1, i * 1_000, i as f64)).await.unwrap();
        }

        let results = store
            .list(ReadingQuery {
                organization_id: "acme".to_string(),
                sensor_id: Some(1),
                start_time: Some(Utc.timestamp_micros(2_000).unwrap()),
                end_time: Some(Utc.timestamp_micros(8_000).unwrap()),
                limit: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].value, 2.0);
    }

    #[tokio::test]
    async fn list_requires_organization() {
        let (_dir, store) = open_store();
        let err = store.list(ReadingQuery::default()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn list_filters_foreign_organizations() {
        let (_dir, store) = open_store();

        let mut other = reading(7, 1_000, 1.0);
        other.organization_id = "rival".to_string();
        store.create(&other).await.unwrap();
        store.create(&reading(7, 2_000, 2.0)).await.unwrap();

        let results = store
            .list(ReadingQuery {
                organization_id: "acme".to_string(),
                sensor_id: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, 2.0);
    }
}
