//! Alert persistence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable};
use serde::{Deserialize, Serialize};

use skywatch_core::domain::{Alert, AlertSeverity, CreateAlertInput};

use crate::db::{ALERTS_TABLE, ALERT_ID_COUNTER, META_TABLE};
use crate::error::{Error, Result};

/// Query parameters for listing alerts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertQuery {
    pub organization_id: String,
    #[serde(default)]
    pub sensor_id: Option<i64>,
    #[serde(default)]
    pub severity: Option<AlertSeverity>,
    #[serde(default)]
    pub acknowledged: Option<bool>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Persistence contract for alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Persist a new alert, assigning its id.
    async fn create(&self, input: CreateAlertInput) -> Result<Alert>;

    /// Fetch an alert scoped to an organization.
    async fn get_by_id(&self, id: u64, organization_id: &str) -> Result<Alert>;

    /// List alerts matching the query, oldest first.
    async fn list(&self, query: AlertQuery) -> Result<Vec<Alert>>;

    /// Replace an existing alert record (acknowledgement updates).
    async fn update(&self, alert: &Alert) -> Result<()>;
}

/// redb-backed alert store.
pub struct RedbAlertStore {
    db: Arc<Database>,
}

impl RedbAlertStore {
    /// Create a store over an opened database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AlertStore for RedbAlertStore {
    async fn create(&self, input: CreateAlertInput) -> Result<Alert> {
        let mut alert = input.into_alert();

        let write_txn = self.db.begin_write()?;
        {
            // Assign the next id from the meta counter within the same
            // transaction as the insert.
            let mut meta = write_txn.open_table(META_TABLE)?;
            let next = meta.get(ALERT_ID_COUNTER)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(ALERT_ID_COUNTER, next + 1)?;
            alert.id = next;

            let mut table = write_txn.open_table(ALERTS_TABLE)?;
            let json = serde_json::to_string(&alert)?;
            table.insert(alert.id, json.as_str())?;
        }
        write_txn.commit()?;

        Ok(alert)
    }

    async fn get_by_id(&self, id: u64, organization_id: &str) -> Result<Alert> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALERTS_TABLE)?;

        match table.get(id)? {
            Some(value) => {
                let alert: Alert = serde_json::from_str(value.value())?;
                if alert.organization_id != organization_id {
                    return Err(Error::NotFound(format!("alert {}", id)));
                }
                Ok(alert)
            }
            None => Err(Error::NotFound(format!("alert {}", id))),
        }
    }

    async fn list(&self, query: AlertQuery) -> Result<Vec<Alert>> {
        if query.organization_id.is_empty() {
            return Err(Error::InvalidInput(
                "organization_id is required".to_string(),
            ));
        }

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ALERTS_TABLE)?;

        let limit = query.limit.unwrap_or(usize::MAX);
        let mut alerts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let alert: Alert = serde_json::from_str(value.value())?;

            if alert.organization_id != query.organization_id {
                continue;
            }
            if let Some(sensor_id) = query.sensor_id {
                if alert.sensor_id != sensor_id {
                    continue;
                }
            }
            if let Some(severity) = query.severity {
                if alert.severity != severity {
                    continue;
                }
            }
            if let Some(acknowledged) = query.acknowledged {
                if alert.acknowledged != acknowledged {
                    continue;
                }
            }
            if let Some(start) = query.start_time {
                if alert.timestamp < start {
                    continue;
                }
            }
            if let Some(end) = query.end_time {
                if alert.timestamp > end {
                    continue;
                }
            }

            alerts.push(alert);
            if alerts.len() >= limit {
                break;
            }
        }

        Ok(alerts)
    }

    async fn update(&self, alert: &Alert) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ALERTS_TABLE)?;
            if table.get(alert.id)?.is_none() {
                return Err(Error::NotFound(format!("alert {}", alert.id)));
            }
            let json = serde_json::to_string(alert)?;
            table.insert(alert.id, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skywatch_core::domain::Protocol;

    fn input(sensor_id: i64, severity: AlertSeverity, value: f64) -> CreateAlertInput {
        CreateAlertInput {
            sensor_id,
            organization_id: "acme".to_string(),
            timestamp: Utc::now(),
            severity,
            message: format!("value {} out of range", value),
            trigger_value: value,
            threshold_value: Some(90.0),
            protocol: Protocol::Mqtt,
            metadata: Default::default(),
        }
    }

    fn open_store() -> (tempfile::TempDir, RedbAlertStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::open_database(dir.path().join("test.redb")).unwrap();
        (dir, RedbAlertStore::new(db))
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let (_dir, store) = open_store();

        let a = store.create(input(7, AlertSeverity::Critical, 95.0)).await.unwrap();
        let b = store.create(input(7, AlertSeverity::Warning, 2.0)).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(!a.acknowledged);
    }

    #[tokio::test]
    async fn list_filters_by_severity_and_sensor() {
        let (_dir, store) = open_store();
        store.create(input(7, AlertSeverity::Critical, 95.0)).await.unwrap();
        store.create(input(7, AlertSeverity::Warning, 2.0)).await.unwrap();
        store.create(input(8, AlertSeverity::Critical, 91.0)).await.unwrap();

        let criticals = store
            .list(AlertQuery {
                organization_id: "acme".to_string(),
                severity: Some(AlertSeverity::Critical),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(criticals.len(), 2);

        let sensor7 = store
            .list(AlertQuery {
                organization_id: "acme".to_string(),
                sensor_id: Some(7),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sensor7.len(), 2);
    }

    #[tokio::test]
    async fn acknowledge_round_trip() {
        let (_dir, store) = open_store();
        let mut alert = store.create(input(7, AlertSeverity::Critical, 95.0)).await.unwrap();

        alert.acknowledged = true;
        alert.acknowledged_at = Some(Utc::now());
        alert.acknowledged_by = "operator".to_string();
        store.update(&alert).await.unwrap();

        let found = store.get_by_id(alert.id, "acme").await.unwrap();
        assert!(found.acknowledged);
        assert_eq!(found.acknowledged_by, "operator");

        let open = store
            .list(AlertQuery {
                organization_id: "acme".to_string(),
                acknowledged: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(open.is_empty());
    }
}
