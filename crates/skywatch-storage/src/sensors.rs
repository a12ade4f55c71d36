//! Sensor persistence.

use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable};

use skywatch_core::domain::Sensor;

use crate::db::SENSORS_TABLE;
use crate::error::{Error, Result};

/// Persistence contract for sensors.
///
/// The ingestion pipeline only reads (`get_by_id`, `list_all`); the write
/// operations exist for the management surfaces that share the store.
#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Persist a sensor record.
    async fn create(&self, sensor: &Sensor) -> Result<()>;

    /// Fetch a sensor scoped to an organization. `NotFound` when absent or
    /// owned by a different organization.
    async fn get_by_id(&self, id: i64, organization_id: &str) -> Result<Sensor>;

    /// List all sensors belonging to one organization.
    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Sensor>>;

    /// List every sensor across all organizations.
    async fn list_all(&self) -> Result<Vec<Sensor>>;

    /// Replace an existing sensor record.
    async fn update(&self, sensor: &Sensor) -> Result<()>;
}

/// redb-backed sensor store.
pub struct RedbSensorStore {
    db: Arc<Database>,
}

impl RedbSensorStore {
    /// Create a store over an opened database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn put(&self, sensor: &Sensor) -> Result<()> {
        let json = serde_json::to_string(sensor)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SENSORS_TABLE)?;
            table.insert(sensor.id, json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl SensorStore for RedbSensorStore {
    async fn create(&self, sensor: &Sensor) -> Result<()> {
        self.put(sensor)
    }

    async fn get_by_id(&self, id: i64, organization_id: &str) -> Result<Sensor> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SENSORS_TABLE)?;

        match table.get(id)? {
            Some(value) => {
                let sensor: Sensor = serde_json::from_str(value.value())?;
                if sensor.organization_id != organization_id {
                    return Err(Error::NotFound(format!("sensor {}", id)));
                }
                Ok(sensor)
            }
            None => Err(Error::NotFound(format!("sensor {}", id))),
        }
    }

    async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Sensor>> {
        let all = self.list_all().await?;
        Ok(all
            .into_iter()
            .filter(|s| s.organization_id == organization_id)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Sensor>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SENSORS_TABLE)?;

        let mut sensors = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let sensor: Sensor = serde_json::from_str(value.value())?;
            sensors.push(sensor);
        }
        Ok(sensors)
    }

    async fn update(&self, sensor: &Sensor) -> Result<()> {
        // Reject updates to unknown sensors so callers notice lost records.
        {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(SENSORS_TABLE)?;
            if table.get(sensor.id)?.is_none() {
                return Err(Error::NotFound(format!("sensor {}", sensor.id)));
            }
        }
        self.put(sensor)
    }
}
