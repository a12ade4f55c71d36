//! Database handle and table definitions.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use tracing::info;

use crate::error::Result;

// Readings table: key = (sensor_id, timestamp_micros), value = Reading (JSON)
pub(crate) const READINGS_TABLE: TableDefinition<(i64, i64), &str> =
    TableDefinition::new("readings");

// Sensors table: key = sensor_id, value = Sensor (JSON)
pub(crate) const SENSORS_TABLE: TableDefinition<i64, &str> = TableDefinition::new("sensors");

// Alerts table: key = alert_id, value = Alert (JSON)
pub(crate) const ALERTS_TABLE: TableDefinition<u64, &str> = TableDefinition::new("alerts");

// Meta table: counters (next alert id)
pub(crate) const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

pub(crate) const ALERT_ID_COUNTER: &str = "next_alert_id";

/// Open (or create) the database at `path` and ensure all tables exist.
pub fn open_database<P: AsRef<Path>>(path: P) -> Result<Arc<Database>> {
    let path_ref = path.as_ref();
    if let Some(parent) = path_ref.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = if path_ref.exists() {
        Database::open(path_ref)?
    } else {
        Database::create(path_ref)?
    };

    // Opening a table inside a write transaction creates it when missing,
    // so this covers both fresh and existing database files.
    let write_txn = db.begin_write()?;
    {
        let _readings = write_txn.open_table(READINGS_TABLE)?;
        let _sensors = write_txn.open_table(SENSORS_TABLE)?;
        let _alerts = write_txn.open_table(ALERTS_TABLE)?;
        let _meta = write_txn.open_table(META_TABLE)?;
    }
    write_txn.commit()?;

    info!("Database opened at {}", path_ref.display());
    Ok(Arc::new(db))
}
