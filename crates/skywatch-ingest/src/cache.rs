//! Threshold cache.
//!
//! Process-wide map from sensor id to its configured thresholds. Entries are
//! lazily filled on first lookup and replaced wholesale by the periodic
//! refresh. A threshold changed externally becomes visible after the next
//! successful refresh or the next miss for that sensor; this bounded
//! staleness is accepted in exchange for keeping lookups off the hot path's
//! critical section.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use skywatch_storage::SensorStore;

use crate::error::Result;

/// Cached thresholds for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThresholdEntry {
    /// Readings strictly below this raise a warning.
    pub min: Option<f64>,
    /// Readings strictly above this raise a critical alert.
    pub max: Option<f64>,
}

/// Concurrent threshold cache over the sensor store.
pub struct ThresholdCache {
    entries: DashMap<i64, ThresholdEntry>,
    sensors: Arc<dyn SensorStore>,
}

impl ThresholdCache {
    /// Create an empty cache backed by the given sensor store.
    pub fn new(sensors: Arc<dyn SensorStore>) -> Self {
        Self {
            entries: DashMap::new(),
            sensors,
        }
    }

    /// Look up a sensor's thresholds, fetching and populating on a miss.
    ///
    /// A failed fetch is not cached; the next lookup retries.
    pub async fn get(&self, sensor_id: i64, organization_id: &str) -> Result<ThresholdEntry> {
        if let Some(entry) = self.entries.get(&sensor_id) {
            return Ok(*entry);
        }

        let sensor = self.sensors.get_by_id(sensor_id, organization_id).await?;
        let entry = ThresholdEntry {
            min: sensor.threshold_low,
            max: sensor.threshold_high,
        };
        self.entries.insert(sensor_id, entry);
        Ok(entry)
    }

    /// Replace the whole cache from the sensor store.
    ///
    /// Every listed sensor's entry is overwritten and entries for sensors
    /// that no longer exist are dropped. Returns the number of cached
    /// sensors.
    pub async fn refresh_all(&self) -> Result<usize> {
        let sensors = self.sensors.list_all().await?;

        let mut known: HashSet<i64> = HashSet::with_capacity(sensors.len());
        for sensor in &sensors {
            known.insert(sensor.id);
            self.entries.insert(
                sensor.id,
                ThresholdEntry {
                    min: sensor.threshold_low,
                    max: sensor.threshold_high,
                },
            );
        }
        self.entries.retain(|id, _| known.contains(id));

        info!(count = sensors.len(), "Refreshed sensor threshold cache");
        Ok(sensors.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::testing::{sensor, StubSensorStore};

    #[tokio::test]
    async fn miss_populates_then_hits() {
        let store = StubSensorStore::with(vec![sensor(7, Some(10.0), Some(90.0))]);
        let cache = ThresholdCache::new(store.clone());

        let entry = cache.get(7, "acme").await.unwrap();
        assert_eq!(entry.max, Some(90.0));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        // Second lookup for the same key must not re-fetch.
        let entry = cache.get(7, "acme").await.unwrap();
        assert_eq!(entry.min, Some(10.0));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let store = StubSensorStore::with(vec![sensor(7, None, Some(90.0))]);
        let cache = ThresholdCache::new(store.clone());

        store.fail_fetches.store(true, Ordering::SeqCst);
        assert!(cache.get(7, "acme").await.is_err());

        // The next lookup retries the fetch and succeeds.
        store.fail_fetches.store(false, Ordering::SeqCst);
        let entry = cache.get(7, "acme").await.unwrap();
        assert_eq!(entry.max, Some(90.0));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_overwrites_stale_entries() {
        let store = StubSensorStore::with(vec![sensor(7, None, Some(90.0))]);
        let cache = ThresholdCache::new(store.clone());

        cache.get(7, "acme").await.unwrap();

        // Thresholds change at the source.
        store.update(&sensor(7, Some(5.0), Some(50.0))).await.unwrap();
        store.create(&sensor(8, None, None)).await.unwrap();

        let count = cache.refresh_all().await.unwrap();
        assert_eq!(count, 2);

        let entry = cache.get(7, "acme").await.unwrap();
        assert_eq!(entry, ThresholdEntry { min: Some(5.0), max: Some(50.0) });
        // No extra fetch: refresh populated the entry.
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_drops_deleted_sensors() {
        let store = StubSensorStore::with(vec![sensor(7, None, Some(90.0))]);
        let cache = ThresholdCache::new(store.clone());
        cache.refresh_all().await.unwrap();

        store.sensors.lock().unwrap().clear();
        let count = cache.refresh_all().await.unwrap();
        assert_eq!(count, 0);

        // Entry is gone, so the next get goes back to the store.
        assert!(cache.get(7, "acme").await.is_err());
    }
}
