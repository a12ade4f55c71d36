//! In-memory store stubs shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use skywatch_core::domain::{Alert, CreateAlertInput, Parameter, Protocol, Sensor};
use skywatch_storage::{AlertQuery, AlertStore, Error as StorageError, SensorStore};

/// Build a test sensor with the given thresholds.
pub fn sensor(id: i64, low: Option<f64>, high: Option<f64>) -> Sensor {
    Sensor {
        id,
        organization_id: "acme".to_string(),
        name: format!("s{}", id),
        parameter: Parameter::Temperature,
        unit: "C".to_string(),
        threshold_low: low,
        threshold_high: high,
        is_active: true,
        protocol: Protocol::Mqtt,
        metadata: Default::default(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Sensor store stub that counts fetches and can be made to fail.
pub struct StubSensorStore {
    pub sensors: Mutex<Vec<Sensor>>,
    pub fetches: AtomicUsize,
    pub fail_fetches: AtomicBool,
}

impl StubSensorStore {
    pub fn empty() -> Arc<Self> {
        Self::with(Vec::new())
    }

    pub fn with(sensors: Vec<Sensor>) -> Arc<Self> {
        Arc::new(Self {
            sensors: Mutex::new(sensors),
            fetches: AtomicUsize::new(0),
            fail_fetches: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl SensorStore for StubSensorStore {
    async fn create(&self, sensor: &Sensor) -> skywatch_storage::Result<()> {
        self.sensors.lock().unwrap().push(sensor.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: i64, org: &str) -> skywatch_storage::Result<Sensor> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(StorageError::Storage("backend down".to_string()));
        }
        self.sensors
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id && s.organization_id == org)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("sensor {}", id)))
    }

    async fn list_by_organization(&self, org: &str) -> skywatch_storage::Result<Vec<Sensor>> {
        Ok(self
            .sensors
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.organization_id == org)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> skywatch_storage::Result<Vec<Sensor>> {
        Ok(self.sensors.lock().unwrap().clone())
    }

    async fn update(&self, sensor: &Sensor) -> skywatch_storage::Result<()> {
        let mut sensors = self.sensors.lock().unwrap();
        match sensors.iter_mut().find(|s| s.id == sensor.id) {
            Some(slot) => {
                *slot = sensor.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("sensor {}", sensor.id))),
        }
    }
}

/// Alert store stub recording created alerts, optionally failing writes.
pub struct StubAlertStore {
    pub alerts: Mutex<Vec<Alert>>,
    pub fail_creates: AtomicBool,
}

impl StubAlertStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            alerts: Mutex::new(Vec::new()),
            fail_creates: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl AlertStore for StubAlertStore {
    async fn create(&self, input: CreateAlertInput) -> skywatch_storage::Result<Alert> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StorageError::Storage("alert write failed".to_string()));
        }
        let mut alerts = self.alerts.lock().unwrap();
        let mut alert = input.into_alert();
        alert.id = alerts.len() as u64 + 1;
        alerts.push(alert.clone());
        Ok(alert)
    }

    async fn get_by_id(&self, id: u64, org: &str) -> skywatch_storage::Result<Alert> {
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id && a.organization_id == org)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("alert {}", id)))
    }

    async fn list(&self, query: AlertQuery) -> skywatch_storage::Result<Vec<Alert>> {
        Ok(self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.organization_id == query.organization_id)
            .cloned()
            .collect())
    }

    async fn update(&self, alert: &Alert) -> skywatch_storage::Result<()> {
        let mut alerts = self.alerts.lock().unwrap();
        match alerts.iter_mut().find(|a| a.id == alert.id) {
            Some(slot) => {
                *slot = alert.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("alert {}", alert.id))),
        }
    }
}
