//! Storage layer for Skywatch.
//!
//! Persistence collaborators behind narrow async traits, with a redb-backed
//! implementation. Values are stored as JSON; keys are chosen so that
//! readings sort by `(sensor_id, timestamp)`.

pub mod alerts;
pub mod db;
pub mod error;
pub mod readings;
pub mod sensors;

pub use alerts::{AlertQuery, AlertStore, RedbAlertStore};
pub use db::open_database;
pub use error::{Error, Result};
pub use readings::{ReadingQuery, ReadingStore, RedbReadingStore};
pub use sensors::{RedbSensorStore, SensorStore};
