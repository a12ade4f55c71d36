//! Core types for Skywatch.
//!
//! This crate defines the domain model and configuration shared across the
//! ingestion pipeline and the storage layer.

pub mod config;
pub mod domain;
pub mod error;

pub use domain::{
    Alert, AlertSeverity, CreateAlertInput, CreateReadingInput, Parameter, Protocol, Reading,
    ReadingQuality, Sensor,
};
pub use error::{Error, Result};
