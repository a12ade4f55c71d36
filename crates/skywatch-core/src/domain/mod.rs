//! Domain model for field telemetry.

mod alert;
mod enums;
mod reading;
mod sensor;

pub use alert::{Alert, CreateAlertInput};
pub use enums::{AlertSeverity, Parameter, Protocol, ReadingQuality};
pub use reading::{CreateReadingInput, Reading};
pub use sensor::Sensor;
