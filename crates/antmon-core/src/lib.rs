#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! Metrics domain model and the collector that drives a sensor node.

pub mod collector;
pub mod error;
pub mod model;
mod processor;
pub mod sensor;
pub mod zone;

pub use collector::{CollectorOptions, MetricsCollector};
pub use error::{CollectorError, CollectorResult, SettingsViolation};
pub use model::{DeviceSummary, MetricsSettings, MetricsSnapshot};
pub use sensor::{SensorSpec, SensorType, UnknownSensorType, parse_sensors, simulated_devices};
pub use zone::SportZone;
