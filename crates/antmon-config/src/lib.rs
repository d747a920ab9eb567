#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! Configuration for the antmon workspace.
//!
//! Layout: `api.rs` (client-facing base URL and endpoint map), `model.rs`
//! (service configuration), `loader.rs` (file discovery and environment
//! overrides), `defaults.rs` (shared literals).

pub mod api;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;

pub use api::{
    ApiConfig, ApiProfile, DEVICES_PATH, Endpoint, Endpoints, HEALTH_PATH, METRICS_PATH,
    PROMETHEUS_PATH, WELL_KNOWN_PATH,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadedConfig, load_from_env, load_with, parse_str};
pub use model::{
    AppConfig, CollectorConfig, LoggingSettings, SensorEntry, ServerConfig, SimulatedDeviceEntry,
    SimulatorConfig,
};
