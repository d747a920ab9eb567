#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! Telemetry primitives shared across the antmon workspace.
//!
//! Layout: `init.rs` (subscriber setup), `context.rs` (span and request
//! context), `layers.rs` (request-id middleware), `metrics.rs` (Prometheus
//! registry), `error.rs` (error taxonomy).

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{GlobalContextGuard, RequestContext, with_request_context};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::{Metrics, TelemetrySnapshot};
