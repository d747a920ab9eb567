#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, clippy::all, clippy::pedantic)]

//! HTTP surface for the metrics collector.
//!
//! Layout: `http/router.rs` (router and server host), `http/metrics.rs` and
//! `http/settings.rs` (collector handlers), `http/sse.rs` (event streams),
//! `http/health.rs` (liveness and Prometheus), `models.rs` (wire types shared
//! with the CLI).

pub mod error;
pub mod http;
pub mod models;
pub(crate) mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
