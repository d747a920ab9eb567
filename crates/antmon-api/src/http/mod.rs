//! HTTP surface modules (router, handlers, streams, middleware).

/// Shared constants and header names for HTTP surfaces.
pub mod constants;
/// Problem response helpers and error types.
pub mod errors;
/// Health and diagnostics endpoints.
pub mod health;
/// Collection lifecycle and readings handlers.
pub mod metrics;
/// Router construction and server host.
pub mod router;
/// Settings handlers.
pub mod settings;
/// Server-sent event streams.
pub mod sse;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
/// Client configuration discovery.
pub mod well_known;
