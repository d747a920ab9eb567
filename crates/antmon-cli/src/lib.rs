#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::redundant_pub_crate)]

//! Command-line client for the antmon metrics service.
//!
//! Layout:
//! - `cli.rs`: argument parsing, base URL resolution, and command dispatch
//! - `commands/`: command handlers grouped by concern
//! - `client.rs`: shared HTTP context and error types
//! - `output.rs`: renderers and formatting helpers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod commands;
pub(crate) mod output;

pub use cli::run;
