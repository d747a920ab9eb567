//! Command handlers grouped by concern.

pub(crate) mod lifecycle;
pub(crate) mod settings;
pub(crate) mod tail;
pub(crate) mod watch;
