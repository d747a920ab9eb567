//! Shared HTTP constants (headers, problem URIs, stream timing).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const SSE_KEEP_ALIVE_SECS: u64 = 20;

pub(crate) const PROBLEM_INTERNAL: &str = "https://antmon.dev/problems/internal";
pub(crate) const PROBLEM_CONFLICT: &str = "https://antmon.dev/problems/conflict";
pub(crate) const PROBLEM_SETTINGS_INVALID: &str = "https://antmon.dev/problems/settings-invalid";
pub(crate) const PROBLEM_SENSOR_UNAVAILABLE: &str =
    "https://antmon.dev/problems/sensor-unavailable";
