//! Client-facing API configuration: a base URL plus the fixed endpoint map.
//!
//! # Design
//! - The endpoint key set is closed: six struct fields mirrored by the [`Endpoint`] enum.
//! - The base URL is resolved once from an optional deployment variable and a
//!   per-profile literal fallback; overrides are taken verbatim.
//! - [`ApiConfig::global`] hands out the same instance for the life of the process.

use std::fmt::{self, Display, Formatter};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::defaults::{API_BASE_URL_ENV, DEVELOPMENT_BASE_URL, SAME_ORIGIN_BASE_URL};

/// Path that starts metrics collection.
pub const START_METRICS_PATH: &str = "/metrics/start";
/// Path that stops metrics collection.
pub const STOP_METRICS_PATH: &str = "/metrics/stop";
/// Path that returns the current metrics settings.
pub const GET_SETTINGS_PATH: &str = "/metrics/settings";
/// Path that updates the metrics settings.
pub const UPDATE_SETTINGS_PATH: &str = "/metrics/settings";
/// Server-sent event stream of metric snapshots.
pub const METRICS_STREAM_PATH: &str = "/metrics/stream";
/// Server-sent event stream of registered devices.
pub const DEVICES_STREAM_PATH: &str = "/metrics/devices/stream";

/// Current metrics snapshot. Not part of the endpoint map.
pub const METRICS_PATH: &str = "/metrics";
/// Registered devices. Not part of the endpoint map.
pub const DEVICES_PATH: &str = "/metrics/devices";
/// Liveness probe.
pub const HEALTH_PATH: &str = "/health";
/// Prometheus exposition.
pub const PROMETHEUS_PATH: &str = "/telemetry/metrics";
/// Same-origin client configuration document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/antmon.json";

/// Logical operations exposed by the metrics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Begin collecting sensor data.
    StartMetrics,
    /// Stop collecting sensor data.
    StopMetrics,
    /// Read the metrics settings.
    GetSettings,
    /// Replace or patch the metrics settings.
    UpdateSettings,
    /// Live metric snapshots.
    MetricsStream,
    /// Live device list.
    DevicesStream,
}

impl Endpoint {
    /// Every endpoint, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::StartMetrics,
        Self::StopMetrics,
        Self::GetSettings,
        Self::UpdateSettings,
        Self::MetricsStream,
        Self::DevicesStream,
    ];

    /// The camelCase key used in serialised endpoint maps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StartMetrics => "startMetrics",
            Self::StopMetrics => "stopMetrics",
            Self::GetSettings => "getSettings",
            Self::UpdateSettings => "updateSettings",
            Self::MetricsStream => "metricsStream",
            Self::DevicesStream => "devicesStream",
        }
    }

    /// The literal relative path for this endpoint.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::StartMetrics => START_METRICS_PATH,
            Self::StopMetrics => STOP_METRICS_PATH,
            Self::GetSettings => GET_SETTINGS_PATH,
            Self::UpdateSettings => UPDATE_SETTINGS_PATH,
            Self::MetricsStream => METRICS_STREAM_PATH,
            Self::DevicesStream => DEVICES_STREAM_PATH,
        }
    }

    /// Look an endpoint up by its camelCase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.name() == name)
    }
}

impl Display for Endpoint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Mapping from logical endpoint names to relative paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    start_metrics: String,
    stop_metrics: String,
    get_settings: String,
    update_settings: String,
    metrics_stream: String,
    devices_stream: String,
}

impl Endpoints {
    /// The endpoint map with its literal paths.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_metrics: START_METRICS_PATH.to_string(),
            stop_metrics: STOP_METRICS_PATH.to_string(),
            get_settings: GET_SETTINGS_PATH.to_string(),
            update_settings: UPDATE_SETTINGS_PATH.to_string(),
            metrics_stream: METRICS_STREAM_PATH.to_string(),
            devices_stream: DEVICES_STREAM_PATH.to_string(),
        }
    }

    /// Path registered for `endpoint`.
    #[must_use]
    pub fn path(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::StartMetrics => &self.start_metrics,
            Endpoint::StopMetrics => &self.stop_metrics,
            Endpoint::GetSettings => &self.get_settings,
            Endpoint::UpdateSettings => &self.update_settings,
            Endpoint::MetricsStream => &self.metrics_stream,
            Endpoint::DevicesStream => &self.devices_stream,
        }
    }

    /// Iterate `(endpoint, path)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Endpoint, &str)> + '_ {
        Endpoint::ALL
            .into_iter()
            .map(move |endpoint| (endpoint, self.path(endpoint)))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new()
    }
}

/// Deployment flavour that decides the base URL fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiProfile {
    /// Requests resolve against the origin that served the caller.
    #[default]
    SameOrigin,
    /// Local development server.
    Development,
}

impl ApiProfile {
    /// Base URL used when no override is supplied.
    #[must_use]
    pub const fn fallback_base_url(self) -> &'static str {
        match self {
            Self::SameOrigin => SAME_ORIGIN_BASE_URL,
            Self::Development => DEVELOPMENT_BASE_URL,
        }
    }
}

/// Base URL plus endpoint map describing where the metrics service lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    base_url: String,
    endpoints: Endpoints,
}

static GLOBAL_API_CONFIG: OnceLock<ApiConfig> = OnceLock::new();

impl ApiConfig {
    /// Resolve the record using `lookup` for the deployment variable.
    ///
    /// A present value is used verbatim, even when empty; a missing one falls
    /// back to the profile default.
    pub fn resolve<F>(profile: ApiProfile, lookup: F) -> Self
    where
        F: FnOnce(&str) -> Option<String>,
    {
        let base_url =
            lookup(API_BASE_URL_ENV).unwrap_or_else(|| profile.fallback_base_url().to_string());
        Self {
            base_url,
            endpoints: Endpoints::new(),
        }
    }

    /// Resolve the record against the process environment.
    #[must_use]
    pub fn from_env(profile: ApiProfile) -> Self {
        Self::resolve(profile, |name| std::env::var(name).ok())
    }

    /// Process-wide same-origin record, resolved on first access.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL_API_CONFIG.get_or_init(|| Self::from_env(ApiProfile::SameOrigin))
    }

    /// Scheme, host and port prefix, or empty for same-origin.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The endpoint map.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `true` when requests should target the caller's own origin.
    #[must_use]
    pub fn is_same_origin(&self) -> bool {
        self.base_url.is_empty()
    }

    /// Base URL followed directly by the endpoint path.
    #[must_use]
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        self.url_for_path(self.endpoints.path(endpoint))
    }

    /// Base URL followed directly by a path outside the endpoint map.
    #[must_use]
    pub fn url_for_path(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_override(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn endpoints_hold_the_six_literal_paths() {
        let endpoints = Endpoints::new();
        let pairs: Vec<_> = endpoints.iter().map(|(e, p)| (e.name(), p)).collect();
        assert_eq!(
            pairs,
            vec![
                ("startMetrics", "/metrics/start"),
                ("stopMetrics", "/metrics/stop"),
                ("getSettings", "/metrics/settings"),
                ("updateSettings", "/metrics/settings"),
                ("metricsStream", "/metrics/stream"),
                ("devicesStream", "/metrics/devices/stream"),
            ]
        );
    }

    #[test]
    fn fallbacks_follow_the_profile() {
        assert_eq!(
            ApiConfig::resolve(ApiProfile::SameOrigin, no_override).base_url(),
            ""
        );
        assert_eq!(
            ApiConfig::resolve(ApiProfile::Development, no_override).base_url(),
            "http://127.0.0.1:8000"
        );
    }

    #[test]
    fn override_is_taken_verbatim() {
        let raw = "  https://metrics.example:9443/ ";
        let config = ApiConfig::resolve(ApiProfile::Development, |name| {
            assert_eq!(name, API_BASE_URL_ENV);
            Some(raw.to_string())
        });
        assert_eq!(config.base_url(), raw);
        assert_eq!(
            config.url_for(Endpoint::MetricsStream),
            format!("{raw}/metrics/stream")
        );
    }

    #[test]
    fn empty_override_is_used_verbatim() {
        let config = ApiConfig::resolve(ApiProfile::Development, |_| Some(String::new()));
        assert_eq!(config.base_url(), "");
        assert!(config.is_same_origin());
        assert_eq!(config.url_for(Endpoint::MetricsStream), "/metrics/stream");
    }

    #[test]
    fn same_origin_urls_are_relative() {
        let config = ApiConfig::resolve(ApiProfile::SameOrigin, no_override);
        assert!(config.is_same_origin());
        assert_eq!(config.url_for(Endpoint::StartMetrics), "/metrics/start");
    }

    #[test]
    fn serialises_to_the_browser_shape() {
        let config = ApiConfig::resolve(ApiProfile::Development, no_override);
        let value = serde_json::to_value(&config).expect("serialise");
        assert_eq!(
            value,
            json!({
                "baseUrl": "http://127.0.0.1:8000",
                "endpoints": {
                    "startMetrics": "/metrics/start",
                    "stopMetrics": "/metrics/stop",
                    "getSettings": "/metrics/settings",
                    "updateSettings": "/metrics/settings",
                    "metricsStream": "/metrics/stream",
                    "devicesStream": "/metrics/devices/stream"
                }
            })
        );
    }

    #[test]
    fn endpoint_names_round_trip() {
        for endpoint in Endpoint::ALL {
            assert_eq!(Endpoint::from_name(endpoint.name()), Some(endpoint));
        }
        assert_eq!(Endpoint::from_name("deleteMetrics"), None);
    }

    #[test]
    fn global_is_referentially_stable() {
        let first = ApiConfig::global();
        let second = ApiConfig::global();
        assert!(std::ptr::eq(first, second));
    }
}
