//! Shared application state and the global allocator.

use std::sync::Arc;

use axum::extract::State;
use prometheus::Registry;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

pub(crate) struct AppInner {
    /// Holds the Kamailio collector and the build info gauge.
    pub(crate) registry: Registry,
    pub(crate) telemetry_path: String,
    /// Route re-serving rtpengine's own metrics, when enabled.
    pub(crate) rtp_telemetry_path: Option<String>,
    /// Client for the rtpengine and user-defined metrics upstreams.
    pub(crate) http: reqwest::Client,
    pub(crate) rtpengine_metrics_url: String,
    /// Exposition appended to every scrape of the telemetry path.
    pub(crate) custom_metrics_url: Option<String>,
}

pub(crate) type SharedState = Arc<AppInner>;

pub(crate) type AppState = State<SharedState>;
