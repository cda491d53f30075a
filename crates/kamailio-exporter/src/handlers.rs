//! HTTP request handlers: metrics exposition, rtpengine pass-through, landing
//! page and health.

use std::fmt;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use prometheus::{Encoder, TextEncoder};
use tracing::{error, warn};

use crate::state::AppState;

/// Initial capacity of the exposition buffer.
const BUFFER_CAP: usize = 64 * 1024;

/// Content type of the Prometheus text format.
const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

// ============================================================
// Upstream fetches
// ============================================================

#[derive(Debug)]
pub(crate) enum UpstreamError {
    Request(reqwest::Error),
    Status(reqwest::StatusCode),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::Request(e) => write!(f, "{}", e),
            UpstreamError::Status(code) => write!(f, "upstream returned {}", code),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e)
    }
}

/// Fetches a text exposition that must answer 200.
async fn fetch_exposition(client: &reqwest::Client, url: &str) -> Result<String, UpstreamError> {
    let response = client.get(url).send().await?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(UpstreamError::Status(response.status()));
    }
    Ok(response.text().await?)
}

// ============================================================
// Metrics
// ============================================================

/// Runs one poll cycle and renders the text exposition format.
///
/// Gathering talks to Kamailio over a blocking socket, so it runs on the
/// blocking pool. With a user-defined metrics URL configured, its exposition
/// is appended; a failing upstream only costs those extra metrics.
pub(crate) async fn handle_metrics(State(state): AppState) -> Response {
    let registry_state = state.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        let families = registry_state.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::with_capacity(BUFFER_CAP);
        encoder
            .encode(&families, &mut buffer)
            .map(|()| (encoder.format_type().to_string(), buffer))
    })
    .await;

    let (content_type, mut body) = match rendered {
        Ok(Ok(rendered)) => rendered,
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode metrics");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response();
        }
        Err(e) => {
            error!(error = %e, "metrics task failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to gather metrics").into_response();
        }
    };

    if let Some(url) = &state.custom_metrics_url {
        match fetch_exposition(&state.http, url).await {
            Ok(extra) => {
                if !body.is_empty() && !body.ends_with(b"\n") {
                    body.push(b'\n');
                }
                body.extend_from_slice(extra.as_bytes());
            }
            Err(e) => error!(url = %url, error = %e, "scraping user defined metrics failed"),
        }
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// Re-serves rtpengine's own exposition.
pub(crate) async fn handle_rtp_metrics(State(state): AppState) -> Response {
    let url = &state.rtpengine_metrics_url;
    let upstream = match state.http.get(url).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!(url = %url, error = %e, "rtpengine metrics unreachable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Failed to connect to rtpengine: {}", e),
            )
                .into_response();
        }
    };

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(TEXT_FORMAT));

    match upstream.bytes().await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => {
            warn!(url = %url, error = %e, "failed to read rtpengine metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read response from rtpengine: {}", e),
            )
                .into_response()
        }
    }
}

// ============================================================
// Landing page
// ============================================================

pub(crate) async fn handle_landing(State(state): AppState) -> Html<String> {
    let mut links = format!("<li><a href=\"{0}\">Metrics</a></li>", state.telemetry_path);
    if let Some(path) = &state.rtp_telemetry_path {
        links.push_str(&format!("<li><a href=\"{0}\">rtpengine metrics</a></li>", path));
    }
    Html(format!(
        "<html>\n\
         <head><title>Kamailio Exporter</title></head>\n\
         <body>\n\
         <h1>Kamailio Exporter</h1>\n\
         <p>Prometheus Exporter for Kamailio servers</p>\n\
         <p>Version: {} ({})</p>\n\
         <ul>{}</ul>\n\
         </body>\n\
         </html>\n",
        kamailio_exporter_core::VERSION,
        kamailio_exporter_core::REVISION,
        links,
    ))
}

// ============================================================
// Health
// ============================================================

pub(crate) async fn handle_health() -> &'static str {
    "ok"
}
