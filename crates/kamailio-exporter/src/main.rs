mod handlers;
mod state;

use std::fmt;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use prometheus::Registry as PromRegistry;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use kamailio_exporter_core::collector::{
    BUILTIN_COLLECTORS, CollectorConfig, CollectorSelection, Orchestrator, Registry, RegistryError,
};
use kamailio_exporter_core::dispatcher::parse_dispatcher_mapping;
use kamailio_exporter_core::exposition::{ExporterCollector, build_info};
use kamailio_exporter_core::session::Endpoint;

use state::{AppInner, SharedState};

// ============================================================
// CLI
// ============================================================

#[derive(Parser)]
#[command(
    name = "kamailio-exporter",
    about = "Prometheus exporter for Kamailio, polling the ctl module over BINRPC",
    version = kamailio_exporter_core::VERSION
)]
struct Args {
    /// Listen address.
    #[arg(long, default_value = "0.0.0.0:9494", env = "KAMAILIO_EXPORTER_LISTEN")]
    listen: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics", value_parser = parse_route_path)]
    telemetry_path: String,

    /// Path under which to re-serve rtpengine's own metrics. Disabled when unset.
    #[arg(long, value_parser = parse_route_path)]
    rtp_telemetry_path: Option<String>,

    /// Where rtpengine exposes its metrics.
    #[arg(long, default_value = "http://127.0.0.1:9901/metrics")]
    rtpengine_metrics_url: String,

    /// URL of user-defined metrics (text exposition) appended to every scrape.
    #[arg(long, env = "KAMAILIO_CUSTOM_METRICS_URL")]
    custom_metrics_url: Option<String>,

    /// Kamailio ctl endpoint: unix:///path/to/socket or tcp://host:port.
    #[arg(
        long,
        default_value = "unix:///var/run/kamailio/kamailio_ctl",
        env = "KAMAILIO_RPC_URI"
    )]
    rpc_uri: Endpoint,

    /// Deadline for one poll cycle and for each upstream HTTP fetch
    /// (e.g. 500ms, 1.5s, 1m30s).
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    timeout: Duration,

    /// Enable a collector that is disabled by default.
    #[arg(long = "collector", value_name = "NAME", value_delimiter = ',')]
    enable: Vec<String>,

    /// Disable a collector.
    #[arg(long = "no-collector", value_name = "NAME", value_delimiter = ',')]
    disable: Vec<String>,

    /// Print the known collectors and exit.
    #[arg(long)]
    list_collectors: bool,

    /// Dispatcher set names, as ID:NAME.
    #[arg(long, value_name = "ID:NAME", value_delimiter = ',')]
    dispatcher_map: Vec<String>,

    /// Dialog profiles to query with dlg.profile_get_size.
    #[arg(long, value_name = "NAME", value_delimiter = ',')]
    dlg_profile: Vec<String>,

    /// Increase verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses `500ms`, `5s`, `1m30s` (via humantime) or a decimal with a single
/// unit such as `1.5s`. Zero is rejected.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    let duration = match humantime::parse_duration(s) {
        Ok(d) => d,
        Err(e) => parse_decimal_duration(s).ok_or_else(|| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("timeout must be positive".to_string());
    }
    Ok(duration)
}

fn parse_decimal_duration(s: &str) -> Option<Duration> {
    let (number, unit) = s.split_at(s.find(|c: char| c.is_ascii_alphabetic())?);
    let value: f64 = number.trim().parse().ok()?;
    let scale = match unit {
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(value * scale).ok()
}

/// Route paths: absolute, made of URL-safe characters only, so they can be
/// routed literally and echoed into the landing page as is.
fn parse_route_path(s: &str) -> Result<String, String> {
    if !s.starts_with('/') {
        return Err(format!("'{}' must start with '/'", s));
    }
    if s.contains("//") {
        return Err(format!("'{}' has an empty segment", s));
    }
    if let Some(c) = s
        .chars()
        .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.' | '~')))
    {
        return Err(format!("'{}' contains '{}'", s, c));
    }
    Ok(s.to_string())
}

// ============================================================
// Startup
// ============================================================

#[derive(Debug)]
enum StartupError {
    Collectors(RegistryError),
    Prometheus(prometheus::Error),
    Http(reqwest::Error),
    RouteConflict(String),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Collectors(e) => write!(f, "{}", e),
            StartupError::Prometheus(e) => write!(f, "metrics registry: {}", e),
            StartupError::Http(e) => write!(f, "http client: {}", e),
            StartupError::RouteConflict(path) => {
                write!(f, "path {} is used by more than one route", path)
            }
        }
    }
}

impl From<RegistryError> for StartupError {
    fn from(e: RegistryError) -> Self {
        StartupError::Collectors(e)
    }
}

impl From<prometheus::Error> for StartupError {
    fn from(e: prometheus::Error) -> Self {
        StartupError::Prometheus(e)
    }
}

impl From<reqwest::Error> for StartupError {
    fn from(e: reqwest::Error) -> Self {
        StartupError::Http(e)
    }
}

/// Every route the server will mount must be distinct.
fn check_routes(telemetry_path: &str, rtp_path: Option<&str>) -> Result<(), StartupError> {
    let mut routes = vec![telemetry_path, "/health"];
    if telemetry_path != "/" {
        routes.push("/");
    }
    routes.extend(rtp_path);
    for (i, path) in routes.iter().enumerate() {
        if routes[..i].contains(path) {
            return Err(StartupError::RouteConflict(path.to_string()));
        }
    }
    Ok(())
}

/// Instantiates the selected collectors and registers them for scraping.
fn build_state(args: &Args) -> Result<SharedState, StartupError> {
    check_routes(&args.telemetry_path, args.rtp_telemetry_path.as_deref())?;

    let selection = CollectorSelection {
        enable: args.enable.clone(),
        disable: args.disable.clone(),
    };
    let config = CollectorConfig {
        dispatcher_names: parse_dispatcher_mapping(&args.dispatcher_map),
        dlg_profiles: args.dlg_profile.clone(),
    };

    let collectors = Registry::builtin().instantiate(&selection, &config)?;
    let orchestrator = Orchestrator::new(args.rpc_uri.clone(), args.timeout, collectors);

    let registry = PromRegistry::new();
    registry.register(Box::new(ExporterCollector::new(orchestrator)?))?;
    registry.register(Box::new(build_info()?))?;

    let http = reqwest::Client::builder().timeout(args.timeout).build()?;

    Ok(Arc::new(AppInner {
        registry,
        telemetry_path: args.telemetry_path.clone(),
        rtp_telemetry_path: args.rtp_telemetry_path.clone(),
        http,
        rtpengine_metrics_url: args.rtpengine_metrics_url.clone(),
        custom_metrics_url: args.custom_metrics_url.clone(),
    }))
}

fn router(state: SharedState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    let mut app = Router::new()
        .route(&telemetry_path, get(handlers::handle_metrics))
        .route("/health", get(handlers::handle_health));
    if telemetry_path != "/" {
        app = app.route("/", get(handlers::handle_landing));
    }
    if let Some(path) = &state.rtp_telemetry_path {
        app = app.route(path, get(handlers::handle_rtp_metrics));
    }
    app.layer(CompressionLayer::new()).with_state(state)
}

fn list_collectors() {
    for d in BUILTIN_COLLECTORS {
        let state = if d.default_enabled { "enabled" } else { "disabled" };
        println!("{:<24} {}", d.name, state);
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["kamailio_exporter", "kamailio_exporter_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();

    if args.list_collectors {
        list_collectors();
        return;
    }

    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };
    runtime.block_on(async_main(args));
}

async fn async_main(args: Args) {
    info!(
        version = kamailio_exporter_core::VERSION,
        revision = kamailio_exporter_core::REVISION,
        endpoint = %args.rpc_uri,
        timeout_ms = args.timeout.as_millis() as u64,
        "starting kamailio exporter"
    );

    let state = match build_state(&args) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "startup failed");
            process::exit(1);
        }
    };

    let addr: SocketAddr = match args.listen.parse() {
        Ok(a) => a,
        Err(e) => {
            error!(listen = %args.listen, error = %e, "invalid listen address");
            process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    info!(%addr, path = %args.telemetry_path, "listening");
    if let Some(path) = &args.rtp_telemetry_path {
        info!(path = %path, upstream = %args.rtpengine_metrics_url, "serving rtpengine metrics");
    }
    if let Some(url) = &args.custom_metrics_url {
        info!(url = %url, "appending user defined metrics");
    }

    if let Err(e) = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
        process::exit(1);
    }
    info!("shut down");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
}
