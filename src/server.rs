//! JSON API server and single-page dashboard.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{
    extract::State,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tokio::{net::TcpListener, task};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cache::ResultCache;
use crate::capacity::HostCapacity;
use crate::engine::{BenchmarkEngine, BenchmarkResult, RunParams};
use crate::error::BenchError;
use crate::store::{Store, StoreOptions};

/// Result cache TTL applied when running in production mode.
pub const PRODUCTION_CACHE_TTL: Duration = Duration::from_secs(300);

/// Runtime options used to boot the benchmark HTTP server.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    /// Path to the benchmark database file.
    pub db_path: PathBuf,
    /// Production mode enables the five-minute result cache.
    pub production: bool,
    /// Network interface to bind to.
    pub host: IpAddr,
    /// Listening port.
    pub port: u16,
    /// Overrides the mode-derived cache TTL.
    pub cache_ttl: Option<Duration>,
    /// Allowed CORS origins for remote dashboards.
    pub allow_origins: Vec<String>,
    /// Benchmark knobs used by `/api/dbtest`.
    pub run_params: RunParams,
}

impl ServerOptions {
    fn effective_cache_ttl(&self) -> Duration {
        self.cache_ttl.unwrap_or(if self.production {
            PRODUCTION_CACHE_TTL
        } else {
            Duration::ZERO
        })
    }
}

/// Errors that can occur while booting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the TCP listener or serving connections failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type AppState = Arc<ServerState>;

struct ServerState {
    store_opts: StoreOptions,
    run_params: RunParams,
    cache: ResultCache,
    allow_origins: Vec<String>,
}

/// Starts the server and runs until a shutdown signal arrives.
pub async fn serve(options: ServerOptions) -> Result<(), ServerError> {
    install_tracing_subscriber();

    let addr = SocketAddr::from((options.host, options.port));
    let state = Arc::new(ServerState {
        store_opts: StoreOptions::new(&options.db_path).production(options.production),
        run_params: options.run_params.clone(),
        cache: ResultCache::new(options.effective_cache_ttl()),
        allow_origins: options.allow_origins.clone(),
    });
    let app = build_router(state.clone());
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        db_path = %state.store_opts.path.display(),
        production = state.store_opts.production,
        "benchmark server listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.allow_origins);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/dbtest", get(dbtest_handler))
        .route("/api/capacity", get(capacity_handler));

    if let Some(layer) = cors {
        router = router.layer(layer);
    }

    router.with_state(state).layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let mut allowed = Vec::new();
    for origin in origins {
        let normalized = normalize_origin(origin);
        match normalized
            .as_deref()
            .and_then(|value| HeaderValue::from_str(value).ok())
        {
            Some(value) => allowed.push(value),
            None => {
                tracing::warn!(%origin, ?normalized, "ignoring invalid CORS origin");
            }
        }
    }

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}

fn normalize_origin(origin: &str) -> Option<String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_trailing_slash = trimmed.trim_end_matches('/');
    if without_trailing_slash.is_empty() {
        return None;
    }
    Some(without_trailing_slash.to_string())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn dbtest_handler(State(state): State<AppState>) -> Result<Json<BenchmarkResult>, AppError> {
    let opts = state.store_opts.clone();
    let params = state.run_params.clone();
    let cache = state.cache.clone();
    // The run blocks for its entire duration; keep it off the runtime.
    let result = task::spawn_blocking(move || {
        cache.get_or_run(|| {
            let mut store = Store::open(&opts)?;
            BenchmarkEngine::new(params).run(&mut store)
        })
    })
    .await??;
    Ok(Json(result))
}

async fn capacity_handler() -> Result<Json<HostCapacity>, AppError> {
    let capacity = task::spawn_blocking(HostCapacity::probe).await?;
    Ok(Json(capacity))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Bench(#[from] BenchError),
    #[error("internal task failure: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Bench(BenchError::StoreLocked(_)) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(ErrorPayload {
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    message: String,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

fn install_tracing_subscriber() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).try_init();
    });
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <title>litebench — SQLite throughput</title>
    <style>
      body { font-family: system-ui, sans-serif; margin: 2.5rem; line-height: 1.5; color: #111; }
      main { display: flex; flex-wrap: wrap; gap: 1.5rem; }
      .card { flex: 1 1 20rem; border: 1px solid #ddd; border-radius: 8px; padding: 1.5rem; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
      h1 { font-size: 1.25rem; }
      h2 { font-size: 1rem; margin-top: 0; }
      ul { padding-left: 1.2rem; }
      .highlight { font-weight: 600; }
      .error { color: #b00020; }
    </style>
  </head>
  <body>
    <h1>litebench</h1>
    <p>
      Sustained insert and point-read throughput against an embedded
      SQLite store, under WAL journaling and normal synchronous mode.
      The table is never reset, so size and record counts grow with
      every run.
    </p>
    <main>
      <div class="card">
        <h2>SQLite writes/sec</h2>
        <div id="dbtest">Running test (<span id="elapsed">0.0</span>s)…</div>
      </div>
      <div class="card">
        <h2>Host capacity</h2>
        <div id="capacity">Loading…</div>
      </div>
    </main>
    <script>
      const fmt = (n) => n.toLocaleString();
      const fmtBytes = (bytes) => {
        const mb = bytes / (1024 * 1024);
        return mb >= 1024
          ? (mb / 1024).toLocaleString(undefined, { maximumFractionDigits: 1 }) + ' GB'
          : Math.round(mb).toLocaleString() + ' MB';
      };

      const started = Date.now();
      const timer = setInterval(() => {
        document.getElementById('elapsed').textContent =
          ((Date.now() - started) / 1000).toFixed(1);
      }, 200);

      fetch('/api/dbtest')
        .then((resp) => resp.json())
        .then((r) => {
          clearInterval(timer);
          if (r.message) throw new Error(r.message);
          let html = '<ul>';
          html += `<li>DB size: ${fmtBytes(r.dbSizeBytes)}</li>`;
          html += `<li>Table size: ${fmt(r.totalRecords)} records</li>`;
          html += `<li>Reads/sec: ${fmt(r.readsPerSecond)}</li>`;
          html += `<li class="highlight">Writes/sec: ${fmt(r.writesPerSecond)}</li>`;
          if (r.failureRatePercent > 0) {
            html += `<li>Failure rate: ${r.failureRatePercent}%</li>`;
          }
          html += '</ul>';
          document.getElementById('dbtest').innerHTML = html;
        })
        .catch((err) => {
          clearInterval(timer);
          document.getElementById('dbtest').innerHTML =
            `<p class="error">Error: ${err.message}</p>`;
        });

      fetch('/api/capacity')
        .then((resp) => resp.json())
        .then((c) => {
          let html = '<ul>';
          html += `<li>vCPUs: ${c.vcpus}</li>`;
          if (c.cpuModel) html += `<li>CPU model: ${c.cpuModel}</li>`;
          html += `<li>Platform: ${c.platform}</li>`;
          html += `<li>Total RAM: ${fmtBytes(c.totalMemoryBytes)}</li>`;
          if (c.cpuUsagePercent != null) html += `<li>CPU usage: ${c.cpuUsagePercent}%</li>`;
          if (c.memoryUsagePercent != null) html += `<li>Memory usage: ${c.memoryUsagePercent}%</li>`;
          html += '</ul>';
          document.getElementById('capacity').innerHTML = html;
        })
        .catch((err) => {
          document.getElementById('capacity').innerHTML =
            `<p class="error">Error: ${err.message}</p>`;
        });
    </script>
  </body>
</html>"#;
