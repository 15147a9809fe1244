//! MavunoWatch API Server
//!
//! REST API for the crop yield dashboard: metadata, yield predictions,
//! trends, and per-county summaries over the cleaned production table.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod error;
pub mod rate_limit;
mod routes;

pub use config::ApiConfig;
pub use error::ApiError;

use data_cleaner::{CanonicalTable, Cleaner};
use inference_engine::{ModelArtifact, PredictionEngine};
use rate_limit::create_governor_config;
use storage::Repository;
use yield_analytics::TrendPolicy;

/// State handle passed to every handler
pub type SharedState = Arc<RwLock<AppState>>;

/// Application state shared across handlers
pub struct AppState {
    /// Cleaned production table
    pub table: CanonicalTable,
    /// Absent until a model artifact is trained and loaded
    pub engine: Option<PredictionEngine>,
    /// Cleaner for uploaded sources
    pub cleaner: Cleaner,
    /// Prediction history
    pub repository: Repository,
    pub trend_policy: TrendPolicy,
    /// Prometheus exposition, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create state with default policies
    pub fn new(table: CanonicalTable, engine: Option<PredictionEngine>) -> Self {
        Self {
            table,
            engine,
            cleaner: Cleaner::default(),
            repository: Repository::new(),
            trend_policy: TrendPolicy::default(),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Clean the configured source and load the model artifact.
    ///
    /// A missing or invalid artifact leaves the API serving without
    /// predictions; unusable data is fatal.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let cleaner = Cleaner::new(config.cleaning.clone());
        let table = cleaner.clean_path(&config.data_path)?;
        info!(
            "Loaded {} records from {}",
            table.len(),
            config.data_path.display()
        );

        let engine = match ModelArtifact::load(&config.model_dir)
            .and_then(PredictionEngine::from_artifact)
        {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!(
                    "No usable model in {} ({}); predictions disabled",
                    config.model_dir.display(),
                    e
                );
                None
            }
        };

        Ok(Self {
            cleaner,
            repository: Repository::with_capacity(config.history_capacity),
            trend_policy: config.trend,
            ..Self::new(table, engine)
        })
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub data: ComponentHealth,
    pub model: ComponentHealth,
    pub history: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub count: usize,
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(routes::metadata::index))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/metadata", get(routes::metadata::get_metadata))
        .route("/predict", post(routes::predictions::predict))
        .route("/recommend", post(routes::predictions::recommend))
        .route("/trend", post(routes::trends::get_trend))
        .route("/yield-by-county", get(routes::trends::yield_by_county))
        .route("/api/v1/predictions", get(routes::predictions::get_predictions))
        .route("/api/v1/predictions/:id", get(routes::predictions::get_prediction))
        .route("/api/v1/model/evaluation", get(routes::predictions::get_evaluation))
        .route("/api/v1/clean", post(routes::metadata::clean_upload))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let model = match &state.engine {
        Some(engine) => ComponentHealth {
            status: "ok".to_string(),
            count: engine.descriptor().declared_features.len(),
        },
        None => ComponentHealth {
            status: "unavailable".to_string(),
            count: 0,
        },
    };

    let response = HealthResponse {
        status: if state.engine.is_some() { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        components: ComponentStatus {
            data: ComponentHealth {
                status: "ok".to_string(),
                count: state.table.len(),
            },
            model,
            history: ComponentHealth {
                status: "ok".to_string(),
                count: state.repository.prediction_count(),
            },
        },
    };

    Json(response)
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let state = state.read().await;
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("metrics recorder is not installed".to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Run the server
pub async fn run_server(config: ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = AppState::from_config(&config)?;
    state.metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    };

    let state = Arc::new(RwLock::new(state));
    let mut app = create_router(state);

    match create_governor_config(&config.rate_limit) {
        Some(governor) => {
            info!(
                "Rate limiting: burst {}, one request per {}s",
                config.rate_limit.burst_size, config.rate_limit.per_second
            );
            app = app.layer(GovernorLayer { config: governor });
        }
        None => warn!("Rate limiting disabled"),
    }

    info!("Starting API server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
