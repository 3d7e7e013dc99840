pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod stream;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use audio_core::AmbientController;
use lesson_core::LessonGenerator;

use crate::config::ServerConfig;
use crate::metrics::AppMetrics;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn LessonGenerator>,
    pub ambient: Arc<AmbientController>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(generator: Arc<dyn LessonGenerator>, config: ServerConfig) -> Self {
        Self {
            generator,
            ambient: Arc::new(AmbientController::new(config.sample_rate)),
            metrics: AppMetrics::new(),
            config,
        }
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(Any)
        .allow_credentials(false);

    let Some(allowed_origins) = config.cors_allowed_origins.as_ref() else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS has no valid origin, falling back to permissive CORS");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&request_id).ok();
    if let Some(value) = header.clone() {
        request.headers_mut().insert("x-request-id", value);
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Every route, mounted at the root and again under `/api`, with the
/// middleware stack applied.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let config = &state.config;

    // Global key: one budget shared by all clients, which also works behind proxies
    let replenish_ms = (60_000 / config.rate_limit_per_minute.max(1)).max(1) as u64;
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_ms)
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    // base64 inflates payloads by a third; allow some room for the JSON around it
    let body_limit = config.max_audio_bytes / 3 * 4 + 64 * 1024;

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .into_inner();

    let public_api = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::health_check))
        .route("/catalog", get(handlers::catalog))
        .route("/lesson", post(handlers::lesson_endpoint))
        .route("/speech/wav", post(handlers::speech_wav_endpoint))
        .route("/export", post(handlers::export_endpoint))
        .route("/ambient", get(handlers::ambient_status))
        .route("/ambient/start", post(handlers::ambient_start))
        .route("/ambient/volume", post(handlers::ambient_volume))
        .route("/ambient/stop", post(handlers::ambient_stop))
        .route("/ambient/stream", get(stream::ambient_stream));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(handlers::metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Ok(Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state))
}
