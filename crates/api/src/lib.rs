pub mod config;
mod generate;
mod trips;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, put};
use axum::{Json, Router};
use reqwest::Client;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use wanderplan_observability::{AppMetrics, MetricsSnapshot};
use wanderplan_planner::{CompletionClient, TripPlanner};
use wanderplan_storage::{Store, TripRepository};

pub use config::ApiConfig;
pub use generate::GENERATE_PLAN_PATH;

const USER_AGENT: &str = concat!("wanderplan-api/", env!("CARGO_PKG_VERSION"));
const USER_ID_HEADER: &str = "x-user-id";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct ApiState {
    planner: Arc<TripPlanner>,
    store: Arc<Store>,
    metrics: Arc<AppMetrics>,
    service_key: Arc<String>,
    allowed_origins: Arc<Vec<String>>,
}

/// Identity of the signed-in traveller, set by `service_key_middleware`.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub String);

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    trip_count: u64,
    metrics: MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    storage: &'static str,
    completion: bool,
}

pub async fn build_app(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url)
            .await
            .context("failed to open trip store")?,
        None => Store::memory(),
    };
    info!(backend = store.backend(), "trip store ready");

    let http = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build http client")?;

    if !config.completion.is_configured() {
        warn!("completion api key missing; plan generation will fail until it is set");
    }

    let planner = Arc::new(TripPlanner::new(
        CompletionClient::new(http, config.completion),
        metrics.clone(),
    ));

    let state = ApiState {
        planner,
        store: Arc::new(store),
        metrics,
        service_key: Arc::new(config.service_key),
        allowed_origins: Arc::new(config.allowed_origins),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    let trip_routes = Router::new()
        .route("/v1/trips", get(trips::list_trips).post(trips::create_trip))
        .route("/v1/trips/:id", get(trips::get_trip))
        .route("/v1/trips/:id/plan", put(trips::update_trip_plan))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            service_key_middleware,
        ))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(RequestBodyLimitLayer::new(64 * 1024));

    Router::new()
        .route("/health", get(health))
        .route(GENERATE_PLAN_PATH, any(generate::generate_travel_plan))
        .merge(trip_routes)
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> Response {
    let timestamp_utc = chrono::Utc::now().to_rfc3339();

    match state.store.count_trips().await {
        Ok(trip_count) => {
            let payload = HealthResponse {
                status: "ok",
                timestamp_utc,
                trip_count,
                metrics: state.metrics.snapshot(),
                capabilities: HealthCapabilities {
                    storage: state.store.backend(),
                    completion: state.planner.completion_configured(),
                },
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => {
            warn!(error = %error, "heartbeat query failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "error": error.to_string(),
                    "timestamp_utc": timestamp_utc
                })),
            )
                .into_response()
        }
    }
}

async fn service_key_middleware(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !constant_time_eq(header_key.as_bytes(), state.service_key.as_bytes()) {
        return unauthorized("unauthorized", "missing or invalid x-api-key");
    }

    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    let Some(user_id) = user_id else {
        return unauthorized("not_authenticated", "missing x-user-id");
    };

    request.extensions_mut().insert(CurrentUser(user_id));
    next.run(request).await
}

fn unauthorized(error: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}

fn constant_time_eq(lhs: &[u8], rhs: &[u8]) -> bool {
    if lhs.len() != rhs.len() {
        return false;
    }
    lhs.iter()
        .zip(rhs.iter())
        .fold(0_u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5173")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(API_KEY_HEADER),
            header::HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
}
