use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use tracing::warn;
use wanderplan_core::{ErrorKind, PlanError};

use crate::ApiState;

pub const GENERATE_PLAN_PATH: &str = "/functions/v1/generate-travel-plan";

const MAX_PLAN_BODY_BYTES: usize = 16 * 1024;

const CORS_ALLOW_ORIGIN: &str = "*";
const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";
const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Single-function endpoint: preflight, method gate, then generate.
pub(crate) async fn generate_travel_plan(
    State(state): State<ApiState>,
    request: Request,
) -> Response {
    if request.method() == Method::OPTIONS {
        return preflight_response();
    }
    if request.method() != Method::POST {
        return method_not_allowed();
    }

    let result = match read_json_body(request.into_body()).await {
        Ok(body) => state.planner.generate(&body).await,
        Err(error) => {
            state.metrics.inc_upstream_failure();
            warn!(error = %error, "could not decode request body");
            Err(error)
        }
    };

    match result {
        Ok(generated) => (
            StatusCode::OK,
            [(header::ACCESS_CONTROL_ALLOW_ORIGIN, CORS_ALLOW_ORIGIN)],
            Json(generated),
        )
            .into_response(),
        Err(error) => plan_error_response(&error),
    }
}

/// Oversized or non-JSON bodies are unclassified failures, not validation errors.
async fn read_json_body(body: Body) -> Result<Value, PlanError> {
    let bytes = to_bytes(body, MAX_PLAN_BODY_BYTES)
        .await
        .map_err(|error| PlanError::unclassified(format!("Invalid request body: {}", error)))?;

    serde_json::from_slice(&bytes)
        .map_err(|error| PlanError::unclassified(format!("Invalid JSON body: {}", error)))
}

pub(crate) fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::ConfigurationError | ErrorKind::UpstreamError | ErrorKind::Unclassified => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn plan_error_response(error: &PlanError) -> Response {
    (
        status_for_kind(error.kind()),
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, CORS_ALLOW_ORIGIN)],
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

fn preflight_response() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, CORS_ALLOW_ORIGIN),
            (header::ACCESS_CONTROL_ALLOW_METHODS, CORS_ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, CORS_ALLOW_HEADERS),
        ],
    )
        .into_response()
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, CORS_ALLOW_METHODS)],
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
        .into_response()
}
