use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use wanderplan_core::{Trip, TripDraft};
use wanderplan_storage::TripRepository;

use crate::{ApiState, CurrentUser};

const MAX_PLAN_LEN: usize = 48_000;

#[derive(Debug, Deserialize)]
pub(crate) struct PlanUpdateRequest {
    plan: String,
}

pub(crate) async fn create_trip(
    State(state): State<ApiState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    payload: Result<Json<TripDraft>, JsonRejection>,
) -> Response {
    let Json(draft) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                &rejection.body_text(),
            );
        }
    };

    let new_trip = match draft.validate() {
        Ok(new_trip) => new_trip,
        Err(error) => {
            return api_error(StatusCode::BAD_REQUEST, "invalid_trip", &error.to_string());
        }
    };

    match state.store.create_trip(new_trip, &user_id).await {
        Ok(trip) => {
            info!(trip_id = %trip.id, destination = %trip.destination, "trip created");
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "id": trip.id })),
            )
                .into_response()
        }
        Err(error) => storage_failure(error),
    }
}

pub(crate) async fn list_trips(
    State(state): State<ApiState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> Response {
    match state.store.list_trips_for_owner(&user_id).await {
        Ok(trips) => (StatusCode::OK, Json(trips)).into_response(),
        Err(error) => storage_failure(error),
    }
}

pub(crate) async fn get_trip(
    State(state): State<ApiState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(trip_id): Path<String>,
) -> Response {
    match load_owned_trip(&state, &user_id, &trip_id).await {
        Ok(trip) => (StatusCode::OK, Json(trip)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn update_trip_plan(
    State(state): State<ApiState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(trip_id): Path<String>,
    payload: Result<Json<PlanUpdateRequest>, JsonRejection>,
) -> Response {
    let Json(update) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_body",
                &rejection.body_text(),
            );
        }
    };
    if update.plan.len() > MAX_PLAN_LEN {
        return api_error(
            StatusCode::BAD_REQUEST,
            "plan_too_long",
            &format!("plan must be at most {} bytes", MAX_PLAN_LEN),
        );
    }

    let trip = match load_owned_trip(&state, &user_id, &trip_id).await {
        Ok(trip) => trip,
        Err(response) => return response,
    };

    match state.store.update_plan(trip.id, &update.plan).await {
        Ok(Some(trip)) => (StatusCode::OK, Json(trip)).into_response(),
        Ok(None) => trip_not_found(),
        Err(error) => storage_failure(error),
    }
}

/// Trips owned by someone else are reported as missing.
async fn load_owned_trip(
    state: &ApiState,
    user_id: &str,
    trip_id: &str,
) -> Result<Trip, Response> {
    let Ok(trip_id) = Uuid::parse_str(trip_id) else {
        return Err(trip_not_found());
    };

    match state.store.get_trip(trip_id).await {
        Ok(Some(trip)) if trip.user_id == user_id => Ok(trip),
        Ok(_) => Err(trip_not_found()),
        Err(error) => Err(storage_failure(error)),
    }
}

fn trip_not_found() -> Response {
    api_error(StatusCode::NOT_FOUND, "not_found", "trip not found")
}

fn storage_failure(error: anyhow::Error) -> Response {
    warn!(error = %error, "trip store operation failed");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "storage_error",
        "trip store is unavailable",
    )
}

fn api_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message
        })),
    )
        .into_response()
}
