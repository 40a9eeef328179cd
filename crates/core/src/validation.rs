use serde_json::Value;

use crate::error::PlanError;
use crate::models::TripRequest;

/// Checks the decoded request body of the plan generator.
///
/// Every field must be a string that is non-empty after trimming; the returned
/// request carries the trimmed values.
pub fn validate_trip_request(body: &Value) -> Result<TripRequest, PlanError> {
    let Some(object) = body.as_object() else {
        return Err(PlanError::invalid("Invalid request body"));
    };

    let required = |field: &str| {
        object
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PlanError::required(field))
    };

    Ok(TripRequest {
        destination: required("destination")?,
        start_date: required("startDate")?,
        end_date: required("endDate")?,
        budget: required("budget")?,
    })
}
