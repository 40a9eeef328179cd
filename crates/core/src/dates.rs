use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::PlanError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Parses `YYYY-MM-DD` (midnight) or an RFC 3339 timestamp normalised to UTC.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.naive_utc())
}

pub fn parse_calendar_date(field: &str, value: &str) -> Result<NaiveDate, PlanError> {
    parse_instant(value)
        .map(|instant| instant.date())
        .ok_or_else(|| invalid_date(field))
}

/// Inclusive day count covering both endpoints: `ceil(|end - start| in days) + 1`.
///
/// The span is symmetric; chronological order is checked separately by
/// [`ensure_chronological`].
pub fn inclusive_day_count(start_date: &str, end_date: &str) -> Result<u32, PlanError> {
    let start = parse_instant(start_date).ok_or_else(|| invalid_date("startDate"))?;
    let end = parse_instant(end_date).ok_or_else(|| invalid_date("endDate"))?;

    let seconds = (end - start).num_seconds().abs();
    let whole_days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;

    u32::try_from(whole_days + 1).map_err(|_| PlanError::invalid("date range is too long"))
}

/// Compares calendar days; the time of day is ignored.
pub fn ensure_chronological(start_date: &str, end_date: &str) -> Result<(), PlanError> {
    let start = parse_calendar_date("startDate", start_date)?;
    let end = parse_calendar_date("endDate", end_date)?;

    if end < start {
        return Err(PlanError::invalid(
            "endDate must not be earlier than startDate",
        ));
    }
    Ok(())
}

fn invalid_date(field: &str) -> PlanError {
    PlanError::invalid(format!(
        "{} must be a calendar date (YYYY-MM-DD)",
        field
    ))
}
