use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::parse_calendar_date;
use crate::error::PlanError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Free,
    Poor,
    Moderate,
    Unlimited,
}

impl BudgetTier {
    pub const ALL: [BudgetTier; 4] = [Self::Free, Self::Poor, Self::Moderate, Self::Unlimited];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "poor" => Some(Self::Poor),
            "moderate" => Some(Self::Moderate),
            "unlimited" => Some(Self::Unlimited),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Poor => "poor",
            Self::Moderate => "moderate",
            Self::Unlimited => "unlimited",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Free => "Only show free activities",
            Self::Poor => "My budget is poor (only show main paid activities)",
            Self::Moderate => "I have budget for several activities",
            Self::Unlimited => "I don't care about money",
        }
    }
}

/// Validated input of the plan generator. Dates stay as the caller sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedPlan {
    pub plan: String,
}

/// Raw form data collected by the trip wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TripDraft {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget_preference: String,
}

impl TripDraft {
    pub fn validate(&self) -> Result<NewTrip, PlanError> {
        let destination = self.destination.trim();
        if destination.is_empty() {
            return Err(PlanError::required("destination"));
        }

        let (start_date, end_date) = self.validate_dates()?;

        if self.budget_preference.trim().is_empty() {
            return Err(PlanError::required("budget_preference"));
        }
        let budget_preference = BudgetTier::parse(&self.budget_preference).ok_or_else(|| {
            PlanError::invalid(format!(
                "budget_preference must be one of: {}",
                BudgetTier::ALL
                    .iter()
                    .map(|tier| tier.as_code())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;

        Ok(NewTrip {
            destination: destination.to_string(),
            start_date,
            end_date,
            budget_preference,
        })
    }

    pub fn validate_dates(&self) -> Result<(NaiveDate, NaiveDate), PlanError> {
        if self.start_date.trim().is_empty() {
            return Err(PlanError::required("start_date"));
        }
        if self.end_date.trim().is_empty() {
            return Err(PlanError::required("end_date"));
        }

        let start_date = parse_calendar_date("start_date", &self.start_date)?;
        let end_date = parse_calendar_date("end_date", &self.end_date)?;
        if end_date < start_date {
            return Err(PlanError::invalid("End date must be after start date"));
        }

        Ok((start_date, end_date))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrip {
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_preference: BudgetTier,
}

impl NewTrip {
    /// Shape expected by the plan generator.
    pub fn to_request(&self) -> TripRequest {
        TripRequest {
            destination: self.destination.clone(),
            start_date: self.start_date.format("%Y-%m-%d").to_string(),
            end_date: self.end_date.format("%Y-%m-%d").to_string(),
            budget: self.budget_preference.as_code().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub user_id: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budget_preference: BudgetTier,
    pub plan: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn from_new(new_trip: NewTrip, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            destination: new_trip.destination,
            start_date: new_trip.start_date,
            end_date: new_trip.end_date,
            budget_preference: new_trip.budget_preference,
            plan: None,
            created_at: now,
            updated_at: now,
        }
    }
}
