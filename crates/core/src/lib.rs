pub mod dates;
pub mod error;
pub mod models;
pub mod prompt;
pub mod validation;
pub mod wizard;

pub use dates::{ensure_chronological, inclusive_day_count, parse_calendar_date};
pub use error::{ErrorKind, PlanError};
pub use models::*;
pub use prompt::build_itinerary_prompt;
pub use validation::validate_trip_request;
pub use wizard::{DraftUpdate, TripWizard, WizardStep};
