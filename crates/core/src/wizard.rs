use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::models::{NewTrip, TripDraft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Destination,
    Dates,
    Budget,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        match self {
            Self::Destination => 1,
            Self::Dates => 2,
            Self::Budget => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Destination => "Where do you want to go?",
            Self::Dates => "When are you traveling?",
            Self::Budget => "What's your budget?",
        }
    }
}

/// Partial update applied to the draft, mirroring one form interaction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftUpdate {
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub budget_preference: Option<String>,
}

/// Three-step trip creation flow: destination, dates, then budget.
#[derive(Debug, Clone)]
pub struct TripWizard {
    step: WizardStep,
    draft: TripDraft,
}

impl Default for TripWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl TripWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Destination,
            draft: TripDraft::default(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &TripDraft {
        &self.draft
    }

    pub fn update(&mut self, update: DraftUpdate) {
        if let Some(destination) = update.destination {
            self.draft.destination = destination;
        }
        if let Some(start_date) = update.start_date {
            self.draft.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.draft.end_date = end_date;
        }
        if let Some(budget_preference) = update.budget_preference {
            self.draft.budget_preference = budget_preference;
        }
    }

    /// Advances when the current step is complete. Stays on the last step.
    pub fn next(&mut self) -> Result<WizardStep, PlanError> {
        self.check_step()?;
        self.step = match self.step {
            WizardStep::Destination => WizardStep::Dates,
            WizardStep::Dates | WizardStep::Budget => WizardStep::Budget,
        };
        Ok(self.step)
    }

    pub fn previous(&mut self) -> WizardStep {
        self.step = match self.step {
            WizardStep::Destination | WizardStep::Dates => WizardStep::Destination,
            WizardStep::Budget => WizardStep::Dates,
        };
        self.step
    }

    pub fn finish(&self) -> Result<NewTrip, PlanError> {
        if self.step != WizardStep::Budget {
            return Err(PlanError::invalid(format!(
                "trip wizard is on step {} of 3",
                self.step.number()
            )));
        }
        self.draft.validate()
    }

    fn check_step(&self) -> Result<(), PlanError> {
        match self.step {
            WizardStep::Destination => {
                if self.draft.destination.trim().is_empty() {
                    return Err(PlanError::required("destination"));
                }
                Ok(())
            }
            WizardStep::Dates => self.draft.validate_dates().map(|_| ()),
            WizardStep::Budget => Ok(()),
        }
    }
}
