pub mod completion;
pub mod config;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, instrument, warn};
use wanderplan_core::{
    build_itinerary_prompt, ensure_chronological, inclusive_day_count, validate_trip_request,
    ErrorKind, GeneratedPlan, PlanError, TripRequest,
};
use wanderplan_observability::AppMetrics;

pub use completion::{extract_completion_text, CompletionClient, NO_PLAN_FALLBACK};
pub use config::CompletionConfig;

/// Everything computed before the provider is called.
#[derive(Debug, Clone)]
pub struct PreparedPlan {
    pub request: TripRequest,
    pub days: u32,
    pub prompt: String,
}

pub fn prepare_plan(request: TripRequest) -> Result<PreparedPlan, PlanError> {
    ensure_chronological(&request.start_date, &request.end_date)?;
    let days = inclusive_day_count(&request.start_date, &request.end_date)?;
    let prompt = build_itinerary_prompt(&request, days);

    Ok(PreparedPlan {
        request,
        days,
        prompt,
    })
}

#[derive(Clone)]
pub struct TripPlanner {
    completion: CompletionClient,
    metrics: Arc<AppMetrics>,
}

impl TripPlanner {
    pub fn new(completion: CompletionClient, metrics: Arc<AppMetrics>) -> Self {
        Self {
            completion,
            metrics,
        }
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn completion_configured(&self) -> bool {
        self.completion.config().is_configured()
    }

    /// Validates a decoded request body and generates its itinerary.
    #[instrument(skip(self, body))]
    pub async fn generate(&self, body: &Value) -> Result<GeneratedPlan, PlanError> {
        let started = Instant::now();
        self.metrics.inc_plan_request();

        let result = match validate_trip_request(body) {
            Ok(request) => self.generate_for(request).await,
            Err(error) => Err(error),
        };

        self.metrics.observe_latency(started.elapsed());
        self.record_outcome(&result);
        result
    }

    async fn generate_for(&self, request: TripRequest) -> Result<GeneratedPlan, PlanError> {
        let prepared = prepare_plan(request)?;
        info!(
            destination = %prepared.request.destination,
            days = prepared.days,
            budget = %prepared.request.budget,
            "requesting itinerary"
        );

        let plan = self.completion.complete(&prepared.prompt).await?;
        Ok(GeneratedPlan { plan })
    }

    /// Generates an itinerary for an already validated request.
    pub async fn generate_request(&self, request: TripRequest) -> Result<GeneratedPlan, PlanError> {
        let started = Instant::now();
        self.metrics.inc_plan_request();

        let result = self.generate_for(request).await;

        self.metrics.observe_latency(started.elapsed());
        self.record_outcome(&result);
        result
    }

    fn record_outcome(&self, result: &Result<GeneratedPlan, PlanError>) {
        match result {
            Ok(generated) => {
                self.metrics.inc_plan_generated();
                if generated.plan == NO_PLAN_FALLBACK {
                    self.metrics.inc_empty_completion();
                }
            }
            Err(error) => match error.kind() {
                ErrorKind::InvalidRequest => {
                    self.metrics.inc_invalid_request();
                    info!(error = %error, "rejected itinerary request");
                }
                ErrorKind::ConfigurationError
                | ErrorKind::UpstreamError
                | ErrorKind::Unclassified => {
                    self.metrics.inc_upstream_failure();
                    warn!(error = %error, kind = ?error.kind(), "itinerary generation failed");
                }
            },
        }
    }
}
