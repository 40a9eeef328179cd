use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    plan_requests_total: AtomicU64,
    plans_generated_total: AtomicU64,
    invalid_requests_total: AtomicU64,
    upstream_failures_total: AtomicU64,
    empty_completions_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub plan_requests_total: u64,
    pub plans_generated_total: u64,
    pub invalid_requests_total: u64,
    pub upstream_failures_total: u64,
    pub empty_completions_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_plan_request(&self) {
        self.plan_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_plan_generated(&self) {
        self.plans_generated_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_invalid_request(&self) {
        self.invalid_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_upstream_failure(&self) {
        self.upstream_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_empty_completion(&self) {
        self.empty_completions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.plan_requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            plan_requests_total: requests,
            plans_generated_total: self.plans_generated_total.load(Ordering::Relaxed),
            invalid_requests_total: self.invalid_requests_total.load(Ordering::Relaxed),
            upstream_failures_total: self.upstream_failures_total.load(Ordering::Relaxed),
            empty_completions_total: self.empty_completions_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    init_tracing_with_writer(service_name, std::io::stdout);
}

/// Same as [`init_tracing`], for binaries whose stdout carries their output.
pub fn init_tracing_to_stderr(service_name: &str) {
    init_tracing_with_writer(service_name, std::io::stderr);
}

fn init_tracing_with_writer<W>(service_name: &str, writer: W)
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,wanderplan_api=info,wanderplan_planner=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(writer)
            .init();
    });
}
