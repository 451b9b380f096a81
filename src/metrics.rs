//! Prometheus metrics for onboarding task processing, exposed at `GET /metrics`.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::Registry,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::OnboardingTask;
use crate::AppState;

/// Labels for task outcomes. `failed_reason` is empty unless the task failed.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TaskOutcomeLabels {
    pub status: String,
    pub failed_reason: String,
}

/// Onboarding metrics and the registry that exposes them
pub struct Metrics {
    registry: Mutex<Registry>,
    /// Finished tasks, by (status, failed_reason)
    pub task_results: Family<TaskOutcomeLabels, Counter>,
    /// Wall time the worker spent on one task
    pub task_processing_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let task_results = Family::<TaskOutcomeLabels, Counter>::default();
        // device logins run from sub-second to the request timeout
        let task_processing_seconds = Histogram::new(
            [0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0].into_iter(),
        );

        registry.register(
            "onboarding_task_results",
            "Finished onboarding tasks by status and failure reason",
            task_results.clone(),
        );
        registry.register(
            "onboarding_task_processing_seconds",
            "Time spent processing one onboarding task",
            task_processing_seconds.clone(),
        );

        Self {
            registry: Mutex::new(registry),
            task_results,
            task_processing_seconds,
        }
    }

    /// Count a finished task and observe how long it took
    pub fn record_task(&self, task: &OnboardingTask, elapsed: Duration) {
        let labels = TaskOutcomeLabels {
            status: task.status.clone(),
            failed_reason: task.failed_reason.clone().unwrap_or_default(),
        };
        self.task_results.get_or_create(&labels).inc();
        self.task_processing_seconds.observe(elapsed.as_secs_f64());
    }

    /// Text exposition of every registered metric
    pub fn encode(&self) -> anyhow::Result<String> {
        let registry = self
            .registry
            .lock()
            .map_err(|_| anyhow::anyhow!("metrics registry lock poisoned"))?;
        let mut buf = String::new();
        prometheus_client::encoding::text::encode(&mut buf, &registry)?;
        Ok(buf)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /metrics in the Prometheus text format
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{task_status, OnboardingRequest};

    fn finished(status: &str, reason: Option<&str>) -> OnboardingTask {
        let mut task = OnboardingTask::unrecorded("t-1", &OnboardingRequest::new("192.0.2.1", "nyc01"));
        task.status = status.to_string();
        task.failed_reason = reason.map(str::to_string);
        task
    }

    #[test]
    fn test_outcomes_are_counted_by_status_and_reason() {
        let metrics = Metrics::new();
        metrics.record_task(&finished(task_status::SUCCEEDED, None), Duration::from_secs(3));
        metrics.record_task(&finished(task_status::FAILED, Some("fail-login")), Duration::from_secs(1));
        metrics.record_task(&finished(task_status::FAILED, Some("fail-login")), Duration::from_secs(1));

        let failed = TaskOutcomeLabels {
            status: "failed".into(),
            failed_reason: "fail-login".into(),
        };
        assert_eq!(metrics.task_results.get_or_create(&failed).get(), 2);

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            r#"onboarding_task_results_total{status="failed",failed_reason="fail-login"} 2"#
        ));
        assert!(text.contains(r#"onboarding_task_results_total{status="succeeded",failed_reason=""} 1"#));
        assert!(text.contains("onboarding_task_processing_seconds_count 3"));
        assert!(text.contains("onboarding_task_processing_seconds_sum 5.0"));
    }
}
