use std::sync::OnceLock;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one recorder can be installed per process; later calls return the
/// handle of the first.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if metrics::set_global_recorder(recorder).is_err() {
                tracing::warn!("A metrics recorder was already installed");
            }

            // Pre-register counters so they appear even before the first increment.
            counter!("alerts_created_total").absolute(0);
            counter!("alerts_triggered_total").absolute(0);
            counter!("alert_transition_conflicts_total").absolute(0);
            counter!("screener_runs_total").absolute(0);
            counter!("notifications_failed_total").absolute(0);

            // Histogram is lazily created on first record; force creation.
            histogram!("screener_matches").record(0.0);

            handle
        })
        .clone()
}
