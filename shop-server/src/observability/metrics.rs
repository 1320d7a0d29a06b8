//! Prometheus metrics for the HTTP server.
//!
//! Names live in [`MetricName`] so call sites never spell them out.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, warn};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    HttpRequests,
    HttpRequestDuration,
    OrdersCreated,
    StockMovements,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpRequests => "http_requests_total",
            MetricName::HttpRequestDuration => "http_request_duration_seconds",
            MetricName::OrdersCreated => "orders_created_total",
            MetricName::StockMovements => "stock_movements_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the global Prometheus recorder. Safe to call more than once.
pub fn init() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_ok() {
                info!("Prometheus metrics recorder installed");
            }
        }
        Err(e) => warn!("Failed to install metrics recorder: {}", e),
    }
}

/// Prometheus text exposition of everything recorded so far.
pub fn render() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

pub fn record_request(method: &str, status: u16, seconds: f64) {
    metrics::counter!(
        MetricName::HttpRequests.as_str(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(MetricName::HttpRequestDuration.as_str()).record(seconds);
}

pub fn record_order_created() {
    metrics::counter!(MetricName::OrdersCreated.as_str()).increment(1);
}

/// `kind` is one of `arrival`, `realization`, `order` or `restock`.
pub fn record_stock_movement(kind: &'static str) {
    metrics::counter!(MetricName::StockMovements.as_str(), "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_prometheus_conventions() {
        assert_eq!(MetricName::HttpRequests.to_string(), "http_requests_total");
        assert!(MetricName::HttpRequestDuration.as_str().ends_with("_seconds"));
        assert!(MetricName::OrdersCreated.as_str().ends_with("_total"));
        assert!(MetricName::StockMovements.as_str().ends_with("_total"));
    }
}
