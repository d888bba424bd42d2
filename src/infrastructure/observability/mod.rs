//! Observability infrastructure - Prometheus metrics

mod config;
mod metrics;

pub use config::MetricsConfig;
pub use metrics::{
    create_metrics_router, init_metrics, record_code_collision, record_http_request,
    record_membership_operation, record_notification_dropped, PrometheusMetrics,
};
