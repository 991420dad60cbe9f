//! Prometheus metrics for post-service.
//!
//! Collectors are registered in the default registry on first use and
//! rendered by [`serve_metrics`] on `GET /metrics`.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// HTTP requests by method and response status.
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests segmented by method and status",
        &["method", "status"]
    )
    .expect("failed to register http_requests_total");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration segmented by method",
        &["method"]
    )
    .expect("failed to register http_request_duration_seconds");

    /// Like/save toggles by kind (like, save) and result (added, removed).
    pub static ref POST_TOGGLES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "post_toggles_total",
        "Like and save toggles segmented by kind and result",
        &["kind", "result"]
    )
    .expect("failed to register post_toggles_total");

    /// Notification writes by kind and result (created, skipped, error).
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "notifications_total",
        "Notification writes segmented by kind and result",
        &["kind", "result"]
    )
    .expect("failed to register notifications_total");

    /// Post cache events (hit, miss, invalidate, error).
    pub static ref POST_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "post_cache_events_total",
        "Post cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register post_cache_events_total");
}

pub fn record_toggle(kind: &str, active: bool) {
    let result = if active { "added" } else { "removed" };
    POST_TOGGLES_TOTAL.with_label_values(&[kind, result]).inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
