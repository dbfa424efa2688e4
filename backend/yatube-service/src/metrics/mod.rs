//! Prometheus metrics for yatube-service.
//!
//! Exposes collectors for the page cache and content writes, plus the
//! handler behind `/metrics`.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

lazy_static! {
    /// Page cache events (hit/miss/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "yatube_page_cache_events_total",
        "Page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register yatube_page_cache_events_total");

    /// Content writes by kind (post_created, post_edited, post_deleted,
    /// comment_created, follow_created, follow_deleted, user_created).
    pub static ref CONTENT_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_content_writes_total",
        "Content writes segmented by kind",
        &["kind"]
    )
    .expect("failed to register yatube_content_writes_total");

    /// Form submissions rejected by validation, by form.
    pub static ref FORM_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "yatube_form_rejections_total",
        "Form submissions rejected by validation",
        &["form"]
    )
    .expect("failed to register yatube_form_rejections_total");
}

pub fn record_write(kind: &str) {
    CONTENT_WRITES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn record_rejection(form: &str) {
    FORM_REJECTIONS_TOTAL.with_label_values(&[form]).inc();
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
