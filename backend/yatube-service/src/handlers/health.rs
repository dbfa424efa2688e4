/// Liveness and readiness probes
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::AppState;

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<&'static str, ComponentCheck>,
    timestamp: String,
}

fn component<E: std::fmt::Display>(
    result: std::result::Result<(), E>,
    started: Instant,
    ok_message: &str,
) -> ComponentCheck {
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: ok_message.to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: e.to_string(),
            latency_ms,
        },
    }
}

/// GET /health
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "yatube-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health/ready - storage and page cache reachable
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let started = Instant::now();
    let storage = state.repo.health_check().await;
    checks.insert("storage", component(storage, started, "storage reachable"));

    let started = Instant::now();
    let cache = state.page_cache.health_check().await;
    checks.insert("page_cache", component(cache, started, "page cache reachable"));

    let ready = checks
        .values()
        .all(|check| check.status == ComponentStatus::Healthy);
    let response = ReadinessResponse {
        ready,
        status: if ready {
            ComponentStatus::Healthy
        } else {
            ComponentStatus::Unhealthy
        },
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        tracing::warn!("readiness check failed");
        HttpResponse::ServiceUnavailable().json(response)
    }
}
