use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

use crate::state::AppState;

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

/// GET /api/health
pub async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    match state.users.health_check().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "post-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("Store check failed: {}", e),
            "service": "post-service"
        })),
    }
}

/// GET /api/health/ready
pub async fn readiness_summary(state: web::Data<AppState>) -> HttpResponse {
    let mut checks = HashMap::new();
    let mut ready = true;

    let start = Instant::now();
    let store_result = state.users.health_check().await;
    let store_latency = Some(start.elapsed().as_millis() as u64);
    let store_check = match store_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Store reachable".to_string(),
            latency_ms: store_latency,
        },
        Err(e) => {
            ready = false;
            ComponentCheck {
                status: ComponentStatus::Unhealthy,
                message: format!("Store check failed: {}", e),
                latency_ms: store_latency,
            }
        }
    };
    checks.insert("store".to_string(), store_check);

    if let Some(cache) = &state.cache {
        let start = Instant::now();
        let redis_result = cache.ping().await;
        let redis_latency = Some(start.elapsed().as_millis() as u64);
        let redis_check = match redis_result {
            Ok(_) => ComponentCheck {
                status: ComponentStatus::Healthy,
                message: "Redis ping successful".to_string(),
                latency_ms: redis_latency,
            },
            Err(e) => {
                ready = false;
                ComponentCheck {
                    status: ComponentStatus::Unhealthy,
                    message: format!("Redis ping failed: {}", e),
                    latency_ms: redis_latency,
                }
            }
        };
        checks.insert("redis".to_string(), redis_check);
    }

    let status = if ready {
        ComponentStatus::Healthy
    } else {
        ComponentStatus::Unhealthy
    };

    let response = ReadinessResponse {
        ready,
        status,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// GET /api/health/live
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
