/// Liveness, readiness and summary health endpoints
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use redis::RedisError;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

impl ComponentCheck {
    fn configured(enabled: bool, what: &str) -> Self {
        Self {
            status: if enabled {
                ComponentStatus::Healthy
            } else {
                ComponentStatus::Degraded
            },
            message: if enabled {
                format!("{} configured", what)
            } else {
                format!("{} not configured", what)
            },
            latency_ms: None,
        }
    }
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

async fn check_postgres(state: &AppState) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1")
        .fetch_one(&state.db)
        .await
        .map(|_| ())
}

async fn check_redis(state: &AppState) -> Option<Result<(), RedisError>> {
    let mut conn = state.redis.clone()?;
    let result = redis::cmd("PING")
        .query_async::<_, String>(&mut conn)
        .await
        .and_then(|pong| {
            if pong == "PONG" {
                Ok(())
            } else {
                Err(RedisError::from((
                    redis::ErrorKind::ResponseError,
                    "unexpected PING response",
                )))
            }
        });
    Some(result)
}

/// GET /api/v1/health
pub async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    match check_postgres(&state).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "blog-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "error": "PostgreSQL connection failed",
                "service": "blog-service"
            }))
        }
    }
}

/// GET /api/v1/health/ready
///
/// Only PostgreSQL gates readiness; Redis, SMTP and object storage degrade
/// individual features when missing.
pub async fn readiness_summary(state: web::Data<AppState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let pg_result = check_postgres(&state).await;
    let pg_latency = Some(start.elapsed().as_millis() as u64);
    let ready = pg_result.is_ok();
    let postgres_check = match pg_result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "PostgreSQL connection successful".to_string(),
            latency_ms: pg_latency,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("PostgreSQL connection failed: {}", e),
            latency_ms: pg_latency,
        },
    };
    checks.insert("postgresql".to_string(), postgres_check);

    let start = Instant::now();
    let redis_check = match check_redis(&state).await {
        None => ComponentCheck::configured(false, "Redis"),
        Some(Ok(())) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Redis ping successful".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Some(Err(e)) => ComponentCheck {
            status: ComponentStatus::Degraded,
            message: format!("Redis ping failed: {}", e),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
    };
    checks.insert("redis".to_string(), redis_check);

    checks.insert(
        "smtp".to_string(),
        ComponentCheck::configured(state.email.is_enabled(), "SMTP"),
    );
    checks.insert(
        "object_storage".to_string(),
        ComponentCheck::configured(state.images.is_some(), "Object storage"),
    );

    let status = if !ready {
        ComponentStatus::Unhealthy
    } else if checks
        .values()
        .any(|c| c.status == ComponentStatus::Degraded)
    {
        ComponentStatus::Degraded
    } else {
        ComponentStatus::Healthy
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

/// GET /api/v1/health/live
pub async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}
