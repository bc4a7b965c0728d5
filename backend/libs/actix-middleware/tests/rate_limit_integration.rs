use actix_middleware::{RateLimitConfig, RateLimitMiddleware, RateLimiter};
use actix_web::{test, web, App, HttpResponse};
use redis::aio::ConnectionManager;
use redis::Client;
use std::sync::Arc;

/// Simple test handler
async fn test_handler() -> HttpResponse {
    HttpResponse::Ok().body("success")
}

async fn connect() -> Option<ConnectionManager> {
    let url = std::env::var("TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let client = Client::open(url).ok()?;
    match tokio::time::timeout(std::time::Duration::from_secs(2), ConnectionManager::new(client)).await {
        Ok(Ok(m)) => Some(m),
        _ => None,
    }
}

#[actix_web::test]
async fn test_rate_limit_exceeded() {
    let Some(manager) = connect().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    // Unique scope per run so leftover counters do not interfere
    let scope: &'static str = Box::leak(format!("test-{}", std::process::id()).into_boxed_str());
    let config = RateLimitConfig {
        max_requests: 2,
        window_seconds: 10,
        redis_timeout_ms: 500,
        trust_proxy_headers: false,
    };
    let limiter = Arc::new(RateLimiter::new(manager, config.redis_timeout_ms));

    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(scope, config, Some(limiter)))
            .route("/test", web::get().to(test_handler)),
    )
    .await;

    for _ in 0..2 {
        let req = test::TestRequest::get().uri("/test").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::try_call_service(&app, req).await;
    let status = match resp {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    };
    assert_eq!(status, 429);
}

#[actix_web::test]
async fn test_limiter_counts_per_key() {
    let Some(manager) = connect().await else {
        eprintln!("Skipping test: Redis not available");
        return;
    };

    let limiter = RateLimiter::new(manager, 500);
    let key = format!("otp:test-{}@example.com", std::process::id());

    assert!(!limiter.hit(&key, 1, 10).await.unwrap());
    assert!(limiter.hit(&key, 1, 10).await.unwrap());
}
