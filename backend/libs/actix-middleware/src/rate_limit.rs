use actix_web::{
    dev::{ConnectionInfo, Service, ServiceRequest, ServiceResponse, Transform},
    error::InternalError,
    Error, HttpResponse,
};
use futures::future::{ready, Ready};
use redis::aio::ConnectionManager;
use serde::Deserialize;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
    /// Redis operation timeout in milliseconds
    pub redis_timeout_ms: u64,
    /// Key on `X-Forwarded-For`/`Forwarded` instead of the socket peer.
    /// Only safe behind a proxy that overwrites those headers.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 900,
            redis_timeout_ms: 100,
            trust_proxy_headers: false,
        }
    }
}

/// Client IP for keying and auditing.
///
/// Forwarding headers are client-controlled unless a trusted proxy rewrites
/// them, so the socket peer is used unless `trust_proxy_headers` is set.
pub fn client_ip(
    peer: Option<SocketAddr>,
    info: &ConnectionInfo,
    trust_proxy_headers: bool,
) -> Option<String> {
    if trust_proxy_headers {
        info.realip_remote_addr().map(str::to_string)
    } else {
        peer.map(|addr| addr.ip().to_string())
    }
}

/// Fixed-window counter stored in Redis
#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, redis_timeout_ms: u64) -> Self {
        Self {
            redis,
            timeout: Duration::from_millis(redis_timeout_ms),
        }
    }

    /// Count one hit against `key`; `Ok(true)` once the window holds more than `max` hits.
    pub async fn hit(&self, key: &str, max: u32, window_seconds: u64) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis.clone();
        let key = format!("rate_limit:{}", key);

        // Atomic INCR + set TTL once
        const LUA: &str = r#"
            local current = redis.call('INCR', KEYS[1])
            if current == 1 then
                redis.call('EXPIRE', KEYS[1], ARGV[1])
            end
            return current
        "#;

        let count: i64 = redis::cmd("EVAL")
            .arg(LUA)
            .arg(1)
            .arg(&key)
            .arg(window_seconds as i64)
            .query_async(&mut conn)
            .await?;

        Ok(count > max as i64)
    }

    /// Like [`RateLimiter::hit`] but never fails: Redis errors and timeouts allow the request.
    pub async fn hit_or_allow(&self, key: &str, max: u32, window_seconds: u64) -> bool {
        match timeout(self.timeout, self.hit(key, max, window_seconds)).await {
            Ok(Ok(exceeded)) => exceeded,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Rate limit Redis error (allowing request)");
                false
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Rate limit Redis timeout (allowing request)"
                );
                false
            }
        }
    }
}

/// Per-client-IP rate limiting for a scope.
///
/// Without a limiter (Redis not configured) every request passes through.
pub struct RateLimitMiddleware {
    scope: &'static str,
    config: RateLimitConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl RateLimitMiddleware {
    pub fn new(scope: &'static str, config: RateLimitConfig, limiter: Option<Arc<RateLimiter>>) -> Self {
        Self {
            scope,
            config,
            limiter,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            scope: self.scope,
            config: self.config.clone(),
            limiter: self.limiter.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    scope: &'static str,
    config: RateLimitConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();
        let limiter = self.limiter.clone();
        let ip = client_ip(
            req.peer_addr(),
            &req.connection_info(),
            config.trust_proxy_headers,
        );
        let key = format!("{}:ip:{}", self.scope, ip.as_deref().unwrap_or("unknown"));

        Box::pin(async move {
            if let Some(limiter) = limiter {
                if limiter
                    .hit_or_allow(&key, config.max_requests, config.window_seconds)
                    .await
                {
                    tracing::info!(key = %key, "Rate limit exceeded");
                    return Err(too_many_requests(&config).into());
                }
            }

            service.call(req).await
        })
    }
}

fn too_many_requests(config: &RateLimitConfig) -> InternalError<String> {
    let message = format!(
        "Rate limit exceeded: {} requests per {} seconds",
        config.max_requests, config.window_seconds
    );
    let response = HttpResponse::TooManyRequests()
        .insert_header(("Retry-After", config.window_seconds.to_string()))
        .json(serde_json::json!({ "error": message, "status": 429 }));
    InternalError::from_response(message, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[::core::prelude::v1::test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window_seconds, 900);
        assert!(config.redis_timeout_ms < 1000, "Timeout too long, will block requests");
        assert!(!config.trust_proxy_headers);
    }

    #[::core::prelude::v1::test]
    fn test_too_many_requests_response() {
        let config = RateLimitConfig {
            max_requests: 5,
            window_seconds: 60,
            redis_timeout_ms: 50,
            trust_proxy_headers: false,
        };
        let err: Error = too_many_requests(&config).into();
        let resp = err.error_response();
        assert_eq!(resp.status(), 429);
        assert_eq!(
            resp.headers().get("Retry-After").and_then(|v| v.to_str().ok()),
            Some("60")
        );
    }

    #[actix_web::test]
    async fn test_passes_through_without_redis() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimitMiddleware::new(
                    "auth",
                    RateLimitConfig {
                        max_requests: 1,
                        window_seconds: 60,
                        redis_timeout_ms: 50,
                        trust_proxy_headers: false,
                    },
                    None,
                ))
                .route("/test", web::get().to(|| async { HttpResponse::Ok().body("ok") })),
        )
        .await;

        for _ in 0..3 {
            let req = test::TestRequest::get().uri("/test").to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }
    }

    #[::core::prelude::v1::test]
    fn test_client_ip_ignores_forwarded_for_unless_trusted() {
        let req = test::TestRequest::default()
            .peer_addr("10.0.0.7:51000".parse().unwrap())
            .insert_header(("X-Forwarded-For", "203.0.113.9"))
            .to_http_request();

        assert_eq!(
            client_ip(req.peer_addr(), &req.connection_info(), false).as_deref(),
            Some("10.0.0.7")
        );
        assert_eq!(
            client_ip(req.peer_addr(), &req.connection_info(), true).as_deref(),
            Some("203.0.113.9")
        );
    }
}
