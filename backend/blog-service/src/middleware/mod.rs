/// Session authentication for blog-service
///
/// [`SessionMiddleware`] resolves the session cookie (or a Bearer token) on
/// every request and stores an [`AuthUser`] in the request extensions.
/// Handlers then ask for [`AuthUser`], `Option<AuthUser>` or [`AdminUser`].
use crate::config::SessionConfig;
use crate::db::sessions;
use crate::error::AppError;
use crate::models::{Actor, ROLE_ADMIN};
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use sqlx::PgPool;
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

/// How stale `last_seen_at` may get before it is refreshed
const TOUCH_INTERVAL_SECS: i64 = 300;

/// Signed-in user resolved from a live session
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub username: String,
    pub role: String,
    pub email_verified: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            is_admin: self.is_admin(),
        }
    }
}

/// An [`AuthUser`] with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Session token from the cookie, falling back to `Authorization: Bearer`
fn extract_token(req: &ServiceRequest, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = req.cookie(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub struct SessionMiddleware {
    pool: PgPool,
    cookie_name: Rc<str>,
}

impl SessionMiddleware {
    pub fn new(pool: PgPool, cookie_name: &str) -> Self {
        Self {
            pool,
            cookie_name: Rc::from(cookie_name),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            pool: self.pool.clone(),
            cookie_name: self.cookie_name.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    pool: PgPool,
    cookie_name: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let pool = self.pool.clone();
        let token = extract_token(&req, &self.cookie_name);

        Box::pin(async move {
            if let Some(token) = token {
                let identity = sessions::find_identity(&pool, &crypto_core::sha256_hex(&token))
                    .await
                    .map_err(AppError::from)?;

                if let Some(identity) = identity {
                    if Utc::now() - identity.last_seen_at > Duration::seconds(TOUCH_INTERVAL_SECS) {
                        if let Err(e) = sessions::touch(&pool, identity.session_id).await {
                            tracing::warn!(session_id = %identity.session_id, error = %e, "Failed to refresh session activity");
                        }
                    }

                    req.extensions_mut().insert(AuthUser {
                        user_id: identity.user_id,
                        session_id: identity.session_id,
                        username: identity.username,
                        role: identity.role,
                        email_verified: identity.email_verified,
                    });
                }
            }

            service.call(req).await
        })
    }
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()).into()),
        )
    }
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<AuthUser>() {
            Some(user) if user.is_admin() => Ok(AdminUser(user.clone())),
            Some(_) => Err(AppError::Forbidden("Admin access required".to_string()).into()),
            None => Err(AppError::Unauthorized("Authentication required".to_string()).into()),
        };
        ready(result)
    }
}

/// HttpOnly, SameSite=Lax session cookie
pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(CookieDuration::days(config.ttl_days))
        .finish()
}

/// Cookie that makes the browser drop the session
pub fn expired_session_cookie(config: &SessionConfig) -> Cookie<'static> {
    Cookie::build(config.cookie_name.clone(), "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookie)
        .max_age(CookieDuration::ZERO)
        .finish()
}
