/// Blog Service Library
///
/// Server side of the blog: accounts with emailed one-time codes, posts with
/// categories and tags, threaded comments, likes and bookmarks, image uploads,
/// page view analytics and the admin dashboard.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `services`: Business logic layer
/// - `db`: Database access layer
/// - `models`: Row and response types
/// - `middleware`: Session authentication and extractors
/// - `error`: Error types and HTTP mapping
/// - `config`: Configuration management
/// - `metrics`: Domain Prometheus counters
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod validators;

pub use config::Config;
pub use error::{AppError, Result};

use actix_middleware::RateLimiter;
use redis::aio::ConnectionManager;
use services::{AuthService, CommentService, EmailService, ImageStore, OtpService};
use services::comments::CommentNotifier;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared handles every request handler can reach through `web::Data<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub email: EmailService,
    /// `None` when object storage is not configured
    pub images: Option<Arc<dyn ImageStore>>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub redis: Option<ConnectionManager>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, email: EmailService) -> Self {
        Self {
            db,
            config: Arc::new(config),
            email,
            images: None,
            rate_limiter: None,
            redis: None,
        }
    }

    pub fn with_images(mut self, images: Arc<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    /// Redis backs rate limiting only
    pub fn with_redis(mut self, redis: ConnectionManager) -> Self {
        self.rate_limiter = Some(Arc::new(RateLimiter::new(
            redis.clone(),
            self.config.redis.timeout_ms,
        )));
        self.redis = Some(redis);
        self
    }

    pub fn auth_service(&self) -> AuthService {
        let otp = OtpService::new(
            self.db.clone(),
            self.email.clone(),
            self.rate_limiter.clone(),
            self.config.otp.clone(),
        );
        AuthService::new(
            self.db.clone(),
            otp,
            self.config.session.clone(),
            &self.config.otp,
        )
    }

    pub fn comment_service(&self) -> CommentService {
        if self.config.email.notify_author_on_comment && self.email.is_enabled() {
            CommentService::with_notifier(
                self.db.clone(),
                CommentNotifier {
                    email: self.email.clone(),
                    public_base_url: self.config.app.public_base_url.clone(),
                },
            )
        } else {
            CommentService::new(self.db.clone())
        }
    }
}
