/// Configuration management for Blog Service
///
/// All settings are read from environment variables (after `.env` is loaded
/// by `dotenvy` in `main`). Every section has development defaults; the
/// production guards in [`Config::from_env`] reject unsafe combinations.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Optional Redis used for rate limiting
    pub redis: RedisConfig,
    /// Session cookie configuration
    pub session: SessionConfig,
    /// One-time code configuration
    pub otp: OtpConfig,
    /// SMTP configuration
    pub email: EmailConfig,
    /// Object storage for uploaded images
    pub storage: StorageConfig,
    /// Upload limits
    pub uploads: UploadConfig,
    /// Page view tracking
    pub analytics: AnalyticsConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Number of HTTP workers
    pub workers: usize,
    /// Public origin used for absolute links in feeds and emails
    pub public_base_url: String,
    /// Site title used in feeds and emails
    pub site_name: String,
    /// Take the client IP from forwarding headers; enable only behind a proxy that sets them
    pub trust_proxy_headers: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }

    /// Host part of `public_base_url`, used to drop self-referrals
    pub fn public_host(&self) -> Option<String> {
        url::Url::parse(&self.public_base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: 4,
            public_base_url: "http://localhost:8080".to_string(),
            site_name: "Inkwell".to_string(),
            trust_proxy_headers: false,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "http://localhost:3000".to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/blog".to_string(),
            max_connections: 20,
            min_connections: 2,
            run_migrations: true,
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL; rate limiting is disabled when absent
    pub url: Option<String>,
    /// Requests per window allowed on `/api/v1/auth`
    pub auth_rate_limit_max: u32,
    /// Window for the auth rate limit
    pub auth_rate_limit_window_secs: u64,
    /// Timeout for a single rate limit round trip
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            auth_rate_limit_max: 30,
            auth_rate_limit_window_secs: 900,
            timeout_ms: 100,
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_days: i64,
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "blog_session".to_string(),
            ttl_days: 30,
            secure_cookie: false,
        }
    }
}

/// One-time code configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    pub ttl_secs: i64,
    pub max_attempts: i32,
    pub max_per_hour: u32,
    /// Require an emailed code after a correct password
    pub signin_required: bool,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            max_attempts: 5,
            max_per_hour: 5,
            signin_required: true,
        }
    }
}

/// SMTP configuration; an empty host puts the mailer in no-op mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
    pub notify_author_on_comment: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Inkwell <no-reply@localhost>".to_string(),
            use_starttls: true,
            notify_author_on_comment: true,
        }
    }
}

/// S3-compatible object storage; uploads are disabled without a bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, R2)
    pub endpoint: Option<String>,
    /// Public base URL for stored objects (CDN); derived from bucket/region when absent
    pub public_base_url: Option<String>,
}

/// Upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Page view tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub visitor_cookie_name: String,
    pub visitor_cookie_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            visitor_cookie_name: "blog_vid".to_string(),
            visitor_cookie_days: 365,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Config::default();
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| defaults.app.env.clone());
        let production = app_env.eq_ignore_ascii_case("production");

        let config = Config {
            app: AppConfig {
                env: app_env,
                host: env_or("BLOG_SERVICE_HOST", defaults.app.host),
                port: parse_env_or_default("BLOG_SERVICE_PORT", defaults.app.port)?,
                workers: parse_env_or_default("BLOG_SERVICE_WORKERS", defaults.app.workers)?,
                public_base_url: env_or("PUBLIC_BASE_URL", defaults.app.public_base_url)
                    .trim_end_matches('/')
                    .to_string(),
                site_name: env_or("SITE_NAME", defaults.app.site_name),
                trust_proxy_headers: parse_env_or_default(
                    "TRUST_PROXY_HEADERS",
                    defaults.app.trust_proxy_headers,
                )?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => defaults.cors.allowed_origins,
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", defaults.database.url),
                max_connections: parse_env_or_default(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                min_connections: parse_env_or_default(
                    "DATABASE_MIN_CONNECTIONS",
                    defaults.database.min_connections,
                )?,
                run_migrations: parse_env_or_default(
                    "DATABASE_RUN_MIGRATIONS",
                    defaults.database.run_migrations,
                )?,
            },
            redis: RedisConfig {
                url: env_optional("REDIS_URL"),
                auth_rate_limit_max: parse_env_or_default(
                    "AUTH_RATE_LIMIT_MAX",
                    defaults.redis.auth_rate_limit_max,
                )?,
                auth_rate_limit_window_secs: parse_env_or_default(
                    "AUTH_RATE_LIMIT_WINDOW_SECS",
                    defaults.redis.auth_rate_limit_window_secs,
                )?,
                timeout_ms: parse_env_or_default("REDIS_TIMEOUT_MS", defaults.redis.timeout_ms)?,
            },
            session: {
                let secure_cookie =
                    parse_env_or_default("SESSION_COOKIE_SECURE", production)?;
                if production && !secure_cookie {
                    return Err(
                        "SESSION_COOKIE_SECURE cannot be disabled in production".to_string()
                    );
                }

                SessionConfig {
                    cookie_name: env_or("SESSION_COOKIE_NAME", defaults.session.cookie_name),
                    ttl_days: parse_env_or_default("SESSION_TTL_DAYS", defaults.session.ttl_days)?,
                    secure_cookie,
                }
            },
            otp: OtpConfig {
                ttl_secs: parse_env_or_default("OTP_TTL_SECS", defaults.otp.ttl_secs)?,
                max_attempts: parse_env_or_default("OTP_MAX_ATTEMPTS", defaults.otp.max_attempts)?,
                max_per_hour: parse_env_or_default("OTP_MAX_PER_HOUR", defaults.otp.max_per_hour)?,
                signin_required: parse_env_or_default(
                    "AUTH_SIGNIN_OTP_REQUIRED",
                    defaults.otp.signin_required,
                )?,
            },
            email: EmailConfig {
                smtp_host: env_or("SMTP_HOST", defaults.email.smtp_host),
                smtp_port: parse_env_or_default("SMTP_PORT", defaults.email.smtp_port)?,
                smtp_username: env_optional("SMTP_USERNAME"),
                smtp_password: env_optional("SMTP_PASSWORD"),
                smtp_from: env_or("SMTP_FROM", defaults.email.smtp_from),
                use_starttls: parse_env_or_default("SMTP_STARTTLS", defaults.email.use_starttls)?,
                notify_author_on_comment: parse_env_or_default(
                    "NOTIFY_AUTHOR_ON_COMMENT",
                    defaults.email.notify_author_on_comment,
                )?,
            },
            storage: StorageConfig {
                bucket: env_optional("S3_BUCKET"),
                region: env_optional("S3_REGION").or_else(|| env_optional("AWS_REGION")),
                endpoint: env_optional("S3_ENDPOINT"),
                public_base_url: env_optional("S3_PUBLIC_BASE_URL"),
            },
            uploads: UploadConfig {
                max_bytes: parse_env_or_default("UPLOAD_MAX_BYTES", defaults.uploads.max_bytes)?,
            },
            analytics: AnalyticsConfig {
                visitor_cookie_name: env_or(
                    "VISITOR_COOKIE_NAME",
                    defaults.analytics.visitor_cookie_name,
                ),
                visitor_cookie_days: defaults.analytics.visitor_cookie_days,
            },
        };

        if config.otp.max_attempts < 1 {
            return Err("OTP_MAX_ATTEMPTS must be at least 1".to_string());
        }
        if config.session.ttl_days < 1 {
            return Err("SESSION_TTL_DAYS must be at least 1".to_string());
        }

        Ok(config)
    }
}

fn env_or(key: &str, default: String) -> String {
    env_optional(key).unwrap_or(default)
}

/// Unset and blank variables are both treated as absent
fn env_optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_optional(key) {
        Some(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}
