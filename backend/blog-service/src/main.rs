use actix_cors::Cors;
use actix_middleware::MetricsMiddleware;
use actix_web::{web, App, HttpServer};
use blog_service::services::{EmailService, S3ImageStore};
use blog_service::{db, handlers, AppState, Config};
use db_pool::{create_pool as create_pg_pool, DbConfig as DbPoolConfig};
use redis::aio::ConnectionManager;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "blog-service";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_redis(url: &str, timeout_ms: u64) -> Option<ConnectionManager> {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid REDIS_URL; rate limiting disabled");
            return None;
        }
    };

    let connect = ConnectionManager::new(client);
    match tokio::time::timeout(Duration::from_millis(timeout_ms.max(1000)), connect).await {
        Ok(Ok(manager)) => {
            tracing::info!("Connected to Redis");
            Some(manager)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Redis unavailable; rate limiting disabled");
            None
        }
        Err(_) => {
            tracing::warn!("Redis connection timed out; rate limiting disabled");
            None
        }
    }
}

fn build_cors(config: &Config) -> Cors {
    let mut cors = Cors::default();
    for origin in config.cors.allowed_origins.split(',') {
        let origin = origin.trim();
        if origin.is_empty() {
            continue;
        }
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Blog Service
///
/// Serves the JSON API under `/api/v1`, the RSS feed and sitemap, health
/// checks and Prometheus metrics. PostgreSQL is required; Redis (rate
/// limiting), SMTP (emailed codes) and S3 (image uploads) are optional and
/// the service degrades gracefully without them.
#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting {} v{}", SERVICE_NAME, env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let db_cfg = DbPoolConfig {
        pool_name: SERVICE_NAME.to_string(),
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..DbPoolConfig::default()
    };
    if let Err(e) = db_cfg.validate() {
        tracing::error!("Invalid database pool configuration: {}", e);
        eprintln!("ERROR: Invalid database pool configuration: {}", e);
        std::process::exit(1);
    }

    db_cfg.log_config();
    let db_pool = match create_pg_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Connected to database");

    if config.database.run_migrations {
        db::run_migrations(&db_pool)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Migrations failed: {e}")))?;
        tracing::info!("Database migrations applied");
    }

    let email = EmailService::new(&config.email, &config.app.site_name)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Email setup failed: {e}")))?;

    let redis = match config.redis.url.as_deref() {
        Some(url) => connect_redis(url, config.redis.timeout_ms).await,
        None => {
            tracing::info!("REDIS_URL not set; rate limiting disabled");
            None
        }
    };

    let images = S3ImageStore::from_config(&config.storage).await;
    if images.is_none() {
        tracing::warn!("S3_BUCKET not set; image uploads disabled");
    }

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    let workers = config.app.workers;

    let mut state = AppState::new(db_pool, config, email);
    if let Some(redis) = redis {
        state = state.with_redis(redis);
    }
    if let Some(images) = images {
        state = state.with_images(Arc::new(images));
    }

    tracing::info!("Starting HTTP server at {}", http_bind_address);

    let app_state = state.clone();
    let server = HttpServer::new(move || {
        let state = app_state.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(build_cors(&state.config))
            .wrap(MetricsMiddleware)
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(|cfg| handlers::configure(cfg, &state))
    })
    .bind(&http_bind_address)?
    .workers(workers)
    .shutdown_timeout(30)
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();
    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    tokio::select! {
        result = tasks.join_next() => {
            match result {
                Some(Ok(Ok(_))) | None => {
                    tracing::info!("HTTP server stopped");
                }
                Some(Ok(Err(e))) => {
                    tracing::error!("HTTP server returned error: {}", e);
                    first_error = Some(e);
                }
                Some(Err(e)) => {
                    tracing::error!("HTTP server task join error: {}", e);
                    first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                }
            }
        }
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            tasks.shutdown().await;
        }
    }

    state.db.close().await;
    tracing::info!("Blog-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
