use prometheus::{register_int_gauge_vec, IntGaugeVec};
use sqlx::PgPool;

lazy_static::lazy_static! {
    /// Pool occupancy: `in_use`, `idle` and the configured `max`
    static ref DB_POOL_CONNECTIONS: IntGaugeVec = register_int_gauge_vec!(
        "blog_db_pool_connections",
        "PostgreSQL pool connections segmented by pool and state",
        &["pool", "state"]
    )
    .expect("failed to register blog_db_pool_connections");
}

pub(crate) fn update_pool_metrics(pool: &PgPool, name: &str) {
    let size = i64::from(pool.size());
    let idle = pool.num_idle() as i64;

    DB_POOL_CONNECTIONS
        .with_label_values(&[name, "in_use"])
        .set(size.saturating_sub(idle));
    DB_POOL_CONNECTIONS.with_label_values(&[name, "idle"]).set(idle);
    DB_POOL_CONNECTIONS
        .with_label_values(&[name, "max"])
        .set(i64::from(pool.options().get_max_connections()));
}
