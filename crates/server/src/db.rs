use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

/// Create a PostgreSQL connection pool and run migrations.
/// Returns None if PostgreSQL is not configured or unreachable.
pub async fn init_pg_pool(config: &pdfqa_core::config::PostgresConfig) -> Option<PgPool> {
    if !config.is_configured() {
        info!("PG_URL / PG_USERNAME not set, using the in-memory vector store");
        return None;
    }

    let pool = match PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url())
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Failed to connect to PostgreSQL: {} (falling back to the in-memory vector store)", e);
            return None;
        }
    };
    info!("PostgreSQL connected: {}/{}", config.host, config.database);

    match sqlx::migrate!("../../migrations").run(&pool).await {
        Ok(()) => {
            info!("Database migrations applied successfully");
            Some(pool)
        }
        Err(e) => {
            warn!("Failed to run migrations: {} (falling back to the in-memory vector store)", e);
            None
        }
    }
}
