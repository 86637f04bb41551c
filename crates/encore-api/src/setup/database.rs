//! Database pool setup and migrations.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use encore_core::Config;

pub async fn connect_and_migrate(config: &Config) -> Result<PgPool, anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;

    encore_db::MIGRATOR.run(&pool).await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected and migrated"
    );
    Ok(pool)
}
