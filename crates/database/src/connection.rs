use crate::error::DbError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// `url` takes precedence; otherwise `DATABASE_URL` is read from the environment
/// (after loading a `.env` file if one exists).
pub async fn connect(url: Option<&str>, max_connections: u32) -> Result<PgPool, DbError> {
    let database_url = match url {
        Some(url) => url.to_string(),
        None => {
            dotenvy::dotenv().ok();
            env::var("DATABASE_URL").map_err(|_e| {
                DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string())
            })?
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections, "Connected to the database.");
    Ok(pool)
}

/// Applies the embedded migrations so the `trades` schema is up to date.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    // Use a relative path from the crate root
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
