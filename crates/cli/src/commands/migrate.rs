//! Run database migrations for the checkout schema.

use clementine_server::config::ServerConfig;
use clementine_server::db;

use super::CommandError;

/// Run all pending migrations from `crates/server/migrations/`.
///
/// # Errors
///
/// Returns `CommandError` if configuration, connection, or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("running checkout migrations");
    sqlx::migrate!("../server/migrations").run(&pool).await?;
    tracing::info!("migrations complete");

    Ok(())
}
