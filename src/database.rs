use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection, sqlx::PgPool};

/// Connects, brings the schema up to date, and opens the raw pool used by the
/// session store.
pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = Database::connect(db_url)
        .await
        .context("Cannot connect to db")?;
    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}
