use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// In-memory SQLite database with the real schema applied.
///
/// Pinned to a single pooled connection so every query sees the same memory
/// database and concurrent writers serialize, like the production store.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;

    Ok(db)
}
