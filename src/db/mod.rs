//! # Relational persistence
//!
//! `SeaORM` entities, migrations and the [`SeaOrmSkosRepository`] adapter.
//! Sqlite and Postgres are supported.
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::{config::DatabaseSettings, Result};

pub mod entities;
pub mod migration;
mod repository;

pub use migration::Migrator;
pub use repository::SeaOrmSkosRepository;

/// Opens a connection pool and, when configured, applies pending migrations.
///
/// # Errors
///
/// Returns a [`sea_orm::DbErr`] wrapped in [`crate::Error::DB`] when the
/// database cannot be reached or a migration fails.
pub async fn connect(config: &DatabaseSettings) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.uri.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(config.enable_logging);

    let db = Database::connect(options).await?;
    tracing::debug!(max_connections = config.max_connections, "database connected");

    if config.auto_migrate {
        migrate(&db).await?;
    }
    Ok(db)
}

/// Applies every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None).await?;
    tracing::info!("database migrations applied");
    Ok(())
}
