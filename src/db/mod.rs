//! Metadata database
pub mod entities;
pub mod migrations;

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Opens (creating if needed) the SQLite database at `path`
pub async fn connect_db(path: &str) -> Result<DatabaseConnection, DbErr> {
    let url = format!("sqlite://{}?mode=rwc", path);
    Database::connect(url).await
}

#[cfg(test)]
pub(crate) async fn connect_test_db() -> Result<DatabaseConnection, DbErr> {
    Database::connect("sqlite::memory:").await
}

#[cfg(test)]
pub(crate) async fn migrated_test_db() -> DatabaseConnection {
    use sea_orm_migration::MigratorTrait;

    let db = connect_test_db().await.expect("connect test db");
    migrations::Migrator::up(&db, None)
        .await
        .expect("run migrations");
    db
}
