use std::sync::Arc;

use diesel::r2d2::{self, ConnectionManager};
use diesel::sqlite::SqliteConnection;
use tempfile::TempDir;

use lotledger_core::db;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Fresh migrated store in a temp directory. Keep the TempDir alive for the
/// duration of the test; dropping it removes the database.
pub fn new_test_pool() -> (Arc<DbPool>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let db_path = db::init(dir.path().to_str().unwrap()).expect("Failed to initialize database");
    let pool = db::create_pool(&db_path).expect("Failed to create database pool");
    db::run_migrations(&pool).expect("Failed to run migrations");

    (pool, dir)
}
