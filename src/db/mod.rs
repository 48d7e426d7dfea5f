//! Database helpers: migrations, path handling, entry store and retention.

use crate::models::entry::log_entry::TABLE_NAME;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::path::Path;
use std::time::Duration;

pub mod entry_store;
pub mod retention;

/// Run SQLite migrations to create tables if absent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        r#"CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
            uid INTEGER PRIMARY KEY AUTOINCREMENT,
            pid INTEGER NOT NULL DEFAULT 0,
            crdate INTEGER NOT NULL DEFAULT 0,
            run_id TEXT NOT NULL DEFAULT '',
            severity INTEGER NOT NULL DEFAULT 0,
            ext_key TEXT NOT NULL DEFAULT '',
            host TEXT NULL,
            message TEXT NOT NULL DEFAULT '',
            extra_data BLOB NULL,
            cruser_id INTEGER NOT NULL DEFAULT 0,
            transport_ids TEXT NOT NULL DEFAULT ''
        )"#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {TABLE_NAME}_run_id ON {TABLE_NAME} (run_id)"
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        "CREATE INDEX IF NOT EXISTS {TABLE_NAME}_crdate_severity ON {TABLE_NAME} (crdate, severity)"
    ))
    .execute(pool)
    .await?;
    Ok(())
}

/// Open a pool for the URL and bring the schema up to date.
///
/// In-memory databases get a single connection; every extra connection would
/// see its own empty database.
pub async fn connect(db_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let db_url = ensure_sqlite_path(db_url);
    let options = if db_url.contains(":memory:") {
        // The database lives only as long as its connection.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(&db_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Ensure SQLite file and parent folder exist for a given sqlx URL.
pub fn ensure_sqlite_path(db_url: &str) -> String {
    if !db_url.starts_with("sqlite:") {
        return db_url.to_string();
    }
    let path_part = db_url.trim_start_matches("sqlite://");
    if path_part == ":memory:" || path_part == "sqlite::memory:" {
        return db_url.to_string();
    }
    let (path_only, _) = match path_part.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_part, None),
    };
    if !path_only.is_empty() {
        let p = Path::new(path_only);
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let _ = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(p);
    }
    db_url.to_string()
}
