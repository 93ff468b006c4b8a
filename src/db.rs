use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;

use crate::error::{PlanboardError, Result};

pub const BUSY_TIMEOUT_MS: u32 = 5000;

fn busy_timeout_pragma() -> String {
    format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}")
}

pub fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(parent).map_err(|e| {
            PlanboardError::Storage(format!(
                "Failed to create database directory {}: {e}",
                parent.to_string_lossy()
            ))
        })?;
    }
    Ok(())
}

pub fn configure_connection_sync(conn: &mut SqliteConnection) -> Result<()> {
    diesel::RunQueryDsl::execute(diesel::sql_query(busy_timeout_pragma()), conn)
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    Ok(())
}

pub async fn configure_connection_async(
    conn: &mut SyncConnectionWrapper<SqliteConnection>,
) -> Result<()> {
    diesel_async::RunQueryDsl::execute(diesel::sql_query(busy_timeout_pragma()), conn)
        .await
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    Ok(())
}

pub fn open_connection_sync(database_url: &str) -> Result<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)
        .map_err(|e| PlanboardError::Storage(e.to_string()))?;
    configure_connection_sync(&mut conn)?;
    Ok(conn)
}
