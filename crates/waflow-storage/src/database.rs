// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use waflow_core::WaflowError;

use crate::migrations;

/// Convert a tokio-rusqlite error into WaflowError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> WaflowError {
    WaflowError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the SQLite database.
///
/// Cheap to clone; all clones share the single background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, WaflowError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| WaflowError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;

        let journal_mode = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal_mode};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ModuleError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// Open an in-memory database with migrations applied. Test use only;
    /// the data vanishes when the connection closes.
    pub async fn open_in_memory() -> Result<Self, WaflowError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ModuleError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), WaflowError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
