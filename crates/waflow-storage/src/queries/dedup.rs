// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable dedup records keyed by (tenant_id, message_id).
//!
//! Rows are written once and never mutated. Retention/pruning belongs to a
//! separate job outside this crate.

use rusqlite::params;
use waflow_core::WaflowError;

use crate::database::Database;

/// Returns whether a processed-message record exists.
pub async fn exists(
    db: &Database,
    tenant_id: &str,
    message_id: &str,
) -> Result<bool, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM processed_messages
                 WHERE tenant_id = ?1 AND message_id = ?2",
                params![tenant_id, message_id],
                |row| row.get(0),
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a processed message. Returns `true` if this call inserted the row,
/// `false` if it already existed (a redelivery lost the race).
pub async fn insert_if_absent(
    db: &Database,
    tenant_id: &str,
    message_id: &str,
    sender: Option<&str>,
    captured_at: Option<&str>,
) -> Result<bool, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let message_id = message_id.to_string();
    let sender = sender.map(str::to_string);
    let captured_at = captured_at.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO processed_messages
                     (tenant_id, message_id, sender, captured_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tenant_id, message_id, sender, captured_at],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
