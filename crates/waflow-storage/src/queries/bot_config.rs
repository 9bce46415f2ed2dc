// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot configuration rows: seeded defaults and per-tenant overrides.
//!
//! Two partial unique indexes enforce the data model: exactly one default row
//! per key, at most one override row per (tenant, key). Precedence merging
//! happens in `waflow-tenant`; this module only moves rows.

use rusqlite::params;
use waflow_core::WaflowError;

use crate::database::Database;
use crate::models::BotConfigRow;

fn row_to_config(row: &rusqlite::Row<'_>) -> Result<BotConfigRow, rusqlite::Error> {
    let raw: String = row.get(1)?;
    let value = serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(BotConfigRow {
        key: row.get(0)?,
        value,
        is_default: row.get(2)?,
        tenant_id: row.get(3)?,
    })
}

/// Insert or update the single default row for a key.
pub async fn seed_default(
    db: &Database,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), WaflowError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bot_config (key, value, is_default, tenant_id)
                 VALUES (?1, ?2, 1, NULL)
                 ON CONFLICT(key) WHERE is_default = 1 DO UPDATE SET
                     value = excluded.value,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write a tenant override row. Never touches the default row.
pub async fn set_override(
    db: &Database,
    tenant_id: &str,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), WaflowError> {
    let tenant_id = tenant_id.to_string();
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bot_config (key, value, is_default, tenant_id)
                 VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(tenant_id, key) WHERE is_default = 0 DO UPDATE SET
                     value = excluded.value,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![key, value, tenant_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a tenant's override row for a key.
///
/// Deleting a non-existent override is a no-op. Returns whether a row was
/// actually removed.
pub async fn reset_override(
    db: &Database,
    tenant_id: &str,
    key: &str,
) -> Result<bool, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM bot_config WHERE tenant_id = ?1 AND key = ?2 AND is_default = 0",
                params![tenant_id, key],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch default and override rows for a set of keys in one query.
pub async fn fetch_rows(
    db: &Database,
    tenant_id: &str,
    keys: &[String],
) -> Result<Vec<BotConfigRow>, WaflowError> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let tenant_id = tenant_id.to_string();
    let keys = keys.to_vec();
    db.connection()
        .call(move |conn| {
            let placeholders = (2..keys.len() + 2)
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT key, value, is_default, tenant_id FROM bot_config
                 WHERE key IN ({placeholders}) AND (is_default = 1 OR tenant_id = ?1)"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut values: Vec<&dyn rusqlite::ToSql> = vec![&tenant_id];
            for key in &keys {
                values.push(key);
            }
            let rows = stmt.query_map(values.as_slice(), |row| row_to_config(row))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch default and override rows for all keys sharing a namespace prefix.
///
/// Used for flow node toggles (`flow:` namespace), where the key set is not
/// known up front.
pub async fn fetch_rows_by_prefix(
    db: &Database,
    tenant_id: &str,
    prefix: &str,
) -> Result<Vec<BotConfigRow>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let pattern = format!("{}%", prefix.replace('%', "\\%"));
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value, is_default, tenant_id FROM bot_config
                 WHERE key LIKE ?2 ESCAPE '\\' AND (is_default = 1 OR tenant_id = ?1)",
            )?;
            let rows = stmt.query_map(params![tenant_id, pattern], |row| row_to_config(row))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn seed_default_is_upsert() {
        let db = Database::open_in_memory().await.unwrap();
        seed_default(&db, "intent_classifier:use_llm", &json!(true))
            .await
            .unwrap();
        seed_default(&db, "intent_classifier:use_llm", &json!(false))
            .await
            .unwrap();

        let rows = fetch_rows(&db, "t1", &["intent_classifier:use_llm".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_default);
        assert_eq!(rows[0].value, json!(false));
    }

    #[tokio::test]
    async fn override_coexists_with_default() {
        let db = Database::open_in_memory().await.unwrap();
        seed_default(&db, "replies:tone", &json!("formal")).await.unwrap();
        set_override(&db, "t1", "replies:tone", &json!("casual"))
            .await
            .unwrap();

        let rows = fetch_rows(&db, "t1", &["replies:tone".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        // Another tenant sees only the default.
        let rows = fetch_rows(&db, "t2", &["replies:tone".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_default);
    }

    #[tokio::test]
    async fn set_override_twice_keeps_one_row() {
        let db = Database::open_in_memory().await.unwrap();
        set_override(&db, "t1", "replies:tone", &json!("casual"))
            .await
            .unwrap();
        set_override(&db, "t1", "replies:tone", &json!("playful"))
            .await
            .unwrap();

        let rows = fetch_rows(&db, "t1", &["replies:tone".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, json!("playful"));
    }

    #[tokio::test]
    async fn reset_override_deletes_only_override() {
        let db = Database::open_in_memory().await.unwrap();
        seed_default(&db, "replies:tone", &json!("formal")).await.unwrap();
        set_override(&db, "t1", "replies:tone", &json!("casual"))
            .await
            .unwrap();

        assert!(reset_override(&db, "t1", "replies:tone").await.unwrap());
        // Second reset is a no-op, not an error.
        assert!(!reset_override(&db, "t1", "replies:tone").await.unwrap());

        let rows = fetch_rows(&db, "t1", &["replies:tone".to_string()])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_default);
    }

    #[tokio::test]
    async fn fetch_by_prefix_scopes_namespace() {
        let db = Database::open_in_memory().await.unwrap();
        seed_default(&db, "flow:intent_classifier", &json!(true))
            .await
            .unwrap();
        seed_default(&db, "flow:context_retrieval", &json!(true))
            .await
            .unwrap();
        seed_default(&db, "replies:tone", &json!("formal")).await.unwrap();

        let rows = fetch_rows_by_prefix(&db, "t1", "flow:").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.key.starts_with("flow:")));
    }

    #[tokio::test]
    async fn fetch_rows_empty_keys_is_empty() {
        let db = Database::open_in_memory().await.unwrap();
        let rows = fetch_rows(&db, "t1", &[]).await.unwrap();
        assert!(rows.is_empty());
    }
}
