// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion event audit log.
//!
//! Rows are written in `pending` status before the external attribution call
//! and transitioned to exactly one terminal state afterwards.

use std::str::FromStr;

use rusqlite::params;
use waflow_core::WaflowError;

use crate::database::Database;
use crate::models::{ConversionEvent, EventStatus};

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<ConversionEvent, rusqlite::Error> {
    let raw: String = row.get(4)?;
    let status = EventStatus::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ConversionEvent {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        card_id: row.get(2)?,
        event_name: row.get(3)?,
        status,
        detail: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert an audit row.
pub async fn insert_event(db: &Database, event: &ConversionEvent) -> Result<(), WaflowError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversion_events
                     (id, tenant_id, card_id, event_name, status, detail, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event.id,
                    event.tenant_id,
                    event.card_id,
                    event.event_name,
                    event.status.to_string(),
                    event.detail,
                    event.created_at,
                    event.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Transition an audit row to a terminal status with the raw provider
/// response or error detail.
pub async fn update_status(
    db: &Database,
    id: &str,
    status: EventStatus,
    detail: Option<&str>,
) -> Result<(), WaflowError> {
    let id = id.to_string();
    let status = status.to_string();
    let detail = detail.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversion_events
                 SET status = ?1, detail = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, detail, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an audit row by event id.
pub async fn get_event(db: &Database, id: &str) -> Result<Option<ConversionEvent>, WaflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, tenant_id, card_id, event_name, status, detail, created_at, updated_at
                 FROM conversion_events WHERE id = ?1",
                params![id],
                |row| row_to_event(row),
            );
            match result {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List audit rows for a card, oldest first.
pub async fn list_events_for_card(
    db: &Database,
    card_id: &str,
) -> Result<Vec<ConversionEvent>, WaflowError> {
    let card_id = card_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, card_id, event_name, status, detail, created_at, updated_at
                 FROM conversion_events WHERE card_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![card_id], |row| row_to_event(row))?;
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

    fn make_event(id: &str) -> ConversionEvent {
        ConversionEvent {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            card_id: "c1".to_string(),
            event_name: "Lead".to_string(),
            status: EventStatus::Pending,
            detail: None,
            created_at: "2026-01-02T10:00:00.000Z".to_string(),
            updated_at: "2026-01-02T10:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn pending_then_success_transition() {
        let db = Database::open_in_memory().await.unwrap();
        insert_event(&db, &make_event("ev1")).await.unwrap();

        let pending = get_event(&db, "ev1").await.unwrap().unwrap();
        assert_eq!(pending.status, EventStatus::Pending);

        update_status(&db, "ev1", EventStatus::Success, Some(r#"{"events_received":1}"#))
            .await
            .unwrap();
        let done = get_event(&db, "ev1").await.unwrap().unwrap();
        assert_eq!(done.status, EventStatus::Success);
        assert!(done.detail.unwrap().contains("events_received"));
    }

    #[tokio::test]
    async fn list_for_card_orders_by_creation() {
        let db = Database::open_in_memory().await.unwrap();
        let mut first = make_event("ev1");
        first.created_at = "2026-01-02T10:00:00.000Z".into();
        let mut second = make_event("ev2");
        second.created_at = "2026-01-02T11:00:00.000Z".into();
        second.event_name = "Qualified".into();

        insert_event(&db, &second).await.unwrap();
        insert_event(&db, &first).await.unwrap();

        let events = list_events_for_card(&db, "c1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "ev1");
        assert_eq!(events[1].id, "ev2");
    }

    #[tokio::test]
    async fn skipped_is_a_terminal_state() {
        let db = Database::open_in_memory().await.unwrap();
        insert_event(&db, &make_event("ev1")).await.unwrap();
        update_status(&db, "ev1", EventStatus::Skipped, Some("attribution not configured"))
            .await
            .unwrap();
        let event = get_event(&db, "ev1").await.unwrap().unwrap();
        assert_eq!(event.status, EventStatus::Skipped);
    }
}
