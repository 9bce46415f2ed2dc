// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRM card rows, limited to what the ingestion core needs: the attribution
//! click id and the first-touch suppression flag.

use rusqlite::params;
use waflow_core::WaflowError;

use crate::database::Database;
use crate::models::Card;

fn row_to_card(row: &rusqlite::Row<'_>) -> Result<Card, rusqlite::Error> {
    Ok(Card {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact: row.get(2)?,
        stage: row.get(3)?,
        click_id: row.get(4)?,
        first_conversion_sent: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a card.
pub async fn insert_card(db: &Database, card: &Card) -> Result<(), WaflowError> {
    let card = card.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO cards
                     (id, tenant_id, contact, stage, click_id, first_conversion_sent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    card.id,
                    card.tenant_id,
                    card.contact,
                    card.stage,
                    card.click_id,
                    card.first_conversion_sent,
                    card.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a card by id.
pub async fn get_card(db: &Database, id: &str) -> Result<Option<Card>, WaflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, tenant_id, contact, stage, click_id, first_conversion_sent, created_at
                 FROM cards WHERE id = ?1",
                params![id],
                |row| row_to_card(row),
            );
            match result {
                Ok(card) => Ok(Some(card)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the card for a tenant's contact, if one exists.
pub async fn find_card_by_contact(
    db: &Database,
    tenant_id: &str,
    contact: &str,
) -> Result<Option<Card>, WaflowError> {
    let tenant_id = tenant_id.to_string();
    let contact = contact.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, tenant_id, contact, stage, click_id, first_conversion_sent, created_at
                 FROM cards WHERE tenant_id = ?1 AND contact = ?2",
                params![tenant_id, contact],
                |row| row_to_card(row),
            );
            match result {
                Ok(card) => Ok(Some(card)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the first-touch suppression flag after the first successful
/// conversion send for the card.
pub async fn mark_first_conversion_sent(db: &Database, id: &str) -> Result<(), WaflowError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE cards SET first_conversion_sent = 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
