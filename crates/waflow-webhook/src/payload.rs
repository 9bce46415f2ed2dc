// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider delivery payload parsing.
//!
//! Runs only after signature verification; the raw bytes are hashed
//! first, parsed second. One delivery can batch several messages across
//! entries and changes. Entries the parser cannot make sense of are
//! skipped with a log line rather than failing the whole delivery.

use std::str::FromStr;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;
use waflow_core::{ContentKind, InboundEnvelope, MessageId};

/// Extract message envelopes from a verified delivery payload.
pub fn parse_envelopes(payload: &Value) -> Vec<InboundEnvelope> {
    let received_at = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let mut envelopes = Vec::new();

    let entries = payload.get("entry").and_then(Value::as_array);
    let Some(entries) = entries else {
        warn!("delivery payload has no entry array");
        return envelopes;
    };

    for entry in entries {
        let changes = entry.get("changes").and_then(Value::as_array);
        for change in changes.into_iter().flatten() {
            let messages = change
                .pointer("/value/messages")
                .and_then(Value::as_array);
            for message in messages.into_iter().flatten() {
                match parse_message(message, &received_at) {
                    Some(envelope) => envelopes.push(envelope),
                    None => warn!("skipping message entry without id or sender"),
                }
            }
        }
    }
    envelopes
}

fn parse_message(message: &Value, received_at: &str) -> Option<InboundEnvelope> {
    let id = message.get("id").and_then(Value::as_str)?;
    let sender = message.get("from").and_then(Value::as_str)?;
    let kind = message
        .get("type")
        .and_then(Value::as_str)
        .map(|t| ContentKind::from_str(t).unwrap_or(ContentKind::Unknown))
        .unwrap_or(ContentKind::Unknown);
    let text = message
        .pointer("/text/body")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(InboundEnvelope {
        message_id: MessageId(id.to_string()),
        sender: sender.to_string(),
        kind,
        text,
        raw: message.clone(),
        received_at: received_at.to_string(),
    })
}
