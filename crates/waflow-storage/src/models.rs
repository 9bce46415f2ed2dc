// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use waflow_core::types::TenantStatus;

/// One tenant row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub status: TenantStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// One configuration row: either the single default for a key
/// (`is_default = true`, `tenant_id = None`) or a tenant override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfigRow {
    pub key: String,
    pub value: serde_json::Value,
    pub is_default: bool,
    pub tenant_id: Option<String>,
}

/// A minimal CRM card, carried here only for the columns the ingestion core
/// touches: attribution click id and the first-touch suppression flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub tenant_id: String,
    pub contact: String,
    pub stage: String,
    pub click_id: Option<String>,
    pub first_conversion_sent: bool,
    pub created_at: String,
}

/// Per-tenant attribution API settings. Absence means "not configured",
/// which the emitter treats as a skip, not an error.
#[derive(Clone, Serialize, Deserialize)]
pub struct AttributionSettings {
    pub tenant_id: String,
    pub dataset_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for AttributionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributionSettings")
            .field("tenant_id", &self.tenant_id)
            .field("dataset_id", &self.dataset_id)
            .field("api_token", &"[redacted]")
            .finish()
    }
}

/// Terminal and pending states of a conversion event audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Success,
    Error,
    Skipped,
}

/// One conversion event audit row.
///
/// Immutable once written except for the status transition away from
/// `pending` and the accompanying detail payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionEvent {
    /// Generated event identifier, also sent to the attribution API for its
    /// own provider-side deduplication.
    pub id: String,
    pub tenant_id: String,
    pub card_id: String,
    pub event_name: String,
    pub status: EventStatus,
    /// Raw provider response, error message, or skip reason.
    pub detail: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_status_round_trips() {
        use std::str::FromStr;
        for status in [
            EventStatus::Pending,
            EventStatus::Success,
            EventStatus::Error,
            EventStatus::Skipped,
        ] {
            let s = status.to_string();
            assert_eq!(EventStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(EventStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn attribution_debug_redacts_token() {
        let settings = AttributionSettings {
            tenant_id: "t1".into(),
            dataset_id: "ds-1".into(),
            api_token: "super-secret".into(),
        };
        let debug = format!("{settings:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("ds-1"));
    }
}
