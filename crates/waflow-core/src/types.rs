// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Waflow ingestion pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a tenant (a customer account owning one WhatsApp number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provider-assigned identifier for an inbound message. Used as the
/// idempotency key; the provider may redeliver the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Activation status of a tenant. Processing requires `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Disabled,
}

/// Content kind of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Audio,
    Image,
    Document,
    Interactive,
    Unknown,
}

/// One inbound message as delivered by the provider webhook.
///
/// Constructed once per delivery. The same `message_id` may arrive again on a
/// provider retry; the dedup ledger exists to absorb that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    /// Provider-assigned message identifier (idempotency key).
    pub message_id: MessageId,
    /// Sender address (phone number in international format).
    pub sender: String,
    /// Content kind declared by the provider.
    pub kind: ContentKind,
    /// Text body, when the message carries one.
    pub text: Option<String>,
    /// Raw provider payload for the message entry.
    pub raw: serde_json::Value,
    /// ISO 8601 arrival timestamp (assigned at ingestion).
    pub received_at: String,
}

/// An outbound message handed to the send collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Recipient address (phone number in international format).
    pub recipient: String,
    /// Message body text.
    pub body: String,
}

/// Opaque provider acknowledgment for a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-assigned identifier of the outbound message.
    pub provider_message_id: String,
}

/// Per-tenant messaging credentials.
///
/// `verify_token` is used only for the one-time setup handshake;
/// `app_secret` signs every delivered payload. Never logged in full.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialBundle {
    /// Bearer token for the provider's send API.
    pub access_token: String,
    /// Shared token for the setup handshake.
    pub verify_token: String,
    /// HMAC signing secret for delivery validation.
    pub app_secret: String,
    /// Provider channel identifier (phone number id).
    pub phone_number_id: String,
}

impl CredentialBundle {
    /// Bounded-length preview of a secret for diagnostics. Never the full value.
    pub fn preview(secret: &str) -> String {
        let head: String = secret.chars().take(6).collect();
        format!("{head}…")
    }
}

impl std::fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_token", &Self::preview(&self.access_token))
            .field("verify_token", &"[redacted]")
            .field("app_secret", &"[redacted]")
            .field("phone_number_id", &self.phone_number_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_status_round_trips() {
        use std::str::FromStr;
        for status in [
            TenantStatus::Active,
            TenantStatus::Suspended,
            TenantStatus::Disabled,
        ] {
            let s = status.to_string();
            assert_eq!(TenantStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(TenantStatus::Active.to_string(), "active");
    }

    #[test]
    fn credential_debug_redacts_secrets() {
        let bundle = CredentialBundle {
            access_token: "EAAGtoken-very-long".into(),
            verify_token: "verify-secret".into(),
            app_secret: "app-secret-value".into(),
            phone_number_id: "1555000".into(),
        };
        let debug = format!("{bundle:?}");
        assert!(!debug.contains("verify-secret"));
        assert!(!debug.contains("app-secret-value"));
        assert!(!debug.contains("EAAGtoken-very-long"));
        assert!(debug.contains("1555000"));
    }

    #[test]
    fn preview_is_bounded() {
        assert_eq!(CredentialBundle::preview("abcdefghij"), "abcdef…");
        assert_eq!(CredentialBundle::preview("ab"), "ab…");
    }
}
