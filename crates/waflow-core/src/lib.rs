// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Waflow ingestion platform.
//!
//! This crate provides the foundational error type, identifier newtypes,
//! message envelope types, and the trait seams the pipeline crates implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::WaflowError;
pub use traits::{DedupBackend, DedupMeta, OutboundSender};
pub use types::{
    ContentKind, CredentialBundle, InboundEnvelope, MessageId, OutboundMessage, SendReceipt,
    TenantId, TenantStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = WaflowError::Config("bad".into());
        let _storage = WaflowError::Storage {
            source: Box::new(std::io::Error::other("io")),
        };
        let _auth = WaflowError::Auth("bad signature".into());
        let _inactive = WaflowError::TenantInactive {
            tenant_id: "t1".into(),
            status: "suspended".into(),
        };
        let _missing = WaflowError::TenantNotFound {
            tenant_id: "t1".into(),
        };
        let _creds = WaflowError::CredentialsNotConfigured {
            tenant_id: "t1".into(),
        };
        let _graph = WaflowError::Graph("cycle".into());
        let _channel = WaflowError::Channel {
            message: "send failed".into(),
            source: None,
        };
        let _emitter = WaflowError::Emitter {
            message: "api error".into(),
            source: None,
        };
        let _timeout = WaflowError::Timeout {
            duration: std::time::Duration::from_secs(10),
        };
        let _internal = WaflowError::Internal("unexpected".into());
    }

    #[test]
    fn auth_error_message_carries_no_status_detail_marker() {
        let err = WaflowError::Auth("signature mismatch".into());
        assert_eq!(err.to_string(), "authentication failed: signature mismatch");
    }

    #[test]
    fn ids_display_as_inner_string() {
        assert_eq!(TenantId("t-42".into()).to_string(), "t-42");
        assert_eq!(MessageId("wamid.X".into()).to_string(), "wamid.X");
    }
}
