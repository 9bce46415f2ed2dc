// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound send collaborator trait.

use async_trait::async_trait;

use crate::error::WaflowError;
use crate::types::{CredentialBundle, OutboundMessage, SendReceipt};

/// Sends an outbound message through the provider channel.
///
/// The flow executor's final node hands off here and expects an opaque
/// provider message identifier back. Rich message formatting lives behind
/// this seam, outside the ingestion core.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Sends `msg` using the tenant's credentials.
    async fn send(
        &self,
        credentials: &CredentialBundle,
        msg: &OutboundMessage,
    ) -> Result<SendReceipt, WaflowError>;
}
