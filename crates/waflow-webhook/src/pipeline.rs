// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message processing: dedup gate and record, config resolution,
//! flow run, reply delivery.
//!
//! Runs after the HTTP layer has verified the signature and acknowledged
//! the delivery; nothing here can change the provider-facing status.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use waflow_conversions::{ConversionEmitter, FIRST_TOUCH_EVENT};
use waflow_core::{
    DedupMeta, InboundEnvelope, OutboundMessage, OutboundSender, TenantId, WaflowError,
};
use waflow_dedup::DedupLedger;
use waflow_flow::{builtin, FlowExecutor, RunContext, FALLBACK_REPLY_KEY};
use waflow_storage::models::Card;
use waflow_storage::queries::cards;
use waflow_tenant::TenantResolver;

/// Configuration keys resolved once per run for the built-in handlers.
const RUN_CONFIG_KEYS: &[&str] = &[
    FALLBACK_REPLY_KEY,
    builtin::CONTEXT_SNIPPETS_KEY,
    builtin::GREETING_REPLY_KEY,
    builtin::DEFAULT_REPLY_KEY,
    builtin::UNSUPPORTED_REPLY_KEY,
    builtin::HANDOFF_REPLY_KEY,
];

/// How one envelope was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Already processed; dropped without side effects.
    Duplicate,
    /// Flow ran and a reply was delivered.
    Replied,
    /// Flow ran and produced no reply.
    NoReply,
}

/// End-to-end handling for verified inbound messages.
#[derive(Clone)]
pub struct MessagePipeline {
    resolver: TenantResolver,
    ledger: Arc<DedupLedger>,
    executor: Arc<FlowExecutor>,
    sender: Arc<dyn OutboundSender>,
    emitter: Option<Arc<ConversionEmitter>>,
}

impl MessagePipeline {
    pub fn new(
        resolver: TenantResolver,
        ledger: Arc<DedupLedger>,
        executor: Arc<FlowExecutor>,
        sender: Arc<dyn OutboundSender>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            executor,
            sender,
            emitter: None,
        }
    }

    /// Enable first-touch conversion emission for new contacts.
    pub fn with_emitter(mut self, emitter: Arc<ConversionEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Process one envelope for an active tenant.
    ///
    /// The dedup record is written right after the duplicate check, before
    /// any downstream work, to keep the redelivery race window narrow. A
    /// failed durable write is logged and does not abort the message.
    ///
    /// First-touch conversion emission happens on a spawned task after the
    /// reply is delivered; a slow attribution API never delays the reply.
    pub async fn process(
        &self,
        tenant_id: &TenantId,
        envelope: InboundEnvelope,
    ) -> Result<ProcessOutcome, WaflowError> {
        let message_id = envelope.message_id.clone();
        if self.ledger.check_duplicate(tenant_id, &message_id).await {
            debug!(tenant_id = %tenant_id, message_id = %message_id, "duplicate delivery dropped");
            return Ok(ProcessOutcome::Duplicate);
        }
        let meta = DedupMeta {
            sender: Some(envelope.sender.clone()),
            captured_at: Some(envelope.received_at.clone()),
        };
        if let Err(e) = self.ledger.mark_processed(tenant_id, &message_id, &meta).await {
            error!(tenant_id = %tenant_id, message_id = %message_id, error = %e, "failed to record dedup entry");
        }

        let credentials = self.resolver.resolve_credentials(tenant_id).await?;
        let toggles = self.resolver.node_toggles(tenant_id).await?;
        let plan = self.executor.graph().resolve_plan(&toggles)?;

        let keys: Vec<String> = RUN_CONFIG_KEYS.iter().map(|k| k.to_string()).collect();
        let config = self.resolver.resolve_config_batch(tenant_id, &keys).await?;

        // First contact opens a card. Never fatal to the message itself.
        let new_card = match self.ensure_card(tenant_id, &envelope).await {
            Ok(card) => card,
            Err(e) => {
                warn!(tenant_id = %tenant_id, error = %e, "card bookkeeping failed");
                None
            }
        };

        let recipient = envelope.sender.clone();
        let ctx = RunContext::new(tenant_id.clone(), envelope, config);
        let result = self.executor.run(&plan, ctx).await;

        let outcome = match result.reply {
            Some(body) => {
                let message = OutboundMessage { recipient, body };
                match self.sender.send(&credentials, &message).await {
                    Ok(receipt) => {
                        info!(
                            tenant_id = %tenant_id,
                            message_id = %message_id,
                            provider_message_id = %receipt.provider_message_id,
                            short_circuit = result.short_circuit.is_some(),
                            "reply delivered"
                        );
                        ProcessOutcome::Replied
                    }
                    Err(e) => {
                        error!(tenant_id = %tenant_id, message_id = %message_id, error = %e, "reply delivery failed");
                        ProcessOutcome::NoReply
                    }
                }
            }
            None => ProcessOutcome::NoReply,
        };

        // Fire-and-forget first-touch conversion once the reply is out.
        if let (Some(card), Some(emitter)) = (new_card, &self.emitter) {
            let emitter = emitter.clone();
            let tenant_id = tenant_id.clone();
            tokio::spawn(async move {
                match emitter.emit(&tenant_id, &card, FIRST_TOUCH_EVENT, None).await {
                    Ok(outcome) => {
                        debug!(tenant_id = %tenant_id, card_id = %card.id, ?outcome, "first-touch conversion finished");
                    }
                    Err(e) => {
                        error!(tenant_id = %tenant_id, card_id = %card.id, error = %e, "first-touch conversion failed");
                    }
                }
            });
        }

        Ok(outcome)
    }

    /// Create a card for a contact we have not seen before, carrying the
    /// ads click id when the message arrived through a click-to-chat ad.
    /// Returns the card only when this message opened it.
    async fn ensure_card(
        &self,
        tenant_id: &TenantId,
        envelope: &InboundEnvelope,
    ) -> Result<Option<Card>, WaflowError> {
        let db = self.resolver.database();
        if cards::find_card_by_contact(db, &tenant_id.0, &envelope.sender)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let click_id = envelope
            .raw
            .pointer("/referral/ctwa_clid")
            .and_then(Value::as_str)
            .map(str::to_string);
        let card = Card {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.0.clone(),
            contact: envelope.sender.clone(),
            stage: "new".to_string(),
            click_id,
            first_conversion_sent: false,
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        };
        cards::insert_card(db, &card).await?;
        info!(tenant_id = %tenant_id, card_id = %card.id, has_click_id = card.click_id.is_some(), "card opened for new contact");
        Ok(Some(card))
    }
}
