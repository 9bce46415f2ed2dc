// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in node handlers for the default graph.
//!
//! All handlers are deterministic and local: intent classification uses
//! zero-cost heuristic rules over the message text, context retrieval
//! selects tenant-configured snippets by keyword overlap, and reply
//! composition fills templates from tenant configuration. No network,
//! no latency.

use async_trait::async_trait;
use serde_json::{json, Value};
use waflow_core::{ContentKind, WaflowError};

use crate::node::{NodeHandler, NodeOutcome, RunContext};

/// Configuration key holding the snippet list for context retrieval.
pub const CONTEXT_SNIPPETS_KEY: &str = "context:snippets";
/// Configuration key for the greeting reply template.
pub const GREETING_REPLY_KEY: &str = "replies:greeting";
/// Configuration key for the default reply template.
pub const DEFAULT_REPLY_KEY: &str = "replies:default";
/// Configuration key for the non-text media reply.
pub const UNSUPPORTED_REPLY_KEY: &str = "replies:unsupported";
/// Configuration key for the human-handoff acknowledgement.
pub const HANDOFF_REPLY_KEY: &str = "replies:handoff";

const DEFAULT_GREETING: &str = "Hi! How can we help you today?";
const DEFAULT_REPLY: &str = "Thanks for reaching out! We'll get back to you shortly.";
const DEFAULT_UNSUPPORTED: &str =
    "We can only read text messages here for now. Could you type that out?";
const DEFAULT_HANDOFF: &str = "Got it, connecting you with a teammate.";

/// Greeting patterns (exact match, case-insensitive).
const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "hola", "oi", "ola", "olá", "bom dia", "boa tarde", "boa noite",
    "good morning", "good afternoon", "good evening",
];

/// Handoff request patterns (contains, case-insensitive).
const HANDOFF_INDICATORS: &[&str] = &[
    "human", "real person", "speak to someone", "talk to an agent", "atendente",
    "falar com uma pessoa", "quero falar com alguem", "quero falar com alguém",
];

/// Normalizes the raw envelope into the shape downstream nodes read.
pub struct NormalizeHandler;

#[async_trait]
impl NodeHandler for NormalizeHandler {
    async fn run(&self, ctx: &RunContext) -> Result<NodeOutcome, WaflowError> {
        let text = ctx
            .envelope
            .text
            .as_deref()
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        Ok(NodeOutcome::Continue(json!({
            "text": text,
            "kind": ctx.envelope.kind.to_string(),
            "sender": ctx.envelope.sender,
        })))
    }
}

/// Heuristic intent classification. A detected handoff request ends the
/// run early with an acknowledgement reply.
pub struct IntentClassifierHandler;

#[async_trait]
impl NodeHandler for IntentClassifierHandler {
    async fn run(&self, ctx: &RunContext) -> Result<NodeOutcome, WaflowError> {
        let text = normalized_text(ctx);
        let lower = text.to_lowercase();

        if HANDOFF_INDICATORS.iter().any(|p| lower.contains(p)) {
            let reply = ctx
                .config_str(HANDOFF_REPLY_KEY)
                .unwrap_or(DEFAULT_HANDOFF)
                .to_string();
            return Ok(NodeOutcome::ShortCircuit {
                reason: "handoff requested".into(),
                reply: Some(reply),
            });
        }

        let intent = if lower.is_empty() {
            "empty"
        } else if GREETINGS.iter().any(|g| lower == *g) {
            "greeting"
        } else if lower.contains('?') || lower.split_whitespace().count() >= 4 {
            "question"
        } else {
            "other"
        };
        Ok(NodeOutcome::Continue(json!({ "intent": intent })))
    }
}

/// Selects configured knowledge snippets that share a keyword with the
/// message. Produces an empty list when nothing matches or nothing is
/// configured.
pub struct ContextRetrievalHandler;

#[async_trait]
impl NodeHandler for ContextRetrievalHandler {
    async fn run(&self, ctx: &RunContext) -> Result<NodeOutcome, WaflowError> {
        let text = normalized_text(ctx).to_lowercase();
        let words: Vec<&str> = text.split_whitespace().filter(|w| w.len() >= 4).collect();

        let snippets = ctx
            .config
            .get(CONTEXT_SNIPPETS_KEY)
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .filter(|s| {
                        let lower = s.to_lowercase();
                        words.iter().any(|w| lower.contains(w))
                    })
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(NodeOutcome::Continue(json!({ "snippets": snippets })))
    }
}

/// Fills the reply template matching the classified intent.
pub struct ComposeReplyHandler;

#[async_trait]
impl NodeHandler for ComposeReplyHandler {
    async fn run(&self, ctx: &RunContext) -> Result<NodeOutcome, WaflowError> {
        if ctx.envelope.kind != ContentKind::Text {
            let reply = ctx
                .config_str(UNSUPPORTED_REPLY_KEY)
                .unwrap_or(DEFAULT_UNSUPPORTED);
            return Ok(NodeOutcome::Continue(json!(reply)));
        }

        let intent = ctx
            .output("intent_classifier")
            .and_then(|v| v.get("intent"))
            .and_then(Value::as_str)
            .unwrap_or("other");

        if intent == "greeting" {
            let reply = ctx.config_str(GREETING_REPLY_KEY).unwrap_or(DEFAULT_GREETING);
            return Ok(NodeOutcome::Continue(json!(reply)));
        }

        let snippet = ctx
            .output("context_retrieval")
            .and_then(|v| v.get("snippets"))
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(Value::as_str);

        let reply = match snippet {
            Some(snippet) => snippet.to_string(),
            None => ctx
                .config_str(DEFAULT_REPLY_KEY)
                .unwrap_or(DEFAULT_REPLY)
                .to_string(),
        };
        Ok(NodeOutcome::Continue(json!(reply)))
    }
}

fn normalized_text(ctx: &RunContext) -> String {
    ctx.output("normalize")
        .and_then(|v| v.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| ctx.envelope.text.clone())
        .unwrap_or_default()
}
