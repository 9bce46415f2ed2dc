// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook request handlers.
//!
//! The delivery endpoint acknowledges with 200 once the signature
//! passes, no matter what the pipeline does afterwards; redeliveries
//! are absorbed by the dedup ledger, not by HTTP status codes.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error, warn};
use waflow_core::{TenantId, WaflowError};

use crate::payload::parse_envelopes;
use crate::server::WebhookState;
use crate::verify::{verify_signature, verify_subscribe};

/// Fixed acknowledgment body for verified deliveries.
pub const ACK_BODY: &str = "EVENT_RECEIVED";

/// Delivery signature header.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Deserialize)]
pub struct HandshakeParams {
    mode: String,
    verify_token: String,
    challenge: String,
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /webhook/{tenant_id}`: setup handshake.
pub async fn handshake(
    State(state): State<WebhookState>,
    Path(tenant_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<HandshakeParams>,
) -> Response {
    if !state.limiter.allow(addr.ip()) {
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    let tenant_id = TenantId(tenant_id);
    if let Err(e) = state.resolver.require_active(&tenant_id).await {
        return reject(&tenant_id, "handshake", e);
    }
    let credentials = match state.resolver.resolve_credentials(&tenant_id).await {
        Ok(credentials) => credentials,
        Err(e) => return reject(&tenant_id, "handshake", e),
    };

    match verify_subscribe(
        &credentials.verify_token,
        &params.mode,
        &params.verify_token,
        &params.challenge,
    ) {
        Ok(challenge) => {
            debug!(tenant_id = %tenant_id, "handshake verified");
            (StatusCode::OK, challenge).into_response()
        }
        Err(e) => reject(&tenant_id, "handshake", e),
    }
}

/// `POST /webhook/{tenant_id}`: message delivery.
///
/// The body arrives as raw bytes and is hashed before any parsing.
pub async fn delivery(
    State(state): State<WebhookState>,
    Path(tenant_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.limiter.allow(addr.ip()) {
        return (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response();
    }

    let tenant_id = TenantId(tenant_id);
    if let Err(e) = state.resolver.require_active(&tenant_id).await {
        return reject(&tenant_id, "delivery", e);
    }
    let credentials = match state.resolver.resolve_credentials(&tenant_id).await {
        Ok(credentials) => credentials,
        Err(e) => return reject(&tenant_id, "delivery", e),
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if let Err(e) = verify_signature(&credentials.app_secret, &body, signature) {
        return reject(&tenant_id, "delivery", e);
    }

    // Signature passed: the provider gets its acknowledgment regardless
    // of what happens from here on.
    match serde_json::from_slice::<serde_json::Value>(&body) {
        Ok(payload) => {
            for envelope in parse_envelopes(&payload) {
                let message_id = envelope.message_id.clone();
                match state.pipeline.process(&tenant_id, envelope).await {
                    Ok(outcome) => {
                        debug!(tenant_id = %tenant_id, message_id = %message_id, ?outcome, "message handled");
                    }
                    Err(e) => {
                        error!(tenant_id = %tenant_id, message_id = %message_id, error = %e, "pipeline failed");
                    }
                }
            }
        }
        Err(e) => {
            warn!(tenant_id = %tenant_id, error = %e, "verified delivery body is not valid JSON");
        }
    }

    (StatusCode::OK, ACK_BODY).into_response()
}

/// Map an internal failure to the generic external response, keeping
/// detail in the logs only.
fn reject(tenant_id: &TenantId, endpoint: &str, error: WaflowError) -> Response {
    let status = match &error {
        WaflowError::TenantNotFound { .. } => StatusCode::NOT_FOUND,
        WaflowError::TenantInactive { .. }
        | WaflowError::CredentialsNotConfigured { .. }
        | WaflowError::Auth(_) => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(tenant_id = %tenant_id, endpoint, error = %error, status = %status, "request rejected");
    let body = match status {
        StatusCode::NOT_FOUND => "Not Found",
        StatusCode::FORBIDDEN => "Forbidden",
        _ => "Internal Server Error",
    };
    (status, body).into_response()
}
