// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud API outbound sender.
//!
//! Text messages only. Credentials come from the tenant's bundle per
//! call; the client itself is shared.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use waflow_core::{CredentialBundle, OutboundMessage, OutboundSender, SendReceipt, WaflowError};

#[derive(Serialize)]
struct SendRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    text: TextBody<'a>,
}

#[derive(Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

/// Sends replies through the provider's messages endpoint.
#[derive(Clone)]
pub struct CloudApiSender {
    client: reqwest::Client,
    base_url: String,
}

impl CloudApiSender {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, WaflowError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WaflowError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl OutboundSender for CloudApiSender {
    async fn send(
        &self,
        credentials: &CredentialBundle,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, WaflowError> {
        let url = format!("{}/{}/messages", self.base_url, credentials.phone_number_id);
        let request = SendRequest {
            messaging_product: "whatsapp",
            to: &message.recipient,
            kind: "text",
            text: TextBody {
                body: &message.body,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&credentials.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| WaflowError::Channel {
                message: format!("send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(WaflowError::Channel {
                message: format!("send API returned {status}: {body}"),
                source: None,
            });
        }

        let provider_message_id = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/messages/0/id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_default();
        debug!(recipient = %message.recipient, provider_message_id = %provider_message_id, "message sent");
        Ok(SendReceipt {
            provider_message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bundle() -> CredentialBundle {
        CredentialBundle {
            access_token: "tok".into(),
            verify_token: "verify".into(),
            app_secret: "secret".into(),
            phone_number_id: "1555000".into(),
        }
    }

    #[tokio::test]
    async fn sends_text_message_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1555000/messages"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "messaging_product": "whatsapp",
                "to": "+5511999990000",
                "type": "text",
                "text": { "body": "hi there" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"messages": [{"id": "wamid.out"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sender = CloudApiSender::new(server.uri(), Duration::from_secs(5)).unwrap();
        let receipt = sender
            .send(
                &bundle(),
                &OutboundMessage {
                    recipient: "+5511999990000".into(),
                    body: "hi there".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.provider_message_id, "wamid.out");
    }

    #[tokio::test]
    async fn api_error_is_a_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let sender = CloudApiSender::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = sender
            .send(
                &bundle(),
                &OutboundMessage {
                    recipient: "+5511999990000".into(),
                    body: "hi".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WaflowError::Channel { .. }));
    }
}
