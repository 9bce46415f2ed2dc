// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion event emitter for the ads attribution API.
//!
//! Every emission attempt leaves an audit row: skips are recorded with a
//! reason, sends start as `pending` and end in exactly one terminal
//! state. Audit failures never block the attribution call itself.

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;
use waflow_core::{TenantId, WaflowError};
use waflow_storage::models::{Card, ConversionEvent, EventStatus};
use waflow_storage::queries::{cards, conversions, tenants};
use waflow_storage::Database;

/// Event name whose duplicates are suppressed per card after the first
/// successful send.
pub const FIRST_TOUCH_EVENT: &str = "Lead";

/// Outcome of one emission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitOutcome {
    /// Event accepted by the attribution API.
    Sent { event_id: String },
    /// Event intentionally not sent.
    Skipped { reason: &'static str },
}

#[derive(Serialize)]
struct EventPayload<'a> {
    data: [EventEntry<'a>; 1],
}

#[derive(Serialize)]
struct EventEntry<'a> {
    event_name: &'a str,
    event_time: i64,
    event_id: &'a str,
    action_source: &'a str,
    user_data: UserData<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_data: Option<&'a Value>,
}

#[derive(Serialize)]
struct UserData<'a> {
    click_id: &'a str,
}

/// Sends conversion events and keeps the audit log.
#[derive(Clone)]
pub struct ConversionEmitter {
    db: Database,
    client: reqwest::Client,
    base_url: String,
}

impl ConversionEmitter {
    pub fn new(db: Database, base_url: String, timeout: Duration) -> Result<Self, WaflowError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WaflowError::Emitter {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            db,
            client,
            base_url,
        })
    }

    /// Emit a conversion event for a card.
    ///
    /// Skips (with an audit row) when the tenant has no attribution
    /// settings, the card carries no click id, or the first-touch event
    /// was already sent for this card. A fresh event id is generated per
    /// attempt; retried attempts are new events to the provider.
    /// `custom_data` is forwarded verbatim as the event's custom payload
    /// when present.
    pub async fn emit(
        &self,
        tenant_id: &TenantId,
        card: &Card,
        event_name: &str,
        custom_data: Option<Value>,
    ) -> Result<EmitOutcome, WaflowError> {
        let settings = tenants::get_attribution(&self.db, &tenant_id.0).await?;
        let Some(settings) = settings else {
            return self
                .skip(tenant_id, card, event_name, "attribution not configured")
                .await;
        };
        let Some(click_id) = card.click_id.as_deref() else {
            return self.skip(tenant_id, card, event_name, "no click id").await;
        };
        if event_name == FIRST_TOUCH_EVENT && card.first_conversion_sent {
            return self
                .skip(tenant_id, card, event_name, "first conversion already sent")
                .await;
        }

        let event_id = Uuid::new_v4().to_string();
        self.audit(tenant_id, card, event_name, &event_id, EventStatus::Pending, None)
            .await;

        let payload = EventPayload {
            data: [EventEntry {
                event_name,
                event_time: Utc::now().timestamp(),
                event_id: &event_id,
                action_source: "chat",
                user_data: UserData { click_id },
                custom_data: custom_data.as_ref(),
            }],
        };
        let url = format!("{}/{}/events", self.base_url, settings.dataset_id);

        match self.post_event(&url, &settings.api_token, &payload).await {
            Ok(body) => {
                self.finish(&event_id, EventStatus::Success, Some(&body)).await;
                if event_name == FIRST_TOUCH_EVENT {
                    if let Err(e) = cards::mark_first_conversion_sent(&self.db, &card.id).await {
                        warn!(card_id = %card.id, error = %e, "failed to set first-conversion flag");
                    }
                }
                info!(tenant_id = %tenant_id, card_id = %card.id, event = event_name, "conversion event sent");
                Ok(EmitOutcome::Sent { event_id })
            }
            Err(e) => {
                self.finish(&event_id, EventStatus::Error, Some(&e.to_string())).await;
                Err(e)
            }
        }
    }

    /// One attempt plus a single retry on transient statuses.
    async fn post_event(
        &self,
        url: &str,
        api_token: &str,
        payload: &EventPayload<'_>,
    ) -> Result<String, WaflowError> {
        let mut last_error = None;
        for attempt in 0..=1u32 {
            if attempt > 0 {
                warn!(attempt, "retrying conversion send after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            let response = self
                .client
                .post(url)
                .query(&[("access_token", api_token)])
                .json(payload)
                .send()
                .await
                .map_err(|e| WaflowError::Emitter {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "attribution response received");
            let body = response.text().await.unwrap_or_default();

            if status.is_success() {
                return Ok(body);
            }
            let error = WaflowError::Emitter {
                message: format!("attribution API returned {status}: {body}"),
                source: None,
            };
            if is_transient_error(status) && attempt == 0 {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }
        Err(last_error.unwrap_or_else(|| WaflowError::Emitter {
            message: "conversion send failed after retry".into(),
            source: None,
        }))
    }

    async fn skip(
        &self,
        tenant_id: &TenantId,
        card: &Card,
        event_name: &str,
        reason: &'static str,
    ) -> Result<EmitOutcome, WaflowError> {
        debug!(tenant_id = %tenant_id, card_id = %card.id, event = event_name, reason, "conversion skipped");
        let event_id = Uuid::new_v4().to_string();
        self.audit(
            tenant_id,
            card,
            event_name,
            &event_id,
            EventStatus::Skipped,
            Some(reason),
        )
        .await;
        Ok(EmitOutcome::Skipped { reason })
    }

    async fn audit(
        &self,
        tenant_id: &TenantId,
        card: &Card,
        event_name: &str,
        event_id: &str,
        status: EventStatus,
        detail: Option<&str>,
    ) {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        let event = ConversionEvent {
            id: event_id.to_string(),
            tenant_id: tenant_id.0.clone(),
            card_id: card.id.clone(),
            event_name: event_name.to_string(),
            status,
            detail: detail.map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        };
        if let Err(e) = conversions::insert_event(&self.db, &event).await {
            warn!(event_id, error = %e, "failed to write audit row");
        }
    }

    async fn finish(&self, event_id: &str, status: EventStatus, detail: Option<&str>) {
        if let Err(e) = conversions::update_status(&self.db, event_id, status, detail).await {
            warn!(event_id, error = %e, "failed to update audit row");
        }
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waflow_core::TenantStatus;
    use waflow_storage::models::{AttributionSettings, Tenant};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tid() -> TenantId {
        TenantId("t1".into())
    }

    async fn seeded_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        tenants::upsert_tenant(
            &db,
            &Tenant {
                id: "t1".into(),
                name: "tenant one".into(),
                status: TenantStatus::Active,
                created_at: "2026-01-01T00:00:00.000Z".into(),
                updated_at: "2026-01-01T00:00:00.000Z".into(),
            },
        )
        .await
        .unwrap();
        db
    }

    async fn with_attribution(db: &Database) {
        tenants::upsert_attribution(
            db,
            &AttributionSettings {
                tenant_id: "t1".into(),
                dataset_id: "ds-9".into(),
                api_token: "attr-token".into(),
            },
        )
        .await
        .unwrap();
    }

    fn make_card(click_id: Option<&str>) -> Card {
        Card {
            id: "c1".into(),
            tenant_id: "t1".into(),
            contact: "+5511999990000".into(),
            stage: "new".into(),
            click_id: click_id.map(str::to_string),
            first_conversion_sent: false,
            created_at: "2026-01-02T10:00:00.000Z".into(),
        }
    }

    fn emitter(db: Database, base_url: &str) -> ConversionEmitter {
        ConversionEmitter::new(db, base_url.to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn successful_send_audits_and_sets_first_touch_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ds-9/events"))
            .and(query_param("access_token", "attr-token"))
            .and(body_partial_json(json!({
                "data": [{
                    "event_name": "Lead",
                    "action_source": "chat",
                    "user_data": { "click_id": "fbclid-abc" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let db = seeded_db().await;
        with_attribution(&db).await;
        let card = make_card(Some("fbclid-abc"));
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db.clone(), &server.uri())
            .emit(&tid(), &card, "Lead", None)
            .await
            .unwrap();
        let EmitOutcome::Sent { event_id } = outcome else {
            panic!("expected Sent outcome");
        };

        let audit = conversions::get_event(&db, &event_id).await.unwrap().unwrap();
        assert_eq!(audit.status, EventStatus::Success);
        assert!(audit.detail.unwrap().contains("events_received"));

        let card = cards::get_card(&db, "c1").await.unwrap().unwrap();
        assert!(card.first_conversion_sent);
    }

    #[tokio::test]
    async fn custom_data_is_forwarded_in_the_event_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ds-9/events"))
            .and(body_partial_json(json!({
                "data": [{
                    "event_name": "Qualified",
                    "custom_data": { "value": 50, "currency": "BRL" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let db = seeded_db().await;
        with_attribution(&db).await;
        let card = make_card(Some("fbclid-abc"));
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db, &server.uri())
            .emit(
                &tid(),
                &card,
                "Qualified",
                Some(json!({ "value": 50, "currency": "BRL" })),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, EmitOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn api_error_leaves_error_audit_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad dataset"))
            .mount(&server)
            .await;

        let db = seeded_db().await;
        with_attribution(&db).await;
        let card = make_card(Some("fbclid-abc"));
        cards::insert_card(&db, &card).await.unwrap();

        let err = emitter(db.clone(), &server.uri())
            .emit(&tid(), &card, "Lead", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("400"));

        let events = conversions::list_events_for_card(&db, "c1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, EventStatus::Error);

        // Failure must not set the suppression flag.
        let card = cards::get_card(&db, "c1").await.unwrap().unwrap();
        assert!(!card.first_conversion_sent);
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events_received": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let db = seeded_db().await;
        with_attribution(&db).await;
        let card = make_card(Some("fbclid-abc"));
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db, &server.uri())
            .emit(&tid(), &card, "Qualified", None)
            .await
            .unwrap();
        assert!(matches!(outcome, EmitOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn missing_attribution_settings_skip() {
        let db = seeded_db().await;
        let card = make_card(Some("fbclid-abc"));
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db.clone(), "http://unused.invalid")
            .emit(&tid(), &card, "Lead", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EmitOutcome::Skipped {
                reason: "attribution not configured"
            }
        );

        let events = conversions::list_events_for_card(&db, "c1").await.unwrap();
        assert_eq!(events[0].status, EventStatus::Skipped);
    }

    #[tokio::test]
    async fn card_without_click_id_skips() {
        let db = seeded_db().await;
        with_attribution(&db).await;
        let card = make_card(None);
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db, "http://unused.invalid")
            .emit(&tid(), &card, "Lead", None)
            .await
            .unwrap();
        assert_eq!(outcome, EmitOutcome::Skipped { reason: "no click id" });
    }

    #[tokio::test]
    async fn repeated_first_touch_is_suppressed() {
        let db = seeded_db().await;
        with_attribution(&db).await;
        let mut card = make_card(Some("fbclid-abc"));
        card.first_conversion_sent = true;
        cards::insert_card(&db, &card).await.unwrap();

        let outcome = emitter(db, "http://unused.invalid")
            .emit(&tid(), &card, "Lead", None)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            EmitOutcome::Skipped {
                reason: "first conversion already sent"
            }
        );
    }
}
