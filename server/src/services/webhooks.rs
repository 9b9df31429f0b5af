//! Receipt of payment confirmations.
//!
//! Deliveries are at-least-once. Each provider event id is recorded in the
//! idempotency table before fulfillment; a delivery whose id is already there
//! is acknowledged without further work. If fulfillment fails the record is
//! removed again so the provider's retry can succeed later.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::fulfillment::FulfillmentEngine;
use crate::models::WebhookProvider;
use crate::payments::SignatureVerifier;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickets_count: Option<usize>,
}

impl WebhookAck {
    fn received() -> Self {
        Self {
            received: true,
            tickets_count: None,
        }
    }

    fn fulfilled(tickets_count: usize) -> Self {
        Self {
            received: true,
            tickets_count: Some(tickets_count),
        }
    }
}

#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn Store>,
    fulfillment: FulfillmentEngine,
    verifier: Option<SignatureVerifier>,
}

impl WebhookService {
    pub fn new(
        store: Arc<dyn Store>,
        fulfillment: FulfillmentEngine,
        verifier: Option<SignatureVerifier>,
    ) -> Self {
        Self {
            store,
            fulfillment,
            verifier,
        }
    }

    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> AppResult<WebhookAck> {
        let signature =
            signature.ok_or_else(|| AppError::bad_request("Missing payment provider signature"))?;
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AppError::internal("Payment webhook secret is not configured"))?;

        let event = verifier.verify(payload, signature, Utc::now())?;
        if !event.is_checkout_completed() {
            tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring payment event");
            return Ok(WebhookAck::received());
        }

        let session = event.checkout_session()?;
        let order_id = session.order_id()?;

        let order = {
            let mut uow = self.store.begin().await?;
            uow.find_order(order_id).await?
        };
        match order {
            Some(order) if order.payment_session_id.as_deref() == Some(session.id.as_str()) => {}
            _ => {
                tracing::warn!(
                    order_id = %order_id,
                    session_id = %session.id,
                    "Payment event does not match a linked order"
                );
                return Err(AppError::not_found("Order not found"));
            }
        }

        let marker = {
            let mut uow = self.store.begin().await?;
            let marker = uow
                .insert_webhook_event(WebhookProvider::Stripe, &event.id)
                .await?;
            uow.commit().await?;
            marker
        };
        let Some(marker_id) = marker else {
            tracing::info!(event_id = %event.id, order_id = %order_id, "Duplicate payment event");
            return Ok(WebhookAck::received());
        };

        match self.fulfillment.fulfill(order_id).await {
            Ok(tickets) => Ok(WebhookAck::fulfilled(tickets.len())),
            Err(err) => {
                tracing::error!(
                    event_id = %event.id,
                    order_id = %order_id,
                    error = %err,
                    "Fulfillment failed; releasing idempotency record"
                );
                if let Err(release_err) = self.release_marker(marker_id).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %release_err,
                        "Could not release idempotency record"
                    );
                }
                Err(err)
            }
        }
    }

    async fn release_marker(&self, marker_id: Uuid) -> AppResult<()> {
        let mut uow = self.store.begin().await?;
        uow.delete_webhook_event(marker_id).await?;
        uow.commit().await
    }
}
