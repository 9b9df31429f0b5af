//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use ticketing_server::config::Config;
use ticketing_server::models::{Cart, CartLine, Event, EventStatus, TicketType};
use ticketing_server::payments::{
    CheckoutProvider, CheckoutSession, CheckoutSessionRequest, SignatureVerifier,
};
use ticketing_server::services::{
    CheckoutService, FreeOrderService, FulfillmentEngine, WebhookService,
};
use ticketing_server::store::{MemoryStore, Store};
use ticketing_server::utils::error::{AppError, AppResult};

pub const TOKEN_SECRET: &str = "test-token-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const APP_URL: &str = "http://localhost:3000";

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("AUTH_TOKEN_SECRET", TOKEN_SECRET),
        ("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET),
        ("STORAGE_BACKEND", "memory"),
        ("APP_URL", APP_URL),
    ]);
    Config::from_lookup(|name| vars.get(name).map(|value| value.to_string()))
        .expect("test config")
}

pub async fn approved_event(store: &MemoryStore) -> Event {
    event_with_status(store, EventStatus::Approved).await
}

pub async fn event_with_status(store: &MemoryStore, status: EventStatus) -> Event {
    let now = Utc::now();
    let event = Event {
        id: Uuid::new_v4(),
        organizer_id: Uuid::new_v4(),
        title: "Rust Meetup".to_string(),
        description: None,
        venue: "Hall A".to_string(),
        city: "Lagos".to_string(),
        start_at: now + Duration::days(7),
        end_at: now + Duration::days(7) + Duration::hours(3),
        banner_url: None,
        status,
        created_at: now,
        updated_at: now,
    };
    store.put_event(event.clone()).await;
    event
}

pub async fn ticket_type(
    store: &MemoryStore,
    event_id: Uuid,
    price: i64,
    currency: &str,
    capacity: i32,
) -> TicketType {
    let now = Utc::now();
    let ticket_type = TicketType {
        id: Uuid::new_v4(),
        event_id,
        name: format!("Tier {price}"),
        price,
        currency: currency.to_string(),
        capacity,
        sold_count: 0,
        created_at: now,
        updated_at: now,
    };
    store.put_ticket_type(ticket_type.clone()).await;
    ticket_type
}

pub fn cart(event_id: Uuid, lines: &[(Uuid, i32)]) -> Cart {
    Cart::new(
        event_id,
        lines
            .iter()
            .map(|(ticket_type_id, quantity)| CartLine {
                ticket_type_id: *ticket_type_id,
                quantity: *quantity,
            })
            .collect(),
    )
    .expect("valid cart")
}

/// Provider double that records every request and hands out `cs_test_<n>`.
#[derive(Default)]
pub struct MockCheckoutProvider {
    requests: Mutex<Vec<CheckoutSessionRequest>>,
    fail: bool,
}

impl MockCheckoutProvider {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutProvider for MockCheckoutProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        if self.fail {
            return Err(AppError::ExternalService("provider unavailable".to_string()));
        }
        let session_id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.test/{session_id}")),
            session_id,
        })
    }
}

/// The services wired over one memory store, as `AppState` would wire them.
pub struct Harness {
    pub store: MemoryStore,
    pub provider: Arc<MockCheckoutProvider>,
    pub checkout: CheckoutService,
    pub free_orders: FreeOrderService,
    pub fulfillment: FulfillmentEngine,
    pub webhooks: WebhookService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MockCheckoutProvider::default())
    }

    pub fn with_provider(provider: MockCheckoutProvider) -> Self {
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let provider = Arc::new(provider);
        let fulfillment = FulfillmentEngine::new(shared.clone());

        Self {
            checkout: CheckoutService::new(
                shared.clone(),
                Some(provider.clone() as Arc<dyn CheckoutProvider>),
                APP_URL,
            ),
            free_orders: FreeOrderService::new(shared.clone()),
            webhooks: WebhookService::new(
                shared,
                fulfillment.clone(),
                Some(SignatureVerifier::new(WEBHOOK_SECRET, 300)),
            ),
            fulfillment,
            provider,
            store,
        }
    }
}

pub fn completed_payload(event_id: &str, session_id: &str, order_id: Uuid) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "metadata": { "orderId": order_id.to_string() }
            }
        }
    }))
    .unwrap()
}

pub fn sign(payload: &[u8]) -> String {
    SignatureVerifier::new(WEBHOOK_SECRET, 300)
        .sign(payload, Utc::now().timestamp())
        .unwrap()
}
