//! Hosted checkout provider integration.
//!
//! Outbound: [`CheckoutProvider`] creates a hosted checkout session for an
//! assembled order. Inbound: [`SignatureVerifier`] authenticates the
//! provider's webhook deliveries and yields a typed [`ProviderEvent`].

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Event, OrderWithItems};
use crate::utils::error::AppResult;

pub mod events;
pub mod signature;
pub mod stripe;

pub use events::{CheckoutSessionObject, ProviderEvent, CHECKOUT_SESSION_COMPLETED};
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};
pub use stripe::StripeCheckoutProvider;

/// Placeholder the provider substitutes with the session id on redirect.
pub const SESSION_ID_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub description: String,
    /// Lower-case ISO code, as the provider expects it.
    pub currency: String,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: Vec<(String, String)>,
}

impl CheckoutSessionRequest {
    /// One provider line per order item, priced from the captured unit price.
    pub fn for_order(event: &Event, order: &OrderWithItems, app_url: &str) -> Self {
        let currency = order.order.currency.to_lowercase();
        let line_items = order
            .items
            .iter()
            .map(|item| CheckoutLineItem {
                name: format!("{} · {}", event.title, item.ticket_type.name),
                description: format!("{} ticket", item.ticket_type.name),
                currency: currency.clone(),
                unit_amount: item.unit_price,
                quantity: item.quantity,
            })
            .collect();

        Self {
            line_items,
            success_url: format!("{app_url}/checkout/success?session_id={SESSION_ID_PLACEHOLDER}"),
            cancel_url: format!("{app_url}/events/{}", event.id),
            metadata: vec![
                ("orderId".to_string(), order.order.id.to_string()),
                ("eventId".to_string(), event.id.to_string()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession>;
}
