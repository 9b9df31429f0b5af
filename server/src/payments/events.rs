use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// A webhook notification, after its signature has been checked.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl ProviderEvent {
    pub fn is_checkout_completed(&self) -> bool {
        self.event_type == CHECKOUT_SESSION_COMPLETED
    }

    pub fn checkout_session(&self) -> AppResult<CheckoutSessionObject> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|_| AppError::bad_request("Malformed checkout session in payment event"))
    }
}

impl CheckoutSessionObject {
    pub fn order_id(&self) -> AppResult<Uuid> {
        let raw = self
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("orderId"))
            .ok_or_else(|| AppError::bad_request("Order metadata missing from payment event"))?;
        Uuid::parse_str(raw)
            .map_err(|_| AppError::bad_request("Order metadata in payment event is not an order id"))
    }
}
