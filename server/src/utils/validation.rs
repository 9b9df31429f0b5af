//! Request schemas for the booking endpoints.
//!
//! Payloads are deserialized into these shapes and validated exactly once,
//! producing a [`Cart`]. Services only ever see the validated form.

use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Cart, CartLine};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub event_id: Uuid,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderItemRequest {
    pub ticket_type_id: Uuid,
    pub quantity: i64,
}

impl CreateOrderRequest {
    pub fn validate(self) -> AppResult<Cart> {
        let lines = self
            .items
            .into_iter()
            .map(|item| {
                let quantity = i32::try_from(item.quantity)
                    .ok()
                    .filter(|quantity| *quantity >= 1)
                    .ok_or_else(|| AppError::bad_request("Quantity must be a positive integer"))?;
                Ok(CartLine {
                    ticket_type_id: item.ticket_type_id,
                    quantity,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Cart::new(self.event_id, lines)
    }
}

/// Maps axum's JSON extraction failure into the API error envelope.
pub fn json_rejection(rejection: JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text())
}
