//! Turns a confirmed order into tickets.
//!
//! Fulfillment runs inside one unit of work. It either mints every ticket of
//! the order, bumps every sold count and marks the order paid, or fails
//! having changed nothing. An order that already has tickets is treated as
//! fulfilled and its tickets are returned as they are.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use super::inventory::{self, Demand};
use crate::models::{NewTicket, OrderStatus, TicketType, TicketView};
use crate::store::{Store, UnitOfWork};
use crate::utils::error::{AppError, AppResult};

const TOKEN_BYTES: usize = 16;

/// 128 random bits, hex encoded.
pub fn mint_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fulfills `order_id` within `uow`. The caller commits.
///
/// The order row stays locked until `uow` ends, so a second fulfillment of
/// the same order waits and then sees the first one's tickets.
pub async fn fulfill_order(uow: &mut dyn UnitOfWork, order_id: Uuid) -> AppResult<Vec<TicketView>> {
    let order = uow
        .lock_order(order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    if !uow.find_tickets_for_order(order_id).await?.is_empty() {
        tracing::debug!(order_id = %order_id, "Order already fulfilled");
        return uow.ticket_views_for_order(order_id).await;
    }

    let items = uow.find_order_items(order_id).await?;
    let demand = Demand::from_lines(
        items
            .iter()
            .map(|item| (item.ticket_type_id, item.quantity)),
    );
    if demand.is_empty() {
        return Err(AppError::bad_request("No tickets to allocate"));
    }

    let ticket_types: HashMap<Uuid, TicketType> = uow
        .find_ticket_types(&demand.ticket_type_ids(), None)
        .await?
        .into_iter()
        .map(|tt| (tt.id, tt))
        .collect();

    let mut minted = Vec::with_capacity(usize::try_from(demand.total_units()).unwrap_or_default());
    for (ticket_type_id, quantity) in demand.in_lock_order() {
        let ticket_type = ticket_types
            .get(&ticket_type_id)
            .ok_or_else(|| AppError::bad_request("Ticket type not found"))?;

        inventory::allocate(uow, ticket_type, quantity).await?;

        minted.extend((0..quantity).map(|_| NewTicket {
            order_id,
            ticket_type_id,
            token: mint_token(),
        }));
    }

    uow.insert_tickets(&minted).await?;
    if order.status != OrderStatus::Paid {
        uow.set_order_status(order_id, OrderStatus::Paid).await?;
    }

    tracing::info!(
        order_id = %order_id,
        tickets = minted.len(),
        ticket_types = demand.len(),
        "Order fulfilled"
    );

    uow.ticket_views_for_order(order_id).await
}

#[derive(Clone)]
pub struct FulfillmentEngine {
    store: Arc<dyn Store>,
}

impl FulfillmentEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fulfills `order_id` in a unit of work of its own.
    pub async fn fulfill(&self, order_id: Uuid) -> AppResult<Vec<TicketView>> {
        let mut uow = self.store.begin().await?;
        let tickets = fulfill_order(uow.as_mut(), order_id).await?;
        uow.commit().await?;
        Ok(tickets)
    }
}
