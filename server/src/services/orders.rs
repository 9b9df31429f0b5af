//! Order assembly and the buyer's order history.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use uuid::Uuid;

use super::inventory::{self, Demand};
use crate::models::{
    Cart, Event, NewOrder, NewOrderItem, OrderItemView, OrderStatus, OrderSummary, OrderWithItems,
    TicketType, TicketView,
};
use crate::store::{Store, UnitOfWork};
use crate::utils::error::{AppError, AppResult};

/// Loads an event that can currently be booked.
pub async fn ensure_event_approved(uow: &mut dyn UnitOfWork, event_id: Uuid) -> AppResult<Event> {
    match uow.find_event(event_id).await? {
        Some(event) if event.is_bookable() => Ok(event),
        _ => Err(AppError::not_found("Event is not available for booking")),
    }
}

/// Validates `cart` against the catalog, prices it and writes the order.
///
/// Prices come from the catalog as read here and are captured per line.
/// Capacity is only checked, not reserved: a pending order can still fail
/// to fulfill.
pub async fn assemble_order(
    uow: &mut dyn UnitOfWork,
    buyer_id: Uuid,
    cart: &Cart,
    status: OrderStatus,
) -> AppResult<OrderWithItems> {
    let demand = Demand::from_lines(
        cart.lines()
            .iter()
            .map(|line| (line.ticket_type_id, line.quantity)),
    );

    let ticket_types = uow
        .find_ticket_types(&demand.ticket_type_ids(), Some(cart.event_id()))
        .await?;
    if ticket_types.len() != demand.len() {
        return Err(AppError::bad_request("One or more ticket types not found"));
    }

    let currencies: HashSet<&str> = ticket_types.iter().map(|tt| tt.currency.as_str()).collect();
    if currencies.len() > 1 {
        return Err(AppError::bad_request("Ticket types must share one currency"));
    }

    let by_id: HashMap<Uuid, &TicketType> = ticket_types.iter().map(|tt| (tt.id, tt)).collect();
    for (ticket_type_id, quantity) in demand.iter() {
        let ticket_type = by_id
            .get(&ticket_type_id)
            .ok_or_else(|| AppError::bad_request("Ticket type not available"))?;
        inventory::check_availability(ticket_type, quantity)?;
    }

    let mut total_amount: i64 = 0;
    let mut items = Vec::with_capacity(cart.lines().len());
    for line in cart.lines() {
        let ticket_type = by_id
            .get(&line.ticket_type_id)
            .ok_or_else(|| AppError::bad_request("Ticket type not available"))?;
        let line_total = ticket_type
            .price
            .checked_mul(i64::from(line.quantity))
            .ok_or_else(|| AppError::bad_request("Order total is too large"))?;
        total_amount = total_amount
            .checked_add(line_total)
            .ok_or_else(|| AppError::bad_request("Order total is too large"))?;
        items.push(NewOrderItem {
            ticket_type_id: ticket_type.id,
            unit_price: ticket_type.price,
            quantity: line.quantity,
        });
    }

    let currency = ticket_types
        .first()
        .map(|tt| tt.currency.clone())
        .ok_or_else(|| AppError::bad_request("At least one ticket must be selected"))?;

    let (order, rows) = uow
        .insert_order(&NewOrder {
            user_id: buyer_id,
            event_id: cart.event_id(),
            status,
            total_amount,
            currency,
            payment_session_id: None,
            items,
        })
        .await?;

    let items = rows
        .into_iter()
        .map(|row| {
            let ticket_type = by_id
                .get(&row.ticket_type_id)
                .ok_or_else(|| AppError::internal("order item lost its ticket type"))?;
            Ok(OrderItemView {
                id: row.id,
                ticket_type_id: row.ticket_type_id,
                unit_price: row.unit_price,
                quantity: row.quantity,
                ticket_type: ticket_type.summary(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    tracing::info!(
        order_id = %order.id,
        event_id = %order.event_id,
        status = ?order.status,
        total_amount = order.total_amount,
        currency = %order.currency,
        lines = items.len(),
        "Order assembled"
    );

    Ok(OrderWithItems { order, items })
}

/// Read side of the buyer's orders and tickets.
#[derive(Clone)]
pub struct OrderHistory {
    store: Arc<dyn Store>,
}

impl OrderHistory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn orders_for_user(&self, user_id: Uuid) -> AppResult<Vec<OrderSummary>> {
        let mut uow = self.store.begin().await?;
        uow.order_summaries_for_user(user_id).await
    }

    pub async fn tickets_for_user(&self, user_id: Uuid) -> AppResult<Vec<TicketView>> {
        let mut uow = self.store.begin().await?;
        uow.ticket_views_for_user(user_id).await
    }
}
