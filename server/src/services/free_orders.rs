use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::fulfillment::fulfill_order;
use super::orders::{assemble_order, ensure_event_approved};
use crate::models::{Cart, OrderStatus, TicketView};
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeOrderReceipt {
    pub order_id: Uuid,
    pub tickets: Vec<TicketView>,
}

/// Books zero-priced carts without involving the payment provider.
///
/// Assembly and fulfillment share one unit of work, so a booking that loses
/// the race for capacity leaves no order behind.
#[derive(Clone)]
pub struct FreeOrderService {
    store: Arc<dyn Store>,
}

impl FreeOrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn book(&self, buyer_id: Uuid, cart: &Cart) -> AppResult<FreeOrderReceipt> {
        let mut uow = self.store.begin().await?;

        ensure_event_approved(uow.as_mut(), cart.event_id()).await?;
        let assembled = assemble_order(uow.as_mut(), buyer_id, cart, OrderStatus::Paid).await?;
        if assembled.order.total_amount != 0 {
            return Err(AppError::bad_request("Order requires payment"));
        }

        let order_id = assembled.order.id;
        let tickets = fulfill_order(uow.as_mut(), order_id).await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order_id,
            buyer_id = %buyer_id,
            tickets = tickets.len(),
            "Free order booked"
        );
        Ok(FreeOrderReceipt { order_id, tickets })
    }
}
