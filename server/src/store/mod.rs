//! Datastore seam for the order pipeline.
//!
//! A [`UnitOfWork`] is one atomic transaction. Every service function that
//! touches durable state takes `&mut dyn UnitOfWork` as a parameter, so the
//! caller decides where a transaction starts and where it commits. Dropping
//! a unit of work without calling [`UnitOfWork::commit`] rolls it back.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Event, NewOrder, NewTicket, Order, OrderItem, OrderStatus, OrderSummary, Ticket, TicketType,
    TicketView, WebhookProvider,
};
use crate::utils::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;

    /// Cheap connectivity probe used by the readiness endpoint.
    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_event(&mut self, event_id: Uuid) -> AppResult<Option<Event>>;

    /// Ticket types among `ids`. When `event_id` is given, types belonging
    /// to any other event are left out of the result.
    async fn find_ticket_types(
        &mut self,
        ids: &[Uuid],
        event_id: Option<Uuid>,
    ) -> AppResult<Vec<TicketType>>;

    /// Adds `quantity` to the sold count only if the result stays within
    /// capacity, evaluated against the row's current values. Returns whether
    /// a row was updated.
    async fn increment_sold_count(&mut self, ticket_type_id: Uuid, quantity: i32)
        -> AppResult<bool>;

    async fn insert_order(&mut self, order: &NewOrder) -> AppResult<(Order, Vec<OrderItem>)>;

    async fn find_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>>;

    /// Like [`UnitOfWork::find_order`], but holds the order's row lock until
    /// the unit of work ends. Concurrent lockers of the same order queue up.
    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>>;

    async fn find_order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>>;

    async fn set_payment_session(&mut self, order_id: Uuid, session_id: &str) -> AppResult<()>;

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()>;

    async fn find_tickets_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<Ticket>>;

    async fn insert_tickets(&mut self, tickets: &[NewTicket]) -> AppResult<()>;

    async fn ticket_views_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<TicketView>>;

    /// Newest first.
    async fn ticket_views_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<TicketView>>;

    /// Newest first.
    async fn order_summaries_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<OrderSummary>>;

    /// Records a provider notification id. `None` means the pair was already
    /// recorded.
    async fn insert_webhook_event(
        &mut self,
        provider: WebhookProvider,
        event_id: &str,
    ) -> AppResult<Option<Uuid>>;

    async fn delete_webhook_event(&mut self, id: Uuid) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
