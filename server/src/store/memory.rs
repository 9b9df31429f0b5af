//! In-process store.
//!
//! A unit of work takes the store lock for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.
//! Transactions are therefore fully serialized, matching the strongest
//! isolation a relational backend would offer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, UnitOfWork};
use crate::models::{
    Event, EventStatus, NewOrder, NewTicket, Order, OrderItem, OrderItemView, OrderStatus,
    OrderSummary, Ticket, TicketOrderRef, TicketType, TicketView, WebhookEventRecord,
    WebhookProvider,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    ticket_types: HashMap<Uuid, TicketType>,
    // Vecs keep insertion order, which doubles as creation order.
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    tickets: Vec<Ticket>,
    webhook_events: Vec<WebhookEventRecord>,
}

impl MemoryState {
    fn order_mut(&mut self, order_id: Uuid) -> AppResult<&mut Order> {
        self.orders
            .iter_mut()
            .find(|order| order.id == order_id)
            .ok_or_else(|| AppError::not_found("Order not found"))
    }

    fn ticket_view(&self, ticket: &Ticket) -> AppResult<TicketView> {
        let ticket_type = self
            .ticket_types
            .get(&ticket.ticket_type_id)
            .ok_or_else(|| AppError::internal("ticket references a missing ticket type"))?;
        let event = self
            .orders
            .iter()
            .find(|order| order.id == ticket.order_id)
            .and_then(|order| self.events.get(&order.event_id))
            .ok_or_else(|| AppError::internal("ticket references a missing order or event"))?;

        Ok(TicketView {
            id: ticket.id,
            order_id: ticket.order_id,
            ticket_type_id: ticket.ticket_type_id,
            token: ticket.token.clone(),
            checked_in_at: ticket.checked_in_at,
            created_at: ticket.created_at,
            ticket_type: ticket_type.summary(),
            order: TicketOrderRef {
                id: ticket.order_id,
                event: event.summary(),
            },
        })
    }

    fn item_view(&self, item: &OrderItem) -> AppResult<OrderItemView> {
        let ticket_type = self
            .ticket_types
            .get(&item.ticket_type_id)
            .ok_or_else(|| AppError::internal("order item references a missing ticket type"))?;
        Ok(OrderItemView {
            id: item.id,
            ticket_type_id: item.ticket_type_id,
            unit_price: item.unit_price,
            quantity: item.quantity,
            ticket_type: ticket_type.summary(),
        })
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an event. Catalog writes live outside the order
    /// pipeline, so they bypass units of work.
    pub async fn put_event(&self, event: Event) {
        self.state.lock().await.events.insert(event.id, event);
    }

    pub async fn put_ticket_type(&self, ticket_type: TicketType) {
        self.state
            .lock()
            .await
            .ticket_types
            .insert(ticket_type.id, ticket_type);
    }

    pub async fn ticket_type(&self, id: Uuid) -> Option<TicketType> {
        self.state.lock().await.ticket_types.get(&id).cloned()
    }

    pub async fn order(&self, id: Uuid) -> Option<Order> {
        let state = self.state.lock().await;
        state.orders.iter().find(|order| order.id == id).cloned()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.clone()
    }

    pub async fn order_items(&self, order_id: Uuid) -> Vec<OrderItem> {
        let state = self.state.lock().await;
        state
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn tickets(&self) -> Vec<Ticket> {
        self.state.lock().await.tickets.clone()
    }

    pub async fn webhook_events(&self) -> Vec<WebhookEventRecord> {
        self.state.lock().await.webhook_events.clone()
    }

    /// Seeds one published event with a paid and a free ticket type so a
    /// memory-backed server has something bookable.
    pub async fn seed_demo_catalog(&self) -> (Event, Vec<TicketType>) {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Demo Night".to_string(),
            description: Some("Seeded by the in-memory store".to_string()),
            venue: "Main Hall".to_string(),
            city: "Jakarta".to_string(),
            start_at: now + Duration::days(30),
            end_at: now + Duration::days(30) + Duration::hours(4),
            banner_url: None,
            status: EventStatus::Approved,
            created_at: now,
            updated_at: now,
        };
        let ticket_types = vec![
            TicketType {
                id: Uuid::new_v4(),
                event_id: event.id,
                name: "General Admission".to_string(),
                price: 2500,
                currency: "USD".to_string(),
                capacity: 100,
                sold_count: 0,
                created_at: now,
                updated_at: now,
            },
            TicketType {
                id: Uuid::new_v4(),
                event_id: event.id,
                name: "Community".to_string(),
                price: 0,
                currency: "USD".to_string(),
                capacity: 20,
                sold_count: 0,
                created_at: now,
                updated_at: now,
            },
        ];

        self.put_event(event.clone()).await;
        for ticket_type in &ticket_types {
            self.put_ticket_type(ticket_type.clone()).await;
        }
        (event, ticket_types)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_event(&mut self, event_id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.working.events.get(&event_id).cloned())
    }

    async fn find_ticket_types(
        &mut self,
        ids: &[Uuid],
        event_id: Option<Uuid>,
    ) -> AppResult<Vec<TicketType>> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        Ok(self
            .working
            .ticket_types
            .values()
            .filter(|tt| wanted.contains(&tt.id))
            .filter(|tt| event_id.map_or(true, |id| tt.event_id == id))
            .cloned()
            .collect())
    }

    async fn increment_sold_count(
        &mut self,
        ticket_type_id: Uuid,
        quantity: i32,
    ) -> AppResult<bool> {
        let Some(ticket_type) = self.working.ticket_types.get_mut(&ticket_type_id) else {
            return Ok(false);
        };
        if ticket_type.sold_count > ticket_type.capacity - quantity {
            return Ok(false);
        }
        ticket_type.sold_count += quantity;
        ticket_type.updated_at = Utc::now();
        Ok(true)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> AppResult<(Order, Vec<OrderItem>)> {
        let now = Utc::now();
        let created = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            event_id: order.event_id,
            status: order.status,
            total_amount: order.total_amount,
            currency: order.currency.clone(),
            payment_session_id: order.payment_session_id.clone(),
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = order
            .items
            .iter()
            .map(|item| OrderItem {
                id: Uuid::new_v4(),
                order_id: created.id,
                ticket_type_id: item.ticket_type_id,
                unit_price: item.unit_price,
                quantity: item.quantity,
                created_at: now,
            })
            .collect();

        self.working.orders.push(created.clone());
        self.working.order_items.extend(items.iter().cloned());
        Ok((created, items))
    }

    async fn find_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|order| order.id == order_id)
            .cloned())
    }

    // The unit of work already holds the whole store.
    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>> {
        self.find_order(order_id).await
    }

    async fn find_order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        Ok(self
            .working
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn set_payment_session(&mut self, order_id: Uuid, session_id: &str) -> AppResult<()> {
        let order = self.working.order_mut(order_id)?;
        order.payment_session_id = Some(session_id.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        let order = self.working.order_mut(order_id)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn find_tickets_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<Ticket>> {
        Ok(self
            .working
            .tickets
            .iter()
            .filter(|ticket| ticket.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_tickets(&mut self, tickets: &[NewTicket]) -> AppResult<()> {
        let mut tokens: HashSet<&str> = self
            .working
            .tickets
            .iter()
            .map(|ticket| ticket.token.as_str())
            .collect();
        for ticket in tickets {
            if !tokens.insert(ticket.token.as_str()) {
                return Err(AppError::internal("duplicate ticket token"));
            }
        }

        let now = Utc::now();
        let rows: Vec<Ticket> = tickets
            .iter()
            .map(|ticket| Ticket {
                id: Uuid::new_v4(),
                order_id: ticket.order_id,
                ticket_type_id: ticket.ticket_type_id,
                token: ticket.token.clone(),
                checked_in_at: None,
                created_at: now,
            })
            .collect();
        self.working.tickets.extend(rows);
        Ok(())
    }

    async fn ticket_views_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<TicketView>> {
        self.working
            .tickets
            .iter()
            .filter(|ticket| ticket.order_id == order_id)
            .map(|ticket| self.working.ticket_view(ticket))
            .collect()
    }

    async fn ticket_views_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<TicketView>> {
        let order_ids: HashSet<Uuid> = self
            .working
            .orders
            .iter()
            .filter(|order| order.user_id == user_id)
            .map(|order| order.id)
            .collect();
        self.working
            .tickets
            .iter()
            .rev()
            .filter(|ticket| order_ids.contains(&ticket.order_id))
            .map(|ticket| self.working.ticket_view(ticket))
            .collect()
    }

    async fn order_summaries_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<OrderSummary>> {
        let state = &self.working;
        state
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .map(|order| {
                let event = state
                    .events
                    .get(&order.event_id)
                    .ok_or_else(|| AppError::internal("order references a missing event"))?;
                let items = state
                    .order_items
                    .iter()
                    .filter(|item| item.order_id == order.id)
                    .map(|item| state.item_view(item))
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(OrderSummary {
                    order: order.clone(),
                    event: event.summary(),
                    items,
                })
            })
            .collect()
    }

    async fn insert_webhook_event(
        &mut self,
        provider: WebhookProvider,
        event_id: &str,
    ) -> AppResult<Option<Uuid>> {
        let exists = self
            .working
            .webhook_events
            .iter()
            .any(|record| record.provider == provider && record.event_id == event_id);
        if exists {
            return Ok(None);
        }

        let record = WebhookEventRecord {
            id: Uuid::new_v4(),
            provider,
            event_id: event_id.to_string(),
            created_at: Utc::now(),
        };
        let id = record.id;
        self.working.webhook_events.push(record);
        Ok(Some(id))
    }

    async fn delete_webhook_event(&mut self, id: Uuid) -> AppResult<()> {
        self.working.webhook_events.retain(|record| record.id != id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
