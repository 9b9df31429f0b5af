use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, UnitOfWork};
use crate::config::Config;
use crate::models::{
    Event, EventSummary, NewOrder, NewTicket, Order, OrderItem, OrderItemView, OrderStatus,
    OrderSummary, Ticket, TicketOrderRef, TicketType, TicketTypeSummary, TicketView,
    WebhookProvider,
};
use crate::utils::error::AppResult;

const EVENT_COLUMNS: &str = "id, organizer_id, title, description, venue, city, start_at, end_at, \
     banner_url, status, created_at, updated_at";
const TICKET_TYPE_COLUMNS: &str =
    "id, event_id, name, price, currency, capacity, sold_count, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, event_id, status, total_amount, currency, \
     payment_session_id, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, ticket_type_id, unit_price, quantity, created_at";
const TICKET_VIEW_SELECT: &str = "SELECT t.id, t.order_id, t.ticket_type_id, t.token, \
     t.checked_in_at, t.created_at, \
     tt.name AS ticket_type_name, tt.price AS ticket_type_price, \
     tt.currency AS ticket_type_currency, \
     e.id AS event_id, e.title AS event_title, e.banner_url AS event_banner_url, \
     e.city AS event_city, e.venue AS event_venue, e.start_at AS event_start_at, \
     e.end_at AS event_end_at \
     FROM tickets t \
     JOIN ticket_types tt ON tt.id = t.ticket_type_id \
     JOIN orders o ON o.id = t.order_id \
     JOIN events e ON e.id = o.event_id";

/// Postgres-backed store. Each unit of work is one database transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        tracing::info!("Successfully connected to database");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Migrations run successfully");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[derive(FromRow)]
struct TicketViewRow {
    id: Uuid,
    order_id: Uuid,
    ticket_type_id: Uuid,
    token: String,
    checked_in_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    ticket_type_name: String,
    ticket_type_price: i64,
    ticket_type_currency: String,
    event_id: Uuid,
    event_title: String,
    event_banner_url: Option<String>,
    event_city: String,
    event_venue: String,
    event_start_at: DateTime<Utc>,
    event_end_at: DateTime<Utc>,
}

impl From<TicketViewRow> for TicketView {
    fn from(row: TicketViewRow) -> Self {
        TicketView {
            id: row.id,
            order_id: row.order_id,
            ticket_type_id: row.ticket_type_id,
            token: row.token,
            checked_in_at: row.checked_in_at,
            created_at: row.created_at,
            ticket_type: TicketTypeSummary {
                id: row.ticket_type_id,
                name: row.ticket_type_name,
                price: row.ticket_type_price,
                currency: row.ticket_type_currency,
            },
            order: TicketOrderRef {
                id: row.order_id,
                event: EventSummary {
                    id: row.event_id,
                    title: row.event_title,
                    banner_url: row.event_banner_url,
                    city: row.event_city,
                    venue: row.event_venue,
                    start_at: row.event_start_at,
                    end_at: row.event_end_at,
                },
            },
        }
    }
}

#[derive(FromRow)]
struct OrderItemViewRow {
    id: Uuid,
    order_id: Uuid,
    ticket_type_id: Uuid,
    unit_price: i64,
    quantity: i32,
    ticket_type_name: String,
    ticket_type_price: i64,
    ticket_type_currency: String,
}

#[derive(FromRow)]
struct OrderEventRow {
    #[sqlx(flatten)]
    order: Order,
    event_title: String,
    event_banner_url: Option<String>,
    event_city: String,
    event_venue: String,
    event_start_at: DateTime<Utc>,
    event_end_at: DateTime<Utc>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn find_event(&mut self, event_id: Uuid) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(event)
    }

    async fn find_ticket_types(
        &mut self,
        ids: &[Uuid],
        event_id: Option<Uuid>,
    ) -> AppResult<Vec<TicketType>> {
        let ticket_types = sqlx::query_as::<_, TicketType>(&format!(
            "SELECT {TICKET_TYPE_COLUMNS} FROM ticket_types \
             WHERE id = ANY($1) AND ($2::uuid IS NULL OR event_id = $2)"
        ))
        .bind(ids)
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ticket_types)
    }

    async fn increment_sold_count(
        &mut self,
        ticket_type_id: Uuid,
        quantity: i32,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE ticket_types \
             SET sold_count = sold_count + $2, updated_at = now() \
             WHERE id = $1 AND sold_count <= capacity - $2",
        )
        .bind(ticket_type_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> AppResult<(Order, Vec<OrderItem>)> {
        let created = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (id, user_id, event_id, status, total_amount, currency, \
             payment_session_id) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(order.user_id)
        .bind(order.event_id)
        .bind(order.status)
        .bind(order.total_amount)
        .bind(&order.currency)
        .bind(&order.payment_session_id)
        .fetch_one(&mut *self.tx)
        .await?;

        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let row = sqlx::query_as::<_, OrderItem>(&format!(
                "INSERT INTO order_items (id, order_id, ticket_type_id, unit_price, quantity) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {ORDER_ITEM_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(created.id)
            .bind(item.ticket_type_id)
            .bind(item.unit_price)
            .bind(item.quantity)
            .fetch_one(&mut *self.tx)
            .await?;
            items.push(row);
        }

        Ok((created, items))
    }

    async fn find_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn lock_order(&mut self, order_id: Uuid) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(order)
    }

    async fn find_order_items(&mut self, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 \
             ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn set_payment_session(&mut self, order_id: Uuid, session_id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE orders SET payment_session_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(order_id)
        .bind(session_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_order_status(&mut self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_tickets_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, order_id, ticket_type_id, token, checked_in_at, created_at \
             FROM tickets WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(tickets)
    }

    async fn insert_tickets(&mut self, tickets: &[NewTicket]) -> AppResult<()> {
        let ids: Vec<Uuid> = tickets.iter().map(|_| Uuid::new_v4()).collect();
        let order_ids: Vec<Uuid> = tickets.iter().map(|t| t.order_id).collect();
        let ticket_type_ids: Vec<Uuid> = tickets.iter().map(|t| t.ticket_type_id).collect();
        let tokens: Vec<String> = tickets.iter().map(|t| t.token.clone()).collect();

        sqlx::query(
            "INSERT INTO tickets (id, order_id, ticket_type_id, token) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::text[])",
        )
        .bind(ids)
        .bind(order_ids)
        .bind(ticket_type_ids)
        .bind(tokens)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn ticket_views_for_order(&mut self, order_id: Uuid) -> AppResult<Vec<TicketView>> {
        let rows = sqlx::query_as::<_, TicketViewRow>(&format!(
            "{TICKET_VIEW_SELECT} WHERE t.order_id = $1 ORDER BY t.created_at, t.id"
        ))
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(TicketView::from).collect())
    }

    async fn ticket_views_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<TicketView>> {
        let rows = sqlx::query_as::<_, TicketViewRow>(&format!(
            "{TICKET_VIEW_SELECT} WHERE o.user_id = $1 ORDER BY t.created_at DESC, t.id"
        ))
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(TicketView::from).collect())
    }

    async fn order_summaries_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<OrderSummary>> {
        let orders = sqlx::query_as::<_, OrderEventRow>(
            "SELECT o.id, o.user_id, o.event_id, o.status, o.total_amount, o.currency, \
             o.payment_session_id, o.created_at, o.updated_at, \
             e.title AS event_title, e.banner_url AS event_banner_url, e.city AS event_city, \
             e.venue AS event_venue, e.start_at AS event_start_at, e.end_at AS event_end_at \
             FROM orders o JOIN events e ON e.id = o.event_id \
             WHERE o.user_id = $1 ORDER BY o.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|row| row.order.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemViewRow>(
            "SELECT oi.id, oi.order_id, oi.ticket_type_id, oi.unit_price, oi.quantity, \
             tt.name AS ticket_type_name, tt.price AS ticket_type_price, \
             tt.currency AS ticket_type_currency \
             FROM order_items oi JOIN ticket_types tt ON tt.id = oi.ticket_type_id \
             WHERE oi.order_id = ANY($1) ORDER BY oi.created_at, oi.id",
        )
        .bind(&order_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
        for row in item_rows {
            items_by_order
                .entry(row.order_id)
                .or_default()
                .push(OrderItemView {
                    id: row.id,
                    ticket_type_id: row.ticket_type_id,
                    unit_price: row.unit_price,
                    quantity: row.quantity,
                    ticket_type: TicketTypeSummary {
                        id: row.ticket_type_id,
                        name: row.ticket_type_name,
                        price: row.ticket_type_price,
                        currency: row.ticket_type_currency,
                    },
                });
        }

        Ok(orders
            .into_iter()
            .map(|row| {
                let items = items_by_order.remove(&row.order.id).unwrap_or_default();
                OrderSummary {
                    event: EventSummary {
                        id: row.order.event_id,
                        title: row.event_title,
                        banner_url: row.event_banner_url,
                        city: row.event_city,
                        venue: row.event_venue,
                        start_at: row.event_start_at,
                        end_at: row.event_end_at,
                    },
                    order: row.order,
                    items,
                }
            })
            .collect())
    }

    async fn insert_webhook_event(
        &mut self,
        provider: WebhookProvider,
        event_id: &str,
    ) -> AppResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO webhook_events (id, provider, event_id) VALUES ($1, $2, $3) \
             ON CONFLICT (provider, event_id) DO NOTHING RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(provider)
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn delete_webhook_event(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM webhook_events WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
