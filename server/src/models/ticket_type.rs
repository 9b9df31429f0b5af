use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A priced admission tier of one event.
///
/// `price` is in minor currency units. `sold_count` never exceeds `capacity`
/// and only ever grows through the conditional increment in the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub price: i64,
    pub currency: String,
    pub capacity: i32,
    pub sold_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketType {
    pub fn remaining(&self) -> i64 {
        i64::from(self.capacity) - i64::from(self.sold_count)
    }

    pub fn summary(&self) -> TicketTypeSummary {
        TicketTypeSummary {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            currency: self.currency.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeSummary {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub currency: String,
}
