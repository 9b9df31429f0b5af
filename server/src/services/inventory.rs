//! Capacity bookkeeping for ticket types.
//!
//! Two checks guard a ticket type's capacity. [`check_availability`] is an
//! advisory read used to fail fast. [`allocate`] is authoritative: it repeats
//! the read inside the caller's unit of work and then performs the
//! conditional increment, whose predicate is the actual concurrency guard.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::TicketType;
use crate::store::UnitOfWork;
use crate::utils::error::{AppError, AppResult};

/// Quantity requested per ticket type, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demand {
    entries: Vec<(Uuid, i64)>,
}

impl Demand {
    /// Sums quantities of lines naming the same ticket type.
    pub fn from_lines(lines: impl IntoIterator<Item = (Uuid, i32)>) -> Self {
        let mut index: HashMap<Uuid, usize> = HashMap::new();
        let mut entries: Vec<(Uuid, i64)> = Vec::new();
        for (ticket_type_id, quantity) in lines {
            match index.get(&ticket_type_id) {
                Some(&position) => entries[position].1 += i64::from(quantity),
                None => {
                    index.insert(ticket_type_id, entries.len());
                    entries.push((ticket_type_id, i64::from(quantity)));
                }
            }
        }
        Self { entries }
    }

    pub fn ticket_type_ids(&self) -> Vec<Uuid> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Uuid, i64)> + '_ {
        self.entries.iter().copied()
    }

    /// Entries sorted by ticket type id. Allocating in this order keeps two
    /// orders over the same ticket types from deadlocking on their rows.
    pub fn in_lock_order(&self) -> Vec<(Uuid, i64)> {
        let mut entries = self.entries.clone();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_units(&self) -> i64 {
        self.entries.iter().map(|(_, quantity)| quantity).sum()
    }
}

/// Advisory check against a possibly stale read of the ticket type.
pub fn check_availability(ticket_type: &TicketType, quantity: i64) -> AppResult<()> {
    if quantity > ticket_type.remaining() {
        return Err(AppError::CapacityExceeded {
            ticket_type_id: ticket_type.id,
        });
    }
    Ok(())
}

/// Reserves `quantity` units of `ticket_type` inside `uow`.
///
/// `ticket_type` must have been read through the same unit of work.
pub async fn allocate(
    uow: &mut dyn UnitOfWork,
    ticket_type: &TicketType,
    quantity: i64,
) -> AppResult<()> {
    check_availability(ticket_type, quantity)?;

    let exceeded = AppError::CapacityExceeded {
        ticket_type_id: ticket_type.id,
    };
    let Ok(quantity) = i32::try_from(quantity) else {
        return Err(exceeded);
    };

    if !uow.increment_sold_count(ticket_type.id, quantity).await? {
        tracing::warn!(
            ticket_type_id = %ticket_type.id,
            quantity,
            "Concurrent allocation won the last units"
        );
        return Err(exceeded);
    }

    tracing::debug!(ticket_type_id = %ticket_type.id, quantity, "Allocated ticket units");
    Ok(())
}
