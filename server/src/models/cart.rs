use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub ticket_type_id: Uuid,
    pub quantity: i32,
}

/// A booking request that already passed boundary validation: at least one
/// line, every quantity at least one. Lines keep the order the buyer sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    event_id: Uuid,
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new(event_id: Uuid, lines: Vec<CartLine>) -> AppResult<Self> {
        if lines.is_empty() {
            return Err(AppError::bad_request("At least one ticket must be selected"));
        }
        if lines.iter().any(|line| line.quantity < 1) {
            return Err(AppError::bad_request("Quantity must be a positive integer"));
        }
        Ok(Self { event_id, lines })
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }
}
