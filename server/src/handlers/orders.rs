use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;

use crate::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::created;
use crate::utils::validation::{json_rejection, CreateOrderRequest};

/// `POST /orders/free`
pub async fn create_free_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    let cart = request.validate()?;

    let receipt = state.free_orders.book(user.user_id, &cart).await?;
    Ok(created(receipt, "Tickets booked"))
}
