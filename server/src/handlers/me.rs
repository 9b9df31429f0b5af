use axum::extract::State;
use axum::response::Response;

use crate::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::success;

/// `GET /me/orders`
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Response> {
    let orders = state.history.orders_for_user(user.user_id).await?;
    Ok(success(orders, "Orders retrieved"))
}

/// `GET /me/tickets`
pub async fn my_tickets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Response> {
    let tickets = state.history.tickets_for_user(user.user_id).await?;
    Ok(success(tickets, "Tickets retrieved"))
}
