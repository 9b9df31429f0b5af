use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;

use crate::auth::AuthenticatedUser;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::response::created;
use crate::utils::validation::{json_rejection, CreateOrderRequest};

/// `POST /checkout/session`
pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload.map_err(json_rejection)?;
    let cart = request.validate()?;

    let session = state.checkout.create_session(user.user_id, &cart).await?;
    Ok(created(session, "Checkout session created"))
}
