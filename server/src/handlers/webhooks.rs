use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::payments::SIGNATURE_HEADER;
use crate::services::WebhookAck;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// `POST /webhooks/payment`
///
/// Takes the raw body: the signature covers the exact bytes sent.
pub async fn receive_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let ack = state.webhooks.handle(&body, signature).await?;
    Ok(Json(ack))
}
