use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::state::AppState;
use crate::utils::response::{error, success};

pub mod checkout;
pub mod me;
pub mod orders;
pub mod webhooks;

pub use checkout::create_checkout_session;
pub use me::{my_orders, my_tickets};
pub use orders::create_free_order;
pub use webhooks::receive_payment_webhook;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticketing-api",
    };

    success(payload, "Health check successful").into_response()
}

/// Ready once the datastore answers.
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => success(
            HealthPayload {
                status: "ready",
                service: "ticketing-api",
            },
            "Service is ready",
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            error(
                "SERVICE_UNAVAILABLE",
                "Datastore is unreachable",
                None,
                StatusCode::SERVICE_UNAVAILABLE,
            )
        }
    }
}
