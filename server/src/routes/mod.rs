use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::enforce_guards;
use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{
    create_checkout_session, create_free_order, health_check, my_orders, my_tickets,
    readiness_check, receive_payment_webhook,
};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    // Guards run only on matched routes so unknown paths still 404.
    let buyer_routes = Router::new()
        .route("/checkout/session", post(create_checkout_session))
        .route("/orders/free", post(create_free_order))
        .route("/me/orders", get(my_orders))
        .route("/me/tickets", get(my_tickets))
        .route_layer(middleware::from_fn_with_state(
            state.guards.clone(),
            enforce_guards,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/webhooks/payment", post(receive_payment_webhook))
        .route("/webhooks/stripe", post(receive_payment_webhook));

    Router::new()
        .merge(buyer_routes)
        .merge(public_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config))
        .layer(create_cors_layer(&config.cors))
}
