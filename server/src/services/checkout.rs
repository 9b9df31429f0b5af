use std::sync::Arc;

use uuid::Uuid;

use super::orders::{assemble_order, ensure_event_approved};
use crate::models::{Cart, OrderStatus};
use crate::payments::{CheckoutProvider, CheckoutSession, CheckoutSessionRequest};
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

/// Starts hosted checkout for paid carts.
///
/// The pending order is committed before the provider is called so no
/// transaction stays open across the network round trip.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    provider: Option<Arc<dyn CheckoutProvider>>,
    app_url: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Option<Arc<dyn CheckoutProvider>>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provider,
            app_url: app_url.into(),
        }
    }

    pub async fn create_session(&self, buyer_id: Uuid, cart: &Cart) -> AppResult<CheckoutSession> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AppError::internal("Payment provider is not configured"))?;

        let mut uow = self.store.begin().await?;
        let event = ensure_event_approved(uow.as_mut(), cart.event_id()).await?;
        let order = assemble_order(uow.as_mut(), buyer_id, cart, OrderStatus::Pending).await?;
        uow.commit().await?;

        let request = CheckoutSessionRequest::for_order(&event, &order, &self.app_url);
        let session = provider.create_checkout_session(&request).await.map_err(|err| {
            tracing::warn!(
                order_id = %order.order.id,
                error = %err,
                "Checkout session could not be created; order stays pending"
            );
            err
        })?;

        let mut uow = self.store.begin().await?;
        uow.set_payment_session(order.order.id, &session.session_id)
            .await?;
        uow.commit().await?;

        tracing::info!(
            order_id = %order.order.id,
            session_id = %session.session_id,
            "Order linked to checkout session"
        );
        Ok(session)
    }
}
