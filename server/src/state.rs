use std::sync::Arc;

use crate::auth::{GuardPipeline, RequireIdentity, RequireJsonBody, TokenVerifier};
use crate::config::Config;
use crate::payments::{CheckoutProvider, SignatureVerifier};
use crate::services::{
    CheckoutService, FreeOrderService, FulfillmentEngine, OrderHistory, WebhookService,
};
use crate::store::Store;

/// Everything handlers need, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub checkout: CheckoutService,
    pub free_orders: FreeOrderService,
    pub webhooks: WebhookService,
    pub history: OrderHistory,
    pub guards: GuardPipeline,
}

impl AppState {
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        provider: Option<Arc<dyn CheckoutProvider>>,
    ) -> Self {
        let verifier = config
            .payments
            .webhook_secret
            .as_ref()
            .map(|secret| SignatureVerifier::new(secret.clone(), config.payments.webhook_tolerance_secs));
        let fulfillment = FulfillmentEngine::new(store.clone());
        let guards = GuardPipeline::new()
            .with(RequireIdentity::new(TokenVerifier::new(
                config.auth.token_secret.clone(),
            )))
            .with(RequireJsonBody);

        Self {
            checkout: CheckoutService::new(store.clone(), provider, config.app_url.clone()),
            free_orders: FreeOrderService::new(store.clone()),
            webhooks: WebhookService::new(store.clone(), fulfillment, verifier),
            history: OrderHistory::new(store.clone()),
            guards,
            store,
        }
    }
}
