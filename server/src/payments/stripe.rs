use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutProvider, CheckoutSession, CheckoutSessionRequest};
use crate::config::PaymentConfig;
use crate::utils::error::{AppError, AppResult};

/// Stripe Checkout over its form-encoded REST API.
pub struct StripeCheckoutProvider {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeCheckoutProvider {
    /// `Ok(None)` when no secret key is configured.
    pub fn from_config(config: &PaymentConfig) -> AppResult<Option<Self>> {
        let Some(secret_key) = config.secret_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            api_base: config.api_base.clone(),
            secret_key,
        }))
    }
}

/// Flattens a session request into the provider's bracketed form fields.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (index, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{index}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            item.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][description]"),
            item.description.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

#[async_trait]
impl CheckoutProvider for StripeCheckoutProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSession> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("checkout session request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "checkout session request returned {status}: {body}"
            )));
        }

        let session: SessionResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("unreadable checkout session response: {e}"))
        })?;

        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
        })
    }
}
