//! Mobile-Money Gateway Adapter
//!
//! Starts an M-Pesa STK push. The outcome arrives later on the callback
//! route; a 2xx here only means the prompt was queued.

use std::time::Duration;

use serde::Serialize;

use crate::domain::gateway::PaymentGateway;
use crate::domain::value_object::phone::PhoneNumber;
use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone)]
pub struct PaymentApiConfig {
    pub api_url: String,
    /// Sent verbatim as the `Authorization` header (e.g. `Basic …`)
    pub authorization: String,
    pub channel_id: i64,
    pub provider: String,
}

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: PaymentApiConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: PaymentApiConfig, timeout: Duration) -> BoardResult<Self> {
        let client = platform::http::build_client(timeout).map_err(|e| {
            BoardError::Internal(format!("Failed to build payment client: {}", e))
        })?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct StkPushRequest<'a> {
    amount: i64,
    phone_number: &'a str,
    channel_id: i64,
    provider: &'a str,
    external_reference: &'a str,
    callback_url: &'a str,
}

impl PaymentGateway for HttpPaymentGateway {
    async fn initiate_payment(
        &self,
        amount: i64,
        phone: &PhoneNumber,
        external_reference: &str,
        callback_url: &str,
    ) -> BoardResult<()> {
        let body = StkPushRequest {
            amount,
            phone_number: phone.as_str(),
            channel_id: self.config.channel_id,
            provider: &self.config.provider,
            external_reference,
            callback_url,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header(reqwest::header::AUTHORIZATION, &self.config.authorization)
            .json(&body)
            .send()
            .await
            .map_err(|e| BoardError::Gateway(format!("STK push request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                detail = %detail,
                external_reference,
                "Payment gateway rejected STK push"
            );
            return Err(BoardError::Gateway(format!(
                "Payment gateway returned {}",
                status
            )));
        }

        tracing::info!(external_reference, amount, "STK push queued");
        Ok(())
    }
}
