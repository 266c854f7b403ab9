use crate::config::PaymentConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Payment created at the gateway; the buyer is sent to `confirmation_url`.
#[derive(Debug, Clone)]
pub struct PaymentHandle {
    pub payment_id: String,
    pub confirmation_url: String,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentReply {
    id: String,
    #[serde(default)]
    confirmation: Option<Confirmation>,
}

#[derive(Debug, Deserialize)]
struct Confirmation {
    #[serde(default)]
    confirmation_url: Option<String>,
}

// 入站支付回调（at-least-once，可能乱序、重复）

pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const EVENT_PAYMENT_CANCELED: &str = "payment.canceled";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub event: String,
    pub object: PaymentObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: PaymentMetadata,
}

/// Gateway metadata values come back as strings regardless of what was sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default)]
    pub gift_id: Option<String>,
    #[serde(default)]
    pub tg_user_id: Option<String>,
}

impl PaymentEvent {
    /// Extracts `(gift_id, tg_user_id)` from event metadata. `None` marks the
    /// callback malformed: it is acknowledged and dropped, never retried.
    pub fn gift_ref(&self) -> Option<(i64, i64)> {
        let gift_id = self.object.metadata.gift_id.as_deref()?.parse().ok()?;
        let tg_user_id = self.object.metadata.tg_user_id.as_deref()?.parse().ok()?;
        Some((gift_id, tg_user_id))
    }

    pub fn is_success(&self) -> bool {
        self.event == EVENT_PAYMENT_SUCCEEDED
    }
}

#[derive(Clone)]
pub struct PaymentGatewayService {
    client: Client,
    config: PaymentConfig,
}

impl PaymentGatewayService {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Creates a redirect payment carrying the gift and buyer in metadata so
    /// the success callback can be reconciled against the store.
    pub async fn create_payment(
        &self,
        gift_id: i64,
        tg_user_id: i64,
        description: &str,
    ) -> AppResult<PaymentHandle> {
        if self.config.stub {
            // 桩模式：不触网，直接放行到 return_url
            let payment_id = format!("stub-{}", Uuid::new_v4());
            log::info!("Payment stub active, issued {payment_id} for gift {gift_id}");
            return Ok(PaymentHandle {
                payment_id,
                confirmation_url: self.config.return_url.clone(),
            });
        }

        let url = format!("{}/payments", self.config.base_url);

        let amount_value = format!("{:.2}", self.config.amount_minor as f64 / 100.0);
        let body = json!({
            "amount": { "value": amount_value, "currency": self.config.currency },
            "capture": true,
            "confirmation": { "type": "redirect", "return_url": self.config.return_url },
            "description": description,
            "metadata": {
                "gift_id": gift_id.to_string(),
                "tg_user_id": tg_user_id.to_string(),
            },
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.shop_id, Some(&self.config.secret_key))
            .header("Idempotence-Key", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Failed to create payment: {error_text}"
            )));
        }

        let reply: CreatePaymentReply = response.json().await?;
        let confirmation_url = reply
            .confirmation
            .and_then(|c| c.confirmation_url)
            .ok_or_else(|| {
                AppError::ExternalApiError("Payment reply missing confirmation URL".to_string())
            })?;

        Ok(PaymentHandle {
            payment_id: reply.id,
            confirmation_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_gift_ref() {
        let raw = r#"{
            "event": "payment.succeeded",
            "object": {
                "id": "pay-123",
                "status": "succeeded",
                "metadata": {"gift_id": "7", "tg_user_id": "42"}
            }
        }"#;

        let event: PaymentEvent = serde_json::from_str(raw).unwrap();
        assert!(event.is_success());
        assert_eq!(event.gift_ref(), Some((7, 42)));
    }

    #[test]
    fn test_event_missing_metadata_is_malformed() {
        let raw = r#"{
            "event": "payment.succeeded",
            "object": {"id": "pay-456"}
        }"#;

        let event: PaymentEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.gift_ref(), None);
    }

    #[test]
    fn test_event_non_numeric_metadata_is_malformed() {
        let raw = r#"{
            "event": "payment.succeeded",
            "object": {
                "id": "pay-789",
                "metadata": {"gift_id": "seven", "tg_user_id": "42"}
            }
        }"#;

        let event: PaymentEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.gift_ref(), None);
    }

    #[test]
    fn test_canceled_event_is_not_success() {
        let raw = r#"{
            "event": "payment.canceled",
            "object": {
                "id": "pay-321",
                "metadata": {"gift_id": "7", "tg_user_id": "42"}
            }
        }"#;

        let event: PaymentEvent = serde_json::from_str(raw).unwrap();
        assert!(!event.is_success());
        assert_eq!(event.gift_ref(), Some((7, 42)));
    }
}
