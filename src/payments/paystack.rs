use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use super::{CheckoutInit, GatewayError, PaymentGateway, VerifiedPayment};

type HmacSha512 = Hmac<Sha512>;

/// Request timeout for gateway calls. A timed-out verification is reported
/// as `Unavailable` so the caller retries rather than guessing.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    status: bool,
    data: Option<InitializeData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    data: Option<VerifyData>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    /// Transaction status at the provider: "success", "failed", "abandoned", ...
    status: String,
    /// Amount in minor units (kobo for NGN).
    amount: i64,
    currency: String,
}

/// Paystack HTTP client.
///
/// The secret key doubles as the webhook HMAC key - Paystack signs the raw
/// callback body with HMAC-SHA512 of the account's secret key and sends the
/// hex digest in `x-paystack-signature`.
#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(base_url: &str, secret_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        reference: &str,
        email: &str,
        amount_cents: i64,
        currency: &str,
        callback_url: &str,
    ) -> Result<CheckoutInit, GatewayError> {
        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .timeout(GATEWAY_TIMEOUT)
            .json(&serde_json::json!({
                "reference": reference,
                "email": email,
                "amount": amount_cents,
                "currency": currency.to_uppercase(),
                "callback_url": callback_url,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status().is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "initialize returned {}",
                response.status()
            )));
        }

        let body: InitializeResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("bad initialize response: {}", e)))?;

        match body.data {
            Some(data) if body.status => Ok(CheckoutInit {
                authorization_url: data.authorization_url,
            }),
            _ => Err(GatewayError::Unavailable(
                body.message.unwrap_or_else(|| "initialize rejected".to_string()),
            )),
        }
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .timeout(GATEWAY_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if response.status().is_server_error() {
            return Err(GatewayError::Unavailable(format!(
                "verify returned {}",
                response.status()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("bad verify response: {}", e)))?;

        let Some(data) = body.data else {
            // Paystack reports unknown references with status=false and no data
            if !body.status {
                return Err(GatewayError::NotFound);
            }
            return Err(GatewayError::Unavailable(
                body.message.unwrap_or_else(|| "empty verify response".to_string()),
            ));
        };

        match data.status.as_str() {
            "success" => Ok(VerifiedPayment {
                amount_cents: data.amount,
                currency: data.currency.to_lowercase(),
                success: true,
            }),
            "failed" | "reversed" => Ok(VerifiedPayment {
                amount_cents: data.amount,
                currency: data.currency.to_lowercase(),
                success: false,
            }),
            // "pending", "ongoing", "abandoned", ... - not terminal yet
            _ => Err(GatewayError::Pending),
        }
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        let mut mac = match HmacSha512::new_from_slice(self.secret_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload);
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = signature.as_bytes();

        // Length check is not constant-time, but signature length is not
        // secret (always 128 hex chars for SHA-512)
        if expected_bytes.len() != provided_bytes.len() {
            return false;
        }

        // Constant-time comparison to prevent timing attacks
        expected_bytes.ct_eq(provided_bytes).into()
    }
}
