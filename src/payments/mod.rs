mod paystack;

pub use paystack::*;

use async_trait::async_trait;

/// Errors from the payment gateway boundary.
///
/// `Unavailable` is transient and maps to a retry-eligible response upstream;
/// `NotFound` means the provider has no record of the reference and is
/// treated as a permanently failed payment.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The transaction exists but has not reached a terminal state at the
    /// provider (the user may still be on the checkout page). Settling now
    /// would be premature; the caller re-polls or waits for the webhook.
    #[error("transaction not yet terminal at the gateway")]
    Pending,

    #[error("gateway has no record of this reference")]
    NotFound,
}

/// Ground truth about a transaction, read back from the provider.
///
/// A webhook's claimed status is never trusted without this confirmation -
/// verification is read-only against the provider and therefore idempotent
/// by construction.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub amount_cents: i64,
    /// ISO 4217 code, lowercase.
    pub currency: String,
    pub success: bool,
}

/// Result of initializing a checkout with the provider.
#[derive(Debug, Clone)]
pub struct CheckoutInit {
    /// Provider-hosted page the user completes payment on.
    pub authorization_url: String,
}

/// The seam to the external payment provider.
///
/// `AppState` holds this as a trait object so tests can substitute a stub
/// gateway; production wires up `PaystackClient`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a pre-generated reference with the provider and obtain the
    /// checkout page URL.
    async fn initialize(
        &self,
        reference: &str,
        email: &str,
        amount_cents: i64,
        currency: &str,
        callback_url: &str,
    ) -> Result<CheckoutInit, GatewayError>;

    /// Confirm a transaction's true status. Read-only against the provider.
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError>;

    /// Check a webhook signature over the raw request body.
    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> bool;
}
