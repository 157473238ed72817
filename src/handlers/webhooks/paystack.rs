//! Paystack webhook ingress.
//!
//! Authenticates the raw callback body against `x-paystack-signature`, then
//! hands the reference to the settlement operation. The claimed event status
//! is never trusted - settlement re-verifies against the gateway before any
//! state changes.
//!
//! Acks are chosen for the provider's redelivery logic:
//! - 200: processed, already settled, or permanently unprocessable (stop
//!   redelivering);
//! - 401: signature mismatch (fail closed, nothing attempted);
//! - 503: transient - redeliver later. A success ack is only ever sent after
//!   settlement has durably committed its idempotency marker, so a crash
//!   after processing cannot lose the event.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;

use super::WebhookResult;
use crate::db::{queries, AppState};
use crate::error::AppError;
use crate::settlement;

/// Paystack event envelope. Fields beyond the reference are deliberately
/// ignored - verification supplies ground truth.
#[derive(Debug, Deserialize)]
struct PaystackEvent {
    event: String,
    data: PaystackEventData,
}

#[derive(Debug, Deserialize)]
struct PaystackEventData {
    #[serde(default)]
    reference: Option<String>,
    /// Refund events carry the original payment reference here.
    #[serde(default)]
    transaction_reference: Option<String>,
}

pub async fn handle_paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResult {
    let Some(signature) = headers
        .get("x-paystack-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return (StatusCode::UNAUTHORIZED, "Missing signature");
    };

    if !state.gateway.verify_webhook_signature(&body, signature) {
        tracing::warn!("Paystack webhook rejected: invalid signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature");
    }

    let event: PaystackEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("Paystack webhook rejected: malformed body: {}", e);
            return (StatusCode::BAD_REQUEST, "Malformed payload");
        }
    };

    match event.event.as_str() {
        "charge.success" => {
            let Some(reference) = event.data.reference else {
                return (StatusCode::BAD_REQUEST, "Missing reference");
            };
            settle(&state, &reference).await
        }
        "refund.processed" => {
            let Some(reference) = event
                .data
                .transaction_reference
                .or(event.data.reference)
            else {
                return (StatusCode::BAD_REQUEST, "Missing reference");
            };
            process_refund(&state, &reference)
        }
        _ => (StatusCode::OK, "Event ignored"),
    }
}

async fn settle(state: &AppState, reference: &str) -> WebhookResult {
    match settlement::settle_transaction(state, reference).await {
        Ok(settlement::Settlement::Granted) => (StatusCode::OK, "Processed"),
        Ok(settlement::Settlement::Failed) => (StatusCode::OK, "Processed as failed"),
        Ok(settlement::Settlement::AlreadySettled(_)) => (StatusCode::OK, "Already processed"),
        Err(AppError::UnknownTransaction(_)) => {
            // Permanent: we never issued this reference. Ack so the provider
            // stops redelivering, keep a trail for investigation.
            tracing::warn!("Webhook for unknown reference {}", reference);
            (StatusCode::OK, "Unknown reference")
        }
        Err(AppError::ProviderUnavailable) => (StatusCode::SERVICE_UNAVAILABLE, "Retry later"),
        Err(e) => {
            tracing::error!("Settlement failed for {}: {}", reference, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Settlement error")
        }
    }
}

/// Revoke the enrollment backed by a refunded payment.
///
/// Idempotent via the conditional UPDATE: a redelivered refund event finds
/// no active enrollment for the reference and changes nothing. Referral
/// credits are deliberately left untouched.
fn process_refund(state: &AppState, reference: &str) -> WebhookResult {
    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("DB connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    match queries::refund_enrollment_by_reference(&conn, reference) {
        Ok(true) => {
            tracing::info!("Refund processed: enrollment revoked for {}", reference);
            (StatusCode::OK, "Refund processed")
        }
        Ok(false) => {
            // Already refunded, or the reference no longer backs an active
            // enrollment (superseded by a newer payment)
            (StatusCode::OK, "No active enrollment for reference")
        }
        Err(e) => {
            tracing::error!("Refund processing failed for {}: {}", reference, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
