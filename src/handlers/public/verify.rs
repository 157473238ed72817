//! Client-initiated verification path.
//!
//! Webhook delivery is not guaranteed promptly, so the front end polls here
//! after the gateway redirects back. This is a deliberate race partner to
//! the webhook: both call the identical settlement operation, and the
//! per-reference idempotency boundary makes either arrival order safe.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::models::TxnOutcome;
use crate::settlement;

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub reference: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// "success" | "failed" | "pending"
    pub status: &'static str,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>> {
    // Run settlement detached from this request: if the poller disconnects
    // mid-operation, the spawned task still completes, so an abandoned poll
    // cannot leave a half-settled reference behind.
    let task_state = state.clone();
    let reference = query.reference.clone();
    let result = tokio::spawn(async move {
        settlement::settle_transaction(&task_state, &reference).await
    })
    .await
    .map_err(|e| AppError::Internal(format!("Settlement task panicked: {}", e)))?;

    let status = match result {
        Ok(settlement) => match settlement.outcome() {
            TxnOutcome::Success => "success",
            TxnOutcome::Failed => "failed",
        },
        // Gateway unreachable or payment still in flight: back off, re-poll
        Err(AppError::ProviderUnavailable) => "pending",
        Err(e) => return Err(e),
    };

    Ok(Json(VerifyResponse { status }))
}
