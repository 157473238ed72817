//! Checkout initiation.
//!
//! Allocates the transaction reference at the course's current price and
//! registers it with the gateway. The reference row is created before the
//! gateway call: an initialize failure leaves an abandoned `initiated` row,
//! which is harmless and keeps the audit trail complete.

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, OptionExt, Result};
use crate::extractors::Json;
use crate::id::EntityType;
use crate::models::CreateTransactionRef;
use crate::payments::GatewayError;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub user_id: String,
    pub course_id: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub reference: String,
    /// Gateway-hosted page the user completes payment on.
    pub authorization_url: String,
}

pub async fn initiate_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let conn = state.db.get()?;

    let user = queries::get_user_by_id(&conn, &request.user_id)?
        .or_not_found(msg::USER_NOT_FOUND)?;
    let course = queries::get_course_by_id(&conn, &request.course_id)?
        .or_not_found(msg::COURSE_NOT_FOUND)?;

    let reference = EntityType::Transaction.gen_id();
    queries::create_transaction_ref(
        &conn,
        &CreateTransactionRef {
            reference: reference.clone(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            amount_cents: course.price_cents,
            currency: course.currency.clone(),
        },
    )?;
    drop(conn);

    let callback_url = format!(
        "{}/payments/verify?reference={}",
        state.base_url, reference
    );

    let init = state
        .gateway
        .initialize(
            &reference,
            &user.email,
            course.price_cents,
            &course.currency,
            &callback_url,
        )
        .await
        .map_err(|e| match e {
            GatewayError::Unavailable(_) | GatewayError::Pending => AppError::ProviderUnavailable,
            GatewayError::NotFound => {
                AppError::Internal("Gateway rejected checkout initialization".into())
            }
        })?;

    tracing::info!(
        "Checkout initiated: reference={}, user={}, course={}, amount={} {}",
        reference,
        user.id,
        course.id,
        course.price_cents,
        course.currency
    );

    Ok(Json(CheckoutResponse {
        reference,
        authorization_url: init.authorization_url,
    }))
}
