mod checkout;
mod enrollments;
mod notifications;
mod referrals;
mod signup;
mod verify;

pub use checkout::*;
pub use enrollments::*;
pub use notifications::*;
pub use referrals::*;
pub use signup::*;
pub use verify::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/checkout", post(initiate_checkout))
        .route("/payments/verify", get(verify_payment))
        .route("/enrollments/{user_id}", get(list_enrollments))
        .route("/referrals/{user_id}", get(get_referral_summary))
        .route("/notifications/{user_id}", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_notification_read))
}
