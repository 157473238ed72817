pub mod paystack;

pub use paystack::handle_paystack_webhook;

use axum::http::StatusCode;
use axum::{routing::post, Router};

use crate::db::AppState;

/// Result type for webhook operations: the acknowledgement code tells the
/// provider's redelivery logic whether to retry.
pub type WebhookResult = (StatusCode, &'static str);

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/paystack", post(handle_paystack_webhook))
}
