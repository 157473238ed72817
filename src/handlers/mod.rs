pub mod public;
pub mod webhooks;

use axum::Router;

use crate::db::AppState;

pub fn router() -> Router<AppState> {
    Router::new().merge(public::router()).merge(webhooks::router())
}
