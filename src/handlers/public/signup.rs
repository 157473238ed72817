//! Referral signup boundary.
//!
//! Registration itself (passwords, sessions) is an external collaborator;
//! this endpoint exists because the immutable referrer->referee link must be
//! recorded before any payment occurs.

use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::Json;
use crate::models::{CreateUser, User};

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: User,
    /// Present when a referral code was redeemed.
    pub referred_by: Option<String>,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<CreateUser>,
) -> Result<Json<SignupResponse>> {
    let conn = state.db.get()?;

    // Resolve the referrer before creating the user so a bad code fails the
    // whole signup instead of silently dropping the referral.
    let referrer = match &request.referral_code {
        Some(code) => Some(
            queries::get_user_by_referral_code(&conn, code)?
                .or_not_found(msg::REFERRAL_CODE_NOT_FOUND)?,
        ),
        None => None,
    };

    let user = queries::create_user(&conn, &request)?;

    let referred_by = match referrer {
        Some(referrer) => {
            queries::create_referral_relationship(&conn, &user.id, &referrer.id)?;
            tracing::info!("User {} signed up referred by {}", user.id, referrer.id);
            Some(referrer.id)
        }
        None => None,
    };

    Ok(Json(SignupResponse { user, referred_by }))
}
