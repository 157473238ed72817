//! Referral ledger read surface - pure reads, no side effects.

use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::ReferralSummary;

pub async fn get_referral_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ReferralSummary>> {
    let conn = state.db.get()?;

    queries::get_user_by_id(&conn, &user_id)?.or_not_found(msg::USER_NOT_FOUND)?;

    let referrer_id = queries::get_referral_relationship(&conn, &user_id)?
        .map(|rel| rel.referrer_id);
    let credits = queries::list_credits_for_referrer(&conn, &user_id)?;
    let total_earned_cents = queries::total_credits_for_referrer(&conn, &user_id)?;

    Ok(Json(ReferralSummary {
        referrer_id,
        credits,
        total_earned_cents,
    }))
}
