//! Enrollment read surface - pure reads for course-access checks.

use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::Enrollment;

pub async fn list_enrollments(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Enrollment>>> {
    let conn = state.db.get()?;

    queries::get_user_by_id(&conn, &user_id)?.or_not_found(msg::USER_NOT_FOUND)?;

    let enrollments = queries::list_enrollments_for_user(&conn, &user_id)?;
    Ok(Json(enrollments))
}
