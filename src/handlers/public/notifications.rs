//! Notification read surface: list and mark-read.

use axum::extract::State;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{msg, OptionExt, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::Notification;
use crate::pagination::{Paginated, PaginationQuery};

pub async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Paginated<Notification>>> {
    let conn = state.db.get()?;

    queries::get_user_by_id(&conn, &user_id)?.or_not_found(msg::USER_NOT_FOUND)?;

    let limit = pagination.limit();
    let offset = pagination.offset();
    let items = queries::list_notifications(&conn, &user_id, limit, offset)?;
    let total = queries::count_notifications(&conn, &user_id)?;

    Ok(Json(Paginated::new(items, total, limit, offset)))
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub updated: bool,
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MarkReadResponse>> {
    let conn = state.db.get()?;

    let updated = queries::mark_notification_read(&conn, &id)?;
    if !updated {
        // Distinguish "already read" from "no such notification"
        let exists = conn
            .query_row(
                "SELECT 1 FROM notifications WHERE id = ?1",
                rusqlite::params![&id],
                |_| Ok(()),
            )
            .is_ok();
        if !exists {
            return Err(crate::error::AppError::NotFound(
                msg::NOTIFICATION_NOT_FOUND.into(),
            ));
        }
    }

    Ok(Json(MarkReadResponse { updated }))
}
