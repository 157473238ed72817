//! Notification dispatch.
//!
//! Settlement and the webhook paths never write notification rows directly -
//! they push events onto an unbounded queue and move on. A single background
//! worker drains the queue and persists rows, so notification storage
//! failures can never unwind a settlement, and per-user ordering follows
//! enqueue order.
//!
//! Delivery is at-least-once: a duplicate notification is a UX nuisance, not
//! a correctness violation, unlike payment and referral state.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::db::{queries, DbPool};
use crate::models::NotificationKind;

/// One queued user-visible event.
#[derive(Debug)]
struct QueuedNotification {
    user_id: String,
    kind: NotificationKind,
    payload: serde_json::Value,
}

/// Cloneable handle to the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<QueuedNotification>,
}

impl NotificationDispatcher {
    /// Start the dispatcher worker on the current runtime.
    ///
    /// Panics in the worker are caught and logged rather than silently
    /// killing notification delivery for the rest of the process.
    pub fn spawn(pool: DbPool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(
            AssertUnwindSafe(worker(pool, rx)).catch_unwind().map(|result| {
                if let Err(panic) = result {
                    let panic_msg = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!("Notification worker panicked: {}", panic_msg);
                }
            }),
        );

        Self { tx }
    }

    /// Queue a notification. Fire-and-forget: enqueue failures are logged,
    /// never surfaced to the caller.
    pub fn enqueue(&self, user_id: &str, kind: NotificationKind, payload: serde_json::Value) {
        let queued = QueuedNotification {
            user_id: user_id.to_string(),
            kind,
            payload,
        };
        if self.tx.send(queued).is_err() {
            tracing::warn!("Notification queue closed, dropping {} event", kind);
        }
    }
}

async fn worker(pool: DbPool, mut rx: mpsc::UnboundedReceiver<QueuedNotification>) {
    while let Some(event) = rx.recv().await {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    "Notification worker: no DB connection, dropping {} for {}: {}",
                    event.kind,
                    event.user_id,
                    e
                );
                continue;
            }
        };

        let payload = event.payload.to_string();
        if let Err(e) = queries::create_notification(&conn, &event.user_id, event.kind, &payload) {
            tracing::warn!(
                "Notification worker: failed to write {} for {}: {}",
                event.kind,
                event.user_id,
                e
            );
        } else {
            tracing::debug!("Notification {} queued for {}", event.kind, event.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use r2d2::Pool;
    use r2d2_sqlite::SqliteConnectionManager;
    use std::time::Duration;

    fn test_pool() -> DbPool {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(2).build(manager).unwrap();
        {
            let conn = pool.get().unwrap();
            init_db(&conn).unwrap();
            conn.execute_batch(
                "INSERT INTO users (id, email, name, referral_code, created_at)
                 VALUES ('cp_usr_00000000000000000000000000000001', 'a@example.com', 'A', 'CODEA00001', 0)",
            )
            .unwrap();
        }
        pool
    }

    #[tokio::test]
    async fn test_enqueue_writes_row() {
        let pool = test_pool();
        let dispatcher = NotificationDispatcher::spawn(pool.clone());
        let user_id = "cp_usr_00000000000000000000000000000001";

        dispatcher.enqueue(
            user_id,
            NotificationKind::EnrollmentConfirmed,
            serde_json::json!({"course_id": "cp_crs_x"}),
        );

        // Worker is asynchronous; poll briefly for the row to land
        let mut rows = Vec::new();
        for _ in 0..50 {
            let conn = pool.get().unwrap();
            rows = queries::list_notifications(&conn, user_id, 10, 0).unwrap();
            if !rows.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, NotificationKind::EnrollmentConfirmed);
        assert!(rows[0].read_at.is_none());
    }

    #[tokio::test]
    async fn test_per_user_order_follows_enqueue_order() {
        let pool = test_pool();
        let dispatcher = NotificationDispatcher::spawn(pool.clone());
        let user_id = "cp_usr_00000000000000000000000000000001";

        dispatcher.enqueue(user_id, NotificationKind::PaymentFailed, serde_json::json!({"n": 1}));
        dispatcher.enqueue(user_id, NotificationKind::EnrollmentConfirmed, serde_json::json!({"n": 2}));
        dispatcher.enqueue(user_id, NotificationKind::RewardCredited, serde_json::json!({"n": 3}));

        let mut rows = Vec::new();
        for _ in 0..50 {
            let conn = pool.get().unwrap();
            rows = queries::list_notifications(&conn, user_id, 10, 0).unwrap();
            if rows.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(rows.len(), 3);
        // list is newest-first; enqueue order was 1, 2, 3
        let payloads: Vec<serde_json::Value> = rows
            .iter()
            .rev()
            .map(|n| serde_json::from_str(&n.payload).unwrap())
            .collect();
        assert_eq!(payloads[0]["n"], 1);
        assert_eq!(payloads[1]["n"], 2);
        assert_eq!(payloads[2]["n"], 3);
    }
}
