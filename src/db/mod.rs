mod schema;

pub mod from_row;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::notify::NotificationDispatcher;
use crate::payments::PaymentGateway;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and shared services
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (users, courses, transactions, enrollments, ...)
    pub db: DbPool,
    /// Payment gateway used for checkout initiation and verification
    pub gateway: Arc<dyn PaymentGateway>,
    /// Fire-and-forget notification queue
    pub notifier: NotificationDispatcher,
    /// Base URL for gateway callbacks (e.g., https://api.example.com)
    pub base_url: String,
    /// Referrer commission as a percentage of the verified amount
    pub referral_commission_percent: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // Busy timeout makes concurrent settlement writers queue on the SQLite
    // lock instead of failing - serialization per reference depends on it.
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    });
    Pool::builder().max_size(10).build(manager)
}
