//! Test utilities and fixtures for Coursepay integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use coursepay::db::{init_db, queries, AppState, DbPool};
pub use coursepay::error::AppError;
pub use coursepay::handlers;
pub use coursepay::id::EntityType;
pub use coursepay::models::*;
pub use coursepay::notify::NotificationDispatcher;
use coursepay::payments::{CheckoutInit, GatewayError, PaymentGateway, VerifiedPayment};

/// Signature the stub gateway accepts on webhook bodies.
pub const TEST_SIGNATURE: &str = "test-signature";

/// Scripted verification result for one reference.
#[derive(Debug, Clone)]
pub enum StubVerify {
    Success { amount_cents: i64, currency: String },
    Failed { amount_cents: i64, currency: String },
    Pending,
    Unavailable,
}

/// Test double for the payment gateway.
///
/// `verify` answers from a scripted per-reference table; unscripted
/// references behave like the provider has no record of them.
pub struct StubGateway {
    responses: Mutex<HashMap<String, StubVerify>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
        }
    }

    pub fn script(&self, reference: &str, result: StubVerify) {
        self.responses
            .lock()
            .unwrap()
            .insert(reference.to_string(), result);
    }

    /// Script a successful charge of `amount_cents` NGN.
    pub fn script_success(&self, reference: &str, amount_cents: i64) {
        self.script(
            reference,
            StubVerify::Success {
                amount_cents,
                currency: "ngn".to_string(),
            },
        );
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize(
        &self,
        reference: &str,
        _email: &str,
        _amount_cents: i64,
        _currency: &str,
        _callback_url: &str,
    ) -> Result<CheckoutInit, GatewayError> {
        Ok(CheckoutInit {
            authorization_url: format!("https://checkout.test/{}", reference),
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let responses = self.responses.lock().unwrap();
        match responses.get(reference) {
            Some(StubVerify::Success {
                amount_cents,
                currency,
            }) => Ok(VerifiedPayment {
                amount_cents: *amount_cents,
                currency: currency.clone(),
                success: true,
            }),
            Some(StubVerify::Failed {
                amount_cents,
                currency,
            }) => Ok(VerifiedPayment {
                amount_cents: *amount_cents,
                currency: currency.clone(),
                success: false,
            }),
            Some(StubVerify::Pending) => Err(GatewayError::Pending),
            Some(StubVerify::Unavailable) => {
                Err(GatewayError::Unavailable("stubbed outage".to_string()))
            }
            None => Err(GatewayError::NotFound),
        }
    }

    fn verify_webhook_signature(&self, _payload: &[u8], signature: &str) -> bool {
        signature == TEST_SIGNATURE
    }
}

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

fn build_state(pool: DbPool, gateway: Arc<StubGateway>) -> AppState {
    {
        let conn = pool.get().expect("Failed to get db connection");
        init_db(&conn).expect("Failed to initialize schema");
    }
    let notifier = NotificationDispatcher::spawn(pool.clone());

    AppState {
        db: pool,
        gateway,
        notifier,
        base_url: "http://localhost:3000".to_string(),
        referral_commission_percent: 10,
    }
}

/// Create an AppState backed by a shared in-memory database.
///
/// Must be called from within a tokio runtime (the dispatcher worker is
/// spawned on it).
pub fn create_test_app_state() -> (AppState, Arc<StubGateway>) {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(4).build(manager).unwrap();
    let gateway = Arc::new(StubGateway::new());
    (build_state(pool, gateway.clone()), gateway)
}

/// Create an AppState backed by a throwaway on-disk database.
///
/// Needed by tests that exercise genuinely concurrent settlement: separate
/// connections with WAL and a busy timeout serialize writers the way
/// production does, without shared-cache table-lock quirks.
pub fn create_test_app_state_on_disk() -> (AppState, Arc<StubGateway>) {
    let path = std::env::temp_dir().join(format!(
        "coursepay-test-{}.db",
        uuid::Uuid::new_v4().as_simple()
    ));
    let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(())
    });
    let pool = Pool::builder().max_size(8).build(manager).unwrap();
    let gateway = Arc::new(StubGateway::new());
    (build_state(pool, gateway.clone()), gateway)
}

pub fn test_app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Create a test user
pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            email: email.to_string(),
            name: format!("Test User {}", email),
            referral_code: None,
        },
    )
    .expect("Failed to create test user")
}

/// Create a test course priced in NGN minor units
pub fn create_test_course(conn: &Connection, title: &str, price_cents: i64) -> Course {
    queries::create_course(
        conn,
        &CreateCourse {
            title: title.to_string(),
            price_cents,
            currency: "ngn".to_string(),
        },
    )
    .expect("Failed to create test course")
}

/// Open a payment attempt the way /checkout does, returning the reference.
pub fn create_test_transaction(conn: &Connection, user: &User, course: &Course) -> String {
    let reference = EntityType::Transaction.gen_id();
    queries::create_transaction_ref(
        conn,
        &CreateTransactionRef {
            reference: reference.clone(),
            user_id: user.id.clone(),
            course_id: course.id.clone(),
            amount_cents: course.price_cents,
            currency: course.currency.clone(),
        },
    )
    .expect("Failed to create test transaction");
    reference
}

/// Poll until the user has `expected` notification rows (the dispatcher is
/// asynchronous), returning whatever is present at timeout.
pub async fn wait_for_notifications(
    pool: &DbPool,
    user_id: &str,
    expected: usize,
) -> Vec<Notification> {
    let mut rows = Vec::new();
    for _ in 0..100 {
        {
            let conn = pool.get().unwrap();
            rows = queries::list_notifications(&conn, user_id, 50, 0).unwrap();
        }
        if rows.len() >= expected {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    rows
}
