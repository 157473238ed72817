use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode};

use crate::error::{AppError, Result};
use crate::id::{gen_referral_code, EntityType};
use crate::models::*;

use super::from_row::{
    query_all, query_one, COURSE_COLS, ENROLLMENT_COLS, NOTIFICATION_COLS, REFERRAL_CREDIT_COLS,
    REFERRAL_RELATIONSHIP_COLS, TRANSACTION_REF_COLS, USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

/// True when the error is a UNIQUE / PRIMARY KEY constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ============ Users ============

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = EntityType::User.gen_id();
    let referral_code = gen_referral_code();
    let created_at = now();

    conn.execute(
        "INSERT INTO users (id, email, name, referral_code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, &input.email, &input.name, &referral_code, created_at],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("User with email {} already exists", input.email))
        } else {
            e.into()
        }
    })?;

    Ok(User {
        id,
        email: input.email.clone(),
        name: input.name.clone(),
        referral_code,
        created_at,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_referral_code(conn: &Connection, code: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE referral_code = ?1", USER_COLS),
        &[&code],
    )
}

// ============ Courses ============

pub fn create_course(conn: &Connection, input: &CreateCourse) -> Result<Course> {
    let id = EntityType::Course.gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO courses (id, title, price_cents, currency, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, &input.title, input.price_cents, &input.currency, created_at],
    )?;

    Ok(Course {
        id,
        title: input.title.clone(),
        price_cents: input.price_cents,
        currency: input.currency.clone(),
        created_at,
    })
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLS),
        &[&id],
    )
}

// ============ Transaction Reference Store ============

/// Open a new payment attempt. Fails with `Conflict` if the reference is
/// already taken - the client must request a fresh reference.
pub fn create_transaction_ref(
    conn: &Connection,
    input: &CreateTransactionRef,
) -> Result<TransactionReference> {
    let created_at = now();

    conn.execute(
        "INSERT INTO transaction_refs
             (reference, user_id, course_id, amount_cents, currency, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'initiated', ?6)",
        params![
            &input.reference,
            &input.user_id,
            &input.course_id,
            input.amount_cents,
            &input.currency,
            created_at
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(crate::error::msg::DUPLICATE_REFERENCE.to_string())
        } else {
            e.into()
        }
    })?;

    Ok(TransactionReference {
        reference: input.reference.clone(),
        user_id: input.user_id.clone(),
        course_id: input.course_id.clone(),
        amount_cents: input.amount_cents,
        currency: input.currency.clone(),
        status: TxnStatus::Initiated,
        outcome: None,
        created_at,
        settled_at: None,
    })
}

pub fn get_transaction_ref(
    conn: &Connection,
    reference: &str,
) -> Result<Option<TransactionReference>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM transaction_refs WHERE reference = ?1",
            TRANSACTION_REF_COLS
        ),
        &[&reference],
    )
}

/// Record what verification found while the reference is still live.
///
/// Informational only - the row stays open for settlement either way, and a
/// crash between this write and `try_mark_settled` leaves a resumable trail.
/// Only `verified_success` / `verified_failed` are meaningful here.
pub fn record_verified_status(
    conn: &Connection,
    reference: &str,
    status: TxnStatus,
) -> Result<()> {
    conn.execute(
        "UPDATE transaction_refs SET status = ?1 WHERE reference = ?2 AND status = 'initiated'",
        params![status.as_str(), reference],
    )?;
    Ok(())
}

/// Atomically settle a transaction reference, returning whether *this* call
/// performed the transition.
///
/// Uses compare-and-swap so that of N concurrent settlement attempts for one
/// reference (webhook redeliveries racing client polls), exactly one caller
/// ever observes `true` and proceeds to cascade side effects.
///
/// Returns:
/// - `Ok(true)` if this call settled the reference (was not already settled)
/// - `Ok(false)` if another caller settled it first
pub fn try_mark_settled(conn: &Connection, reference: &str, outcome: TxnOutcome) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE transaction_refs
            SET status = 'settled', outcome = ?1, settled_at = ?2
          WHERE reference = ?3 AND status != 'settled'",
        params![outcome.as_str(), now(), reference],
    )?;
    Ok(affected > 0)
}

// ============ Enrollments ============

/// Grant (or re-activate) course access as part of a settlement.
///
/// UPSERT against UNIQUE(user_id, course_id): a missing row is created
/// active; a refunded row is re-activated and re-pointed at the new source
/// transaction; an already-active row is left untouched - a second
/// successful payment across a different reference is a no-op re-grant.
pub fn grant_enrollment(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
    source_reference: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO enrollments (id, user_id, course_id, status, granted_at, source_reference)
         VALUES (?1, ?2, ?3, 'active', ?4, ?5)
         ON CONFLICT(user_id, course_id) DO UPDATE SET
             status = 'active',
             granted_at = excluded.granted_at,
             source_reference = excluded.source_reference
         WHERE enrollments.status = 'refunded'",
        params![
            EntityType::Enrollment.gen_id(),
            user_id,
            course_id,
            now(),
            source_reference
        ],
    )?;
    Ok(())
}

pub fn get_enrollment(
    conn: &Connection,
    user_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
            ENROLLMENT_COLS
        ),
        &[&user_id, &course_id],
    )
}

pub fn list_enrollments_for_user(conn: &Connection, user_id: &str) -> Result<Vec<Enrollment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM enrollments WHERE user_id = ?1 ORDER BY granted_at DESC",
            ENROLLMENT_COLS
        ),
        &[&user_id],
    )
}

/// Revoke the enrollment backed by a refunded payment.
///
/// Matches on source_reference so a refund of a superseded payment (one
/// whose enrollment was since re-granted by a newer transaction) revokes
/// nothing. Returns whether an enrollment was revoked.
pub fn refund_enrollment_by_reference(conn: &Connection, reference: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE enrollments SET status = 'refunded'
          WHERE source_reference = ?1 AND status = 'active'",
        params![reference],
    )?;
    Ok(affected > 0)
}

// ============ Referral Ledger ============

/// Record who referred a new user. Set once at signup, immutable - a second
/// insert for the same referee is a conflict, never an update.
pub fn create_referral_relationship(
    conn: &Connection,
    referee_id: &str,
    referrer_id: &str,
) -> Result<ReferralRelationship> {
    let created_at = now();

    conn.execute(
        "INSERT INTO referral_relationships (referee_id, referrer_id, created_at)
         VALUES (?1, ?2, ?3)",
        params![referee_id, referrer_id, created_at],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("User already has a referrer".to_string())
        } else {
            e.into()
        }
    })?;

    Ok(ReferralRelationship {
        referee_id: referee_id.to_string(),
        referrer_id: referrer_id.to_string(),
        created_at,
    })
}

pub fn get_referral_relationship(
    conn: &Connection,
    referee_id: &str,
) -> Result<Option<ReferralRelationship>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM referral_relationships WHERE referee_id = ?1",
            REFERRAL_RELATIONSHIP_COLS
        ),
        &[&referee_id],
    )
}

/// Atomically insert a referral credit, returning true if this is the first
/// credit for the (referrer, referee) pair.
///
/// Uses INSERT OR IGNORE against the UNIQUE index for atomicity - even if
/// settlement were invoked for two different references tied to the same
/// referee, only the first insert lands. This is the ledger's own
/// idempotency boundary, independent of per-reference settlement.
pub fn try_insert_referral_credit(
    conn: &Connection,
    input: &CreateReferralCredit,
) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO referral_credits
             (id, referrer_id, referee_id, source_reference, amount_cents, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            EntityType::ReferralCredit.gen_id(),
            &input.referrer_id,
            &input.referee_id,
            &input.source_reference,
            input.amount_cents,
            now()
        ],
    )?;
    Ok(affected > 0)
}

pub fn list_credits_for_referrer(
    conn: &Connection,
    referrer_id: &str,
) -> Result<Vec<ReferralCredit>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM referral_credits WHERE referrer_id = ?1 ORDER BY created_at DESC",
            REFERRAL_CREDIT_COLS
        ),
        &[&referrer_id],
    )
}

pub fn total_credits_for_referrer(conn: &Connection, referrer_id: &str) -> Result<i64> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM referral_credits WHERE referrer_id = ?1",
        params![referrer_id],
        |row| row.get(0),
    )?;
    Ok(total)
}

// ============ Notifications ============

pub fn create_notification(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    payload: &str,
) -> Result<Notification> {
    let id = EntityType::Notification.gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, payload, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![&id, user_id, kind.as_str(), payload, created_at],
    )?;

    Ok(Notification {
        id,
        user_id: user_id.to_string(),
        kind,
        payload: payload.to_string(),
        created_at,
        read_at: None,
    })
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Notification>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM notifications
              WHERE user_id = ?1
              ORDER BY rowid DESC
              LIMIT ?2 OFFSET ?3",
            NOTIFICATION_COLS
        ),
        &[&user_id, &limit, &offset],
    )
}

pub fn count_notifications(conn: &Connection, user_id: &str) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Mark a notification read. Returns whether a row was updated.
pub fn mark_notification_read(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE notifications SET read_at = ?1 WHERE id = ?2 AND read_at IS NULL",
        params![now(), id],
    )?;
    Ok(affected > 0)
}
