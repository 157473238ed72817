//! Row mapping trait and helpers for reducing boilerplate in queries.
//!
//! This module provides a `FromRow` trait that models can implement to
//! define how they are constructed from database rows, plus helper functions
//! for common query patterns.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to rusqlite errors.
///
/// This provides graceful error handling instead of panicking when the
/// database contains invalid enum values (from corruption, migration errors,
/// etc.).
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Parse an optional string column into an optional enum.
fn parse_enum_opt<T: std::str::FromStr>(
    row: &Row,
    col: usize,
    col_name: &str,
) -> rusqlite::Result<Option<T>> {
    match row.get::<_, Option<String>>(col)? {
        None => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                col,
                col_name.to_string(),
                rusqlite::types::Type::Text,
            )
        }),
    }
}

/// Trait for constructing a type from a database row.
///
/// Implementing this trait allows using the `query_one` and `query_all`
/// helper functions, reducing repetitive row mapping closures.
pub trait FromRow: Sized {
    /// Construct an instance from a database row.
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const USER_COLS: &str = "id, email, name, referral_code, created_at";

pub const COURSE_COLS: &str = "id, title, price_cents, currency, created_at";

pub const TRANSACTION_REF_COLS: &str =
    "reference, user_id, course_id, amount_cents, currency, status, outcome, created_at, settled_at";

pub const ENROLLMENT_COLS: &str = "id, user_id, course_id, status, granted_at, source_reference";

pub const REFERRAL_RELATIONSHIP_COLS: &str = "referee_id, referrer_id, created_at";

pub const REFERRAL_CREDIT_COLS: &str =
    "id, referrer_id, referee_id, source_reference, amount_cents, created_at";

pub const NOTIFICATION_COLS: &str = "id, user_id, kind, payload, created_at, read_at";

// ============ FromRow Implementations ============

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            referral_code: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            price_cents: row.get(2)?,
            currency: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl FromRow for TransactionReference {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(TransactionReference {
            reference: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            amount_cents: row.get(3)?,
            currency: row.get(4)?,
            status: parse_enum(row, 5, "status")?,
            outcome: parse_enum_opt(row, 6, "outcome")?,
            created_at: row.get(7)?,
            settled_at: row.get(8)?,
        })
    }
}

impl FromRow for Enrollment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Enrollment {
            id: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            granted_at: row.get(4)?,
            source_reference: row.get(5)?,
        })
    }
}

impl FromRow for ReferralRelationship {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ReferralRelationship {
            referee_id: row.get(0)?,
            referrer_id: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl FromRow for ReferralCredit {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(ReferralCredit {
            id: row.get(0)?,
            referrer_id: row.get(1)?,
            referee_id: row.get(2)?,
            source_reference: row.get(3)?,
            amount_cents: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for Notification {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            kind: parse_enum(row, 2, "kind")?,
            payload: row.get(3)?,
            created_at: row.get(4)?,
            read_at: row.get(5)?,
        })
    }
}
