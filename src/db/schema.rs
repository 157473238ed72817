use rusqlite::Connection;

/// Initialize the database schema.
///
/// The settlement invariants live here, not in application code:
/// - `transaction_refs.status` is the per-reference idempotency root,
///   flipped by a single conditional UPDATE;
/// - `enrollments` UNIQUE(user_id, course_id) keeps access at one row per
///   pair;
/// - `referral_credits` UNIQUE(referrer_id, referee_id) is the
///   first-paid-enrollment-only rule, race-safe without locking.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;

        -- Users (identity boundary - auth/session issuance is external)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            referral_code TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        CREATE INDEX IF NOT EXISTS idx_users_referral_code ON users(referral_code);

        -- Courses (priced catalog entries; content lives elsewhere)
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Transaction references (one row per payment attempt, never deleted)
        -- Strictly-forward status; settled is terminal. The conditional
        -- UPDATE in queries::try_mark_settled is the only way to reach it.
        CREATE TABLE IF NOT EXISTS transaction_refs (
            reference TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            course_id TEXT NOT NULL REFERENCES courses(id),
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'initiated'
                CHECK (status IN ('initiated', 'verified_success', 'verified_failed', 'settled')),
            outcome TEXT CHECK (outcome IS NULL OR outcome IN ('success', 'failed')),
            created_at INTEGER NOT NULL,
            settled_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_transaction_refs_user ON transaction_refs(user_id);
        CREATE INDEX IF NOT EXISTS idx_transaction_refs_course ON transaction_refs(course_id);

        -- Enrollments ("none" = absent row; at most one per user/course)
        CREATE TABLE IF NOT EXISTS enrollments (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            course_id TEXT NOT NULL REFERENCES courses(id),
            status TEXT NOT NULL CHECK (status IN ('active', 'refunded')),
            granted_at INTEGER NOT NULL,
            source_reference TEXT NOT NULL REFERENCES transaction_refs(reference),
            UNIQUE(user_id, course_id)
        );
        CREATE INDEX IF NOT EXISTS idx_enrollments_user ON enrollments(user_id);
        CREATE INDEX IF NOT EXISTS idx_enrollments_source ON enrollments(source_reference);

        -- Referral relationships (a user has at most one referrer, immutable)
        CREATE TABLE IF NOT EXISTS referral_relationships (
            referee_id TEXT PRIMARY KEY REFERENCES users(id),
            referrer_id TEXT NOT NULL REFERENCES users(id),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_referral_relationships_referrer
            ON referral_relationships(referrer_id);

        -- Referral credits (one per referrer/referee pair, ever)
        CREATE TABLE IF NOT EXISTS referral_credits (
            id TEXT PRIMARY KEY,
            referrer_id TEXT NOT NULL REFERENCES users(id),
            referee_id TEXT NOT NULL REFERENCES users(id),
            source_reference TEXT NOT NULL REFERENCES transaction_refs(reference),
            amount_cents INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(referrer_id, referee_id)
        );
        CREATE INDEX IF NOT EXISTS idx_referral_credits_referrer ON referral_credits(referrer_id);

        -- Notifications (written by the dispatcher worker)
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            kind TEXT NOT NULL
                CHECK (kind IN ('enrollment_confirmed', 'payment_failed', 'reward_credited')),
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            read_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user_time
            ON notifications(user_id, created_at DESC);
        "#,
    )?;
    Ok(())
}
