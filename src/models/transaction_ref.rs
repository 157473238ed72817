use serde::{Deserialize, Serialize};

/// Durable record of one payment attempt, keyed by a pre-generated reference.
/// This row is the deduplication root: both the webhook and the client poll
/// converge on it, and `try_mark_settled` decides which caller owns the
/// side effects.
///
/// Rows are never deleted - settled references are the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReference {
    pub reference: String,
    pub user_id: String,
    pub course_id: String,
    /// Amount in minor currency units, frozen at checkout time.
    pub amount_cents: i64,
    pub currency: String,
    pub status: TxnStatus,
    /// Set by the settling caller; None while the reference is live.
    pub outcome: Option<TxnOutcome>,
    pub created_at: i64,
    pub settled_at: Option<i64>,
}

impl TransactionReference {
    pub fn is_settled(&self) -> bool {
        self.status == TxnStatus::Settled
    }
}

/// Lifecycle of a transaction reference. Transitions are strictly forward:
/// `initiated -> verified_success | verified_failed -> settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnStatus {
    Initiated,
    VerifiedSuccess,
    VerifiedFailed,
    Settled,
}

impl TxnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::VerifiedSuccess => "verified_success",
            Self::VerifiedFailed => "verified_failed",
            Self::Settled => "settled",
        }
    }
}

impl std::str::FromStr for TxnStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(Self::Initiated),
            "verified_success" => Ok(Self::VerifiedSuccess),
            "verified_failed" => Ok(Self::VerifiedFailed),
            "settled" => Ok(Self::Settled),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final verdict recorded when a reference settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnOutcome {
    Success,
    Failed,
}

impl TxnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TxnOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for TxnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data required to open a new payment attempt at checkout.
#[derive(Debug, Clone)]
pub struct CreateTransactionRef {
    pub reference: String,
    pub user_id: String,
    pub course_id: String,
    pub amount_cents: i64,
    pub currency: String,
}
