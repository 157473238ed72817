use serde::{Deserialize, Serialize};

/// A user-visible notification row, written by the dispatcher worker and
/// consumed by the read surface. Duplicates are a UX nuisance, not a
/// correctness violation, so delivery is at-least-once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    /// JSON payload with kind-specific details.
    pub payload: String,
    pub created_at: i64,
    pub read_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    EnrollmentConfirmed,
    PaymentFailed,
    RewardCredited,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnrollmentConfirmed => "enrollment_confirmed",
            Self::PaymentFailed => "payment_failed",
            Self::RewardCredited => "reward_credited",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enrollment_confirmed" => Ok(Self::EnrollmentConfirmed),
            "payment_failed" => Ok(Self::PaymentFailed),
            "reward_credited" => Ok(Self::RewardCredited),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
