use serde::{Deserialize, Serialize};

/// A user's access to a course. "none" is modeled as the absence of a row;
/// at most one row exists per (user, course) pair.
///
/// An enrollment becomes active only through the settlement operation, from
/// exactly one settled verified-success transaction. A refund flips it to
/// `refunded`; a later independent successful payment may re-activate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub granted_at: i64,
    /// The settled transaction that granted (or last re-activated) access.
    pub source_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Refunded,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "refunded" => Ok(Self::Refunded),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
