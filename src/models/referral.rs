use serde::{Deserialize, Serialize};

/// Links a referee to the referrer whose code they redeemed at signup.
/// A user has at most one referrer, set once, immutable - the referee_id
/// is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRelationship {
    pub referee_id: String,
    pub referrer_id: String,
    pub created_at: i64,
}

/// A single commission entry. At most one credit exists per
/// (referrer, referee) pair - the "first paid enrollment only" rule -
/// enforced by a UNIQUE index, not application-level checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralCredit {
    pub id: String,
    pub referrer_id: String,
    pub referee_id: String,
    /// The settled transaction whose success earned this credit.
    pub source_reference: String,
    pub amount_cents: i64,
    pub created_at: i64,
}

/// Read-surface summary for a user's referral dashboard.
#[derive(Debug, Serialize)]
pub struct ReferralSummary {
    /// Who referred this user, if anyone.
    pub referrer_id: Option<String>,
    /// Credits this user has earned as a referrer.
    pub credits: Vec<ReferralCredit>,
    pub total_earned_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateReferralCredit {
    pub referrer_id: String,
    pub referee_id: String,
    pub source_reference: String,
    pub amount_cents: i64,
}
