//! Prefixed ID generation for Coursepay entities.
//!
//! All IDs use a `cp_` brand prefix to guarantee collision avoidance with
//! payment gateway identifiers (Paystack's `trx_`, `CUS_`, etc.).
//!
//! Format: `cp_{entity}_{uuid_simple}` (32 hex chars, no hyphens). The
//! transaction prefix doubles as the payment reference namespace: references
//! are pre-generated here at checkout, then handed to the gateway.

use uuid::Uuid;

/// All known entity prefixes for validation.
const ALL_PREFIXES: &[&str] = &[
    "cp_usr_",
    "cp_crs_",
    "cp_txn_",
    "cp_enr_",
    "cp_cred_",
    "cp_ntf_",
];

/// Validate that a string is a valid Coursepay prefixed ID.
///
/// This is a cheap check to reject garbage before hitting the database.
/// Validates format: `cp_{entity}_{32_hex_chars}`
pub fn is_valid_prefixed_id(s: &str) -> bool {
    let Some(prefix) = ALL_PREFIXES.iter().find(|p| s.starts_with(*p)) else {
        return false;
    };

    let hex_part = &s[prefix.len()..];

    hex_part.len() == 32 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Entity types that have prefixed IDs in Coursepay.
#[derive(Debug, Clone, Copy)]
pub enum EntityType {
    User,
    Course,
    Transaction,
    Enrollment,
    ReferralCredit,
    Notification,
}

impl EntityType {
    /// Returns the prefix for this entity type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "cp_usr",
            Self::Course => "cp_crs",
            Self::Transaction => "cp_txn",
            Self::Enrollment => "cp_enr",
            Self::ReferralCredit => "cp_cred",
            Self::Notification => "cp_ntf",
        }
    }

    /// Generates a new prefixed ID for this entity type.
    pub fn gen_id(&self) -> String {
        format!("{}_{}", self.prefix(), Uuid::new_v4().as_simple())
    }
}

/// Generate a short referral code a user can hand out.
///
/// 10 hex chars from a fresh UUID - short enough to share, long enough that
/// collisions are rejected by the UNIQUE constraint and retried by signup.
pub fn gen_referral_code() -> String {
    Uuid::new_v4().as_simple().to_string()[..10].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_format() {
        let id = EntityType::Transaction.gen_id();
        assert!(id.starts_with("cp_txn_"));
        // cp_txn_ (7 chars) + 32 hex chars = 39 chars total
        assert_eq!(id.len(), 39);
    }

    #[test]
    fn test_all_prefixes_unique() {
        let prefixes = [
            EntityType::User.prefix(),
            EntityType::Course.prefix(),
            EntityType::Transaction.prefix(),
            EntityType::Enrollment.prefix(),
            EntityType::ReferralCredit.prefix(),
            EntityType::Notification.prefix(),
        ];

        let mut seen = std::collections::HashSet::new();
        for prefix in prefixes {
            assert!(seen.insert(prefix), "Duplicate prefix found: {}", prefix);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let id1 = EntityType::Transaction.gen_id();
        let id2 = EntityType::Transaction.gen_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_is_valid_prefixed_id() {
        assert!(is_valid_prefixed_id("cp_usr_a1b2c3d4e5f6789012345678901234ab"));
        assert!(is_valid_prefixed_id("cp_txn_00000000000000000000000000000000"));

        assert!(is_valid_prefixed_id(&EntityType::User.gen_id()));
        assert!(is_valid_prefixed_id(&EntityType::Enrollment.gen_id()));

        assert!(!is_valid_prefixed_id("")); // empty
        assert!(!is_valid_prefixed_id("a1b2c3d4-e5f6-7890-1234-567890123456")); // plain UUID
        assert!(!is_valid_prefixed_id("cp_unknown_a1b2c3d4e5f6789012345678901234ab")); // unknown prefix
        assert!(!is_valid_prefixed_id("cp_usr_a1b2c3d4")); // too short
        assert!(!is_valid_prefixed_id("cp_usr_a1b2c3d4e5f6789012345678901234gg")); // non-hex
        assert!(!is_valid_prefixed_id("txn_a1b2c3d4e5f6789012345678901234ab")); // missing cp_
    }

    #[test]
    fn test_referral_code_shape() {
        let code = gen_referral_code();
        assert_eq!(code.len(), 10);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
