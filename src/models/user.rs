use serde::{Deserialize, Serialize};

/// A marketplace user. Authentication and session issuance live outside this
/// service; the core only needs identity, the user's own referral code, and
/// (at signup time) the code they redeemed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Code this user hands out to refer others. Unique per user.
    pub referral_code: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    /// Another user's referral code, redeemed once at signup.
    #[serde(default)]
    pub referral_code: Option<String>,
}
