use serde::{Deserialize, Serialize};

/// A priced catalog entry. Course content and media delivery are handled
/// elsewhere; settlement only needs the expected price to validate verified
/// payment amounts against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    /// Price in minor currency units (kobo for NGN).
    pub price_cents: i64,
    /// ISO 4217 code, lowercase (e.g., "ngn").
    pub currency: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub price_cents: i64,
    pub currency: String,
}
