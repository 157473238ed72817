mod course;
mod enrollment;
mod notification;
mod referral;
mod transaction_ref;
mod user;

pub use course::*;
pub use enrollment::*;
pub use notification::*;
pub use referral::*;
pub use transaction_ref::*;
pub use user::*;
