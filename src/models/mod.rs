pub mod referral;
pub mod user;

pub use referral::{ReferralOutcome, ReferralRecord};
pub use user::{User, UserRecord};
