use serde::{Deserialize, Serialize};

/// Referral record stored in redb, keyed by (referrer_id, referred_id)
///
/// Rows are append-only: written once when the referrer is credited and
/// never updated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralRecord {
    /// Tickets credited to the referrer for this pair
    pub tickets_awarded: u32,
    /// When the referral was recorded (Unix timestamp)
    pub created_at: i64,
}

/// Result of processing a referral link visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// New pair recorded, referrer credited
    Awarded { referrer_tickets: u32 },
    /// Pair was already on record, nothing changed
    AlreadyReferred,
}

impl ReferralOutcome {
    pub fn tickets_awarded(&self) -> bool {
        matches!(self, ReferralOutcome::Awarded { .. })
    }
}
