//! Ticket and referral ledger
//!
//! Each operation is synchronous and runs in its own redb transaction.
//! Route handlers call these through `spawn_blocking`.

pub mod referrals;
pub mod tickets;
