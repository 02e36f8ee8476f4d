use serde::{Deserialize, Serialize};

use crate::constants::{INITIAL_TICKETS, MAX_USER_ID_LEN};
use crate::error::{AppError, Result};

/// User record stored in redb
/// Uses Unix timestamps for compact storage with bincode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Remaining quiz attempts
    pub tickets: u32,
    /// Whether the user has answered every question correctly
    pub is_completed: bool,
    /// When the user was created (Unix timestamp)
    pub created_at: i64,
    /// When the ticket count or completion flag last changed (Unix timestamp)
    pub updated_at: i64,
    /// When the user first completed the quiz (Unix timestamp)
    pub completed_at: Option<i64>,
}

impl UserRecord {
    /// Fresh user holding the starting ticket
    pub fn new(now: i64) -> Self {
        Self {
            tickets: INITIAL_TICKETS,
            is_completed: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Spend one ticket, returning the remaining count
    pub fn consume_ticket(&mut self, now: i64) -> Result<u32> {
        if self.tickets == 0 {
            return Err(AppError::InsufficientTickets);
        }

        self.tickets -= 1;
        self.updated_at = now;

        Ok(self.tickets)
    }

    /// Grant `count` tickets, returning the new count
    pub fn award_tickets(&mut self, count: u32, now: i64) -> u32 {
        self.tickets = self.tickets.saturating_add(count);
        self.updated_at = now;
        self.tickets
    }

    /// Set the completion flag. Never cleared once set.
    ///
    /// Returns `true` if this call flipped the flag.
    pub fn mark_completed(&mut self, now: i64) -> bool {
        if self.is_completed {
            return false;
        }

        self.is_completed = true;
        self.completed_at = Some(now);
        self.updated_at = now;
        true
    }
}

/// User model for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub id: String,
    pub tickets: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

impl User {
    pub fn from_record(id: impl Into<String>, record: &UserRecord) -> Self {
        Self {
            id: id.into(),
            tickets: record.tickets,
            is_completed: record.is_completed,
        }
    }

    /// Validate a client-generated user ID
    ///
    /// IDs are opaque, but must be 1..=128 characters of ASCII letters,
    /// digits, `_` or `-`.
    pub fn validate_id(id: &str) -> bool {
        !id.is_empty()
            && id.len() <= MAX_USER_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}
