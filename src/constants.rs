/// Tickets granted to a user on first contact
pub const INITIAL_TICKETS: u32 = 1;

/// Tickets granted to a referrer per successful referral
pub const REFERRAL_REWARD_TICKETS: u32 = 1;

/// Maximum accepted length of a client-generated user ID
/// Web client IDs look like `user_1733788800000_k3j9x2a7q` (~26 chars)
pub const MAX_USER_ID_LEN: usize = 128;

/// bincode configuration shared by every table codec
pub const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a missing or empty user ID
pub const ERR_USER_ID_REQUIRED: &str = "User ID is required";

/// Error message for a user ID with unsupported characters or length
pub const ERR_INVALID_USER_ID: &str =
    "User ID must be 1-128 characters of letters, digits, '_' or '-'";

/// Error message when either side of a referral is missing
pub const ERR_REFERRAL_IDS_REQUIRED: &str = "Both referrer ID and referred ID are required";

// =============================================================================
// Response Messages
// =============================================================================

/// Referral pair recorded and referrer credited
pub const MSG_TICKET_AWARDED: &str = "Ticket awarded to referrer";

/// Referral pair already on record
pub const MSG_ALREADY_REFERRED: &str = "User has already been referred by this referrer";
