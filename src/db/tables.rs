use redb::TableDefinition;

/// Users table: user_id (client-generated) -> UserRecord (serialized)
pub const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Referrals table: (referrer_id, referred_id) -> ReferralRecord (serialized)
/// The composite key makes each pair unique
pub const REFERRALS: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("referrals");
