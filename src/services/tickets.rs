use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, Table};

use crate::constants::REFERRAL_REWARD_TICKETS;
use crate::db::{decode, encode, tables};
use crate::error::{AppError, Result};
use crate::models::{User, UserRecord};

/// Users table as opened inside a write transaction
pub(crate) type UsersTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

/// Result of `initialize`
#[derive(Debug, Clone)]
pub struct InitOutcome {
    pub user: User,
    pub is_new: bool,
}

pub(crate) fn load_user<T>(users: &T, user_id: &str) -> Result<Option<UserRecord>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    users
        .get(user_id)?
        .map(|guard| decode(guard.value()))
        .transpose()
}

pub(crate) fn store_user(
    users: &mut UsersTable<'_>,
    user_id: &str,
    record: &UserRecord,
) -> Result<()> {
    let bytes = encode(record)?;
    users.insert(user_id, bytes.as_slice())?;
    Ok(())
}

/// Return the existing row for `user_id`, or insert a fresh one
///
/// Must run inside a write transaction so the lookup and the insert are
/// not interleaved with another writer.
pub(crate) fn ensure_user(
    users: &mut UsersTable<'_>,
    user_id: &str,
    now: i64,
) -> Result<(UserRecord, bool)> {
    if let Some(existing) = load_user(&*users, user_id)? {
        return Ok((existing, false));
    }

    let record = UserRecord::new(now);
    store_user(users, user_id, &record)?;
    Ok((record, true))
}

/// Add `count` tickets to an existing user. `None` if the user is absent.
pub(crate) fn credit_user(
    users: &mut UsersTable<'_>,
    user_id: &str,
    count: u32,
    now: i64,
) -> Result<Option<u32>> {
    let Some(mut record) = load_user(&*users, user_id)? else {
        return Ok(None);
    };

    let tickets = record.award_tickets(count, now);
    store_user(users, user_id, &record)?;
    Ok(Some(tickets))
}

/// Load, modify and store one user row in a single write transaction
///
/// An error from `apply` drops the transaction uncommitted.
fn update_user<T, F>(db: &Database, user_id: &str, apply: F) -> Result<T>
where
    F: FnOnce(&mut UserRecord, i64) -> Result<T>,
{
    let now = Utc::now().timestamp();

    let write_txn = db.begin_write()?;
    let result = {
        let mut users = write_txn.open_table(tables::USERS)?;
        let mut record = load_user(&users, user_id)?.ok_or(AppError::UserNotFound)?;
        let result = apply(&mut record, now)?;
        store_user(&mut users, user_id, &record)?;
        result
    };
    write_txn.commit()?;

    Ok(result)
}

/// Fetch the user, creating it with the starting ticket on first contact
///
/// Existing users are served from a read transaction. A miss falls through
/// to a write transaction that checks again before inserting, so when two
/// first-contact requests race, the later one returns the row the earlier
/// one created.
pub fn initialize(db: &Database, user_id: &str) -> Result<InitOutcome> {
    {
        let read_txn = db.begin_read()?;
        let users = read_txn.open_table(tables::USERS)?;
        if let Some(record) = load_user(&users, user_id)? {
            return Ok(InitOutcome {
                user: User::from_record(user_id, &record),
                is_new: false,
            });
        }
    }

    let now = Utc::now().timestamp();

    let write_txn = db.begin_write()?;
    let (record, is_new) = {
        let mut users = write_txn.open_table(tables::USERS)?;
        ensure_user(&mut users, user_id, now)?
    };
    write_txn.commit()?;

    if is_new {
        tracing::info!("New user initialized: {}", user_id);
    } else {
        tracing::info!("User {} was created concurrently, returning existing row", user_id);
    }

    Ok(InitOutcome {
        user: User::from_record(user_id, &record),
        is_new,
    })
}

/// Current ticket count
pub fn get_tickets(db: &Database, user_id: &str) -> Result<u32> {
    let read_txn = db.begin_read()?;
    let users = read_txn.open_table(tables::USERS)?;

    load_user(&users, user_id)?
        .map(|record| record.tickets)
        .ok_or(AppError::UserNotFound)
}

/// Spend one ticket to start an attempt, returning the remaining count
pub fn consume(db: &Database, user_id: &str) -> Result<u32> {
    let remaining = update_user(db, user_id, |record, now| record.consume_ticket(now))
        .inspect_err(|e| {
            if matches!(e, AppError::InsufficientTickets) {
                tracing::warn!("User {} tried to start without a ticket", user_id);
            }
        })?;

    tracing::info!("Ticket consumed by {}: {} remaining", user_id, remaining);
    Ok(remaining)
}

/// Grant one referral ticket, returning the new count
pub fn award(db: &Database, user_id: &str) -> Result<u32> {
    let now = Utc::now().timestamp();

    let write_txn = db.begin_write()?;
    let tickets = {
        let mut users = write_txn.open_table(tables::USERS)?;
        credit_user(&mut users, user_id, REFERRAL_REWARD_TICKETS, now)?
            .ok_or(AppError::UserNotFound)?
    };
    write_txn.commit()?;

    tracing::info!("Ticket awarded to {}: {} total", user_id, tickets);
    Ok(tickets)
}

/// Flag the user as having completed the quiz
pub fn mark_completed(db: &Database, user_id: &str) -> Result<User> {
    let (record, changed) = update_user(db, user_id, |record, now| {
        let changed = record.mark_completed(now);
        Ok((record.clone(), changed))
    })?;

    if changed {
        tracing::info!("User {} completed the quiz", user_id);
    }

    Ok(User::from_record(user_id, &record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_database, Db};
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Db) {
        let temp_dir = TempDir::new().unwrap();
        let db = open_database(temp_dir.path().join("test.db")).unwrap();
        (temp_dir, db)
    }

    fn user_count(db: &Database) -> u64 {
        use redb::ReadableTableMetadata;
        let read_txn = db.begin_read().unwrap();
        read_txn.open_table(tables::USERS).unwrap().len().unwrap()
    }

    #[test]
    fn test_initialize_creates_then_returns_existing() {
        let (_dir, db) = test_db();

        let first = initialize(&db, "u1").unwrap();
        assert!(first.is_new);
        assert_eq!(first.user.tickets, 1);
        assert!(!first.user.is_completed);

        let second = initialize(&db, "u1").unwrap();
        assert!(!second.is_new);
        assert_eq!(second.user.tickets, 1);

        assert_eq!(user_count(&db), 1);
    }

    #[test]
    fn test_initialize_does_not_reset_state() {
        let (_dir, db) = test_db();

        initialize(&db, "u1").unwrap();
        consume(&db, "u1").unwrap();
        mark_completed(&db, "u1").unwrap();

        let again = initialize(&db, "u1").unwrap();
        assert!(!again.is_new);
        assert_eq!(again.user.tickets, 0);
        assert!(again.user.is_completed);
    }

    #[test]
    fn test_concurrent_initialize_creates_one_row() {
        let (_dir, db) = test_db();
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let db = db.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    initialize(&db, "racer").unwrap()
                })
            })
            .collect();

        let outcomes: Vec<InitOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_new).count(), 1);
        assert!(outcomes.iter().all(|o| o.user.tickets == 1));
        assert_eq!(user_count(&db), 1);
    }

    #[test]
    fn test_get_tickets() {
        let (_dir, db) = test_db();

        assert!(matches!(get_tickets(&db, "ghost"), Err(AppError::UserNotFound)));

        initialize(&db, "u1").unwrap();
        assert_eq!(get_tickets(&db, "u1").unwrap(), 1);
    }

    #[test]
    fn test_consume_never_goes_negative() {
        let (_dir, db) = test_db();
        initialize(&db, "u1").unwrap();

        assert_eq!(consume(&db, "u1").unwrap(), 0);
        assert!(matches!(consume(&db, "u1"), Err(AppError::InsufficientTickets)));
        assert_eq!(get_tickets(&db, "u1").unwrap(), 0);
    }

    #[test]
    fn test_consume_unknown_user() {
        let (_dir, db) = test_db();
        assert!(matches!(consume(&db, "ghost"), Err(AppError::UserNotFound)));
    }

    #[test]
    fn test_award_increments() {
        let (_dir, db) = test_db();
        initialize(&db, "u1").unwrap();

        assert_eq!(award(&db, "u1").unwrap(), 2);
        assert_eq!(award(&db, "u1").unwrap(), 3);
        assert_eq!(consume(&db, "u1").unwrap(), 2);
    }

    #[test]
    fn test_award_unknown_user() {
        let (_dir, db) = test_db();
        assert!(matches!(award(&db, "ghost"), Err(AppError::UserNotFound)));
        assert_eq!(user_count(&db), 0);
    }

    #[test]
    fn test_concurrent_consume_has_no_lost_updates() {
        let (_dir, db) = test_db();
        initialize(&db, "u1").unwrap();
        for _ in 0..4 {
            award(&db, "u1").unwrap();
        }

        let threads = 10;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let db = db.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    consume(&db, "u1")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AppError::InsufficientTickets)));
        assert_eq!(get_tickets(&db, "u1").unwrap(), 0);
    }

    #[test]
    fn test_mark_completed() {
        let (_dir, db) = test_db();

        assert!(matches!(mark_completed(&db, "ghost"), Err(AppError::UserNotFound)));

        initialize(&db, "u1").unwrap();
        let user = mark_completed(&db, "u1").unwrap();
        assert!(user.is_completed);

        // Idempotent
        let user = mark_completed(&db, "u1").unwrap();
        assert!(user.is_completed);
        assert_eq!(user.tickets, 1);
    }
}
