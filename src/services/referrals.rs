use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable};

use crate::constants::REFERRAL_REWARD_TICKETS;
use crate::db::{encode, tables};
use crate::error::{AppError, Result};
use crate::models::{ReferralOutcome, ReferralRecord};
use crate::services::tickets::{credit_user, ensure_user};

/// Record that `referred_id` arrived through `referrer_id`'s shared link
///
/// A pair is credited at most once. The referred user row is created on
/// demand, the referral row is inserted and the referrer is awarded a
/// ticket, all in one write transaction: if the referrer does not exist
/// nothing is written.
pub fn process(db: &Database, referrer_id: &str, referred_id: &str) -> Result<ReferralOutcome> {
    if referrer_id == referred_id {
        tracing::warn!("Self-referral rejected for {}", referrer_id);
        return Err(AppError::SelfReferral);
    }

    let now = Utc::now().timestamp();

    let write_txn = db.begin_write()?;
    let referrer_tickets = {
        let mut referrals = write_txn.open_table(tables::REFERRALS)?;
        if referrals.get((referrer_id, referred_id))?.is_some() {
            tracing::info!(
                "Referral {} -> {} already recorded, no ticket awarded",
                referrer_id,
                referred_id
            );
            return Ok(ReferralOutcome::AlreadyReferred);
        }

        let mut users = write_txn.open_table(tables::USERS)?;
        let (_, referred_created) = ensure_user(&mut users, referred_id, now)?;
        if referred_created {
            tracing::info!("Referred user {} created on first visit", referred_id);
        }

        let record = ReferralRecord {
            tickets_awarded: REFERRAL_REWARD_TICKETS,
            created_at: now,
        };
        referrals.insert((referrer_id, referred_id), encode(&record)?.as_slice())?;

        credit_user(&mut users, referrer_id, REFERRAL_REWARD_TICKETS, now)?.ok_or_else(|| {
            tracing::warn!("Referral from unknown referrer {}", referrer_id);
            AppError::ReferrerNotFound
        })?
    };
    write_txn.commit()?;

    tracing::info!(
        "Referral {} -> {} recorded, referrer now holds {} tickets",
        referrer_id,
        referred_id,
        referrer_tickets
    );

    Ok(ReferralOutcome::Awarded { referrer_tickets })
}

/// Whether the exact (referrer, referred) pair is on record
pub fn is_recorded(db: &Database, referrer_id: &str, referred_id: &str) -> Result<bool> {
    let read_txn = db.begin_read()?;
    let referrals = read_txn.open_table(tables::REFERRALS)?;
    let recorded = referrals.get((referrer_id, referred_id))?.is_some();
    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_database, Db};
    use crate::services::tickets;
    use tempfile::TempDir;

    fn test_db() -> (TempDir, Db) {
        let temp_dir = TempDir::new().unwrap();
        let db = open_database(temp_dir.path().join("test.db")).unwrap();
        (temp_dir, db)
    }

    #[test]
    fn test_referral_awards_once() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();

        let first = process(&db, "u1", "u2").unwrap();
        assert_eq!(first, ReferralOutcome::Awarded { referrer_tickets: 2 });
        assert!(first.tickets_awarded());

        let second = process(&db, "u1", "u2").unwrap();
        assert_eq!(second, ReferralOutcome::AlreadyReferred);
        assert!(!second.tickets_awarded());

        assert_eq!(tickets::get_tickets(&db, "u1").unwrap(), 2);
    }

    #[test]
    fn test_referral_creates_referred_user() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();

        process(&db, "u1", "u2").unwrap();

        let referred = tickets::initialize(&db, "u2").unwrap();
        assert!(!referred.is_new);
        assert_eq!(referred.user.tickets, 1);
    }

    #[test]
    fn test_referral_keeps_existing_referred_user() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();
        tickets::initialize(&db, "u2").unwrap();
        tickets::consume(&db, "u2").unwrap();

        process(&db, "u1", "u2").unwrap();

        // Referred user is not credited or reset
        assert_eq!(tickets::get_tickets(&db, "u2").unwrap(), 0);
    }

    #[test]
    fn test_self_referral_rejected() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();

        assert!(matches!(process(&db, "u1", "u1"), Err(AppError::SelfReferral)));
        assert_eq!(tickets::get_tickets(&db, "u1").unwrap(), 1);
        assert!(!is_recorded(&db, "u1", "u1").unwrap());
    }

    #[test]
    fn test_unknown_referrer_writes_nothing() {
        let (_dir, db) = test_db();

        assert!(matches!(
            process(&db, "ghost", "u2"),
            Err(AppError::ReferrerNotFound)
        ));

        assert!(!is_recorded(&db, "ghost", "u2").unwrap());
        assert!(matches!(
            tickets::get_tickets(&db, "u2"),
            Err(AppError::UserNotFound)
        ));
    }

    #[test]
    fn test_pairs_are_directional() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();
        tickets::initialize(&db, "u2").unwrap();

        assert!(process(&db, "u1", "u2").unwrap().tickets_awarded());
        assert!(process(&db, "u2", "u1").unwrap().tickets_awarded());

        assert_eq!(tickets::get_tickets(&db, "u1").unwrap(), 2);
        assert_eq!(tickets::get_tickets(&db, "u2").unwrap(), 2);
    }

    #[test]
    fn test_one_referrer_many_referred() {
        let (_dir, db) = test_db();
        tickets::initialize(&db, "u1").unwrap();

        for referred in ["u2", "u3", "u4"] {
            assert!(process(&db, "u1", referred).unwrap().tickets_awarded());
        }

        assert_eq!(tickets::get_tickets(&db, "u1").unwrap(), 4);
    }
}
