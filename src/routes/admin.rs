use axum::{Json, extract::State};
use redb::{ReadableDatabase, ReadableTable, ReadableTableMetadata};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::{
    AppError, AppState,
    db::{decode, tables},
    error::Result,
    models::UserRecord,
    routes::extract::AppQuery,
};

/// Query parameters for admin stats endpoint
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// Admin secret key for authentication
    pub key: Option<String>,
}

/// Ledger statistics response
#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub user_count: u64,
    pub completed_count: u64,
    pub referral_count: u64,
    pub database_size_bytes: u64,
    pub database_size_human: String,
}

/// Format bytes into human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Admin stats endpoint
///
/// Returns user, completion and referral counts for monitoring the campaign.
/// Disabled (401) unless `ADMIN_SECRET_KEY` is configured.
///
/// GET /admin/stats?key=<admin_secret_key>
pub async fn admin_stats(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<AdminQuery>,
) -> Result<Json<AdminStatsResponse>> {
    // Check if admin endpoints are enabled
    let admin_key = state
        .config
        .admin_secret_key
        .as_ref()
        .ok_or(AppError::Unauthorized)?;

    // Verify the provided key matches
    if params.key.as_ref() != Some(admin_key) {
        tracing::warn!("Invalid admin key attempt");
        return Err(AppError::Unauthorized);
    }

    let database_size_bytes = fs::metadata(&state.config.database_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let db = state.db.clone();
    let (user_count, completed_count, referral_count) =
        tokio::task::spawn_blocking(move || -> Result<(u64, u64, u64)> {
            let read_txn = db.begin_read()?;

            let users = read_txn.open_table(tables::USERS)?;
            let user_count = users.len()?;

            let mut completed_count = 0;
            for entry in users.iter()? {
                let (_, value) = entry?;
                let record: UserRecord = decode(value.value())?;
                if record.is_completed {
                    completed_count += 1;
                }
            }

            let referral_count = read_txn.open_table(tables::REFERRALS)?.len()?;

            Ok((user_count, completed_count, referral_count))
        })
        .await??;

    tracing::info!(
        "Admin stats requested: {} users, {} completed, {} referrals, {} database",
        user_count,
        completed_count,
        referral_count,
        format_bytes(database_size_bytes)
    );

    Ok(Json(AdminStatsResponse {
        user_count,
        completed_count,
        referral_count,
        database_size_bytes,
        database_size_human: format_bytes(database_size_bytes),
    }))
}
