use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::constants::{ERR_REFERRAL_IDS_REQUIRED, MSG_ALREADY_REFERRED, MSG_TICKET_AWARDED};
use crate::error::{AppError, Result};
use crate::models::ReferralOutcome;
use crate::routes::extract::{require_user_id, AppJson};
use crate::services::referrals;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessReferralRequest {
    #[serde(rename = "referrerId")]
    pub referrer_id: Option<String>,
    #[serde(rename = "referredId")]
    pub referred_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessReferralResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "ticketsAwarded")]
    pub tickets_awarded: bool,
    #[serde(rename = "referrerTickets", skip_serializing_if = "Option::is_none")]
    pub referrer_tickets: Option<u32>,
}

/// Credit a referrer for a visit through their shared link
///
/// POST /api/referral/process
///
/// A repeated (referrer, referred) pair answers 200 with
/// `ticketsAwarded: false`. Self-referral is rejected with 400 and an
/// unknown referrer with 404.
pub async fn process_referral(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProcessReferralRequest>,
) -> Result<Json<ProcessReferralResponse>> {
    let is_blank = |id: &Option<String>| id.as_deref().is_none_or(|s| s.trim().is_empty());
    if is_blank(&payload.referrer_id) || is_blank(&payload.referred_id) {
        return Err(AppError::InvalidInput(ERR_REFERRAL_IDS_REQUIRED.to_string()));
    }

    let referrer_id = require_user_id(payload.referrer_id)?;
    let referred_id = require_user_id(payload.referred_id)?;
    let db = state.db.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        referrals::process(&db, &referrer_id, &referred_id)
    })
    .await??;

    let response = match outcome {
        ReferralOutcome::Awarded { referrer_tickets } => ProcessReferralResponse {
            success: true,
            message: MSG_TICKET_AWARDED.to_string(),
            tickets_awarded: true,
            referrer_tickets: Some(referrer_tickets),
        },
        ReferralOutcome::AlreadyReferred => ProcessReferralResponse {
            success: false,
            message: MSG_ALREADY_REFERRED.to_string(),
            tickets_awarded: false,
            referrer_tickets: None,
        },
    };

    Ok(Json(response))
}
