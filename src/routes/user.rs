use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::routes::extract::{require_user_id, AppJson, AppQuery};
use crate::services::tickets;
use crate::AppState;

/// Body shared by every user endpoint that takes only an ID
#[derive(Debug, Deserialize)]
pub struct UserIdRequest {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InitUserResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub tickets: u32,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    #[serde(rename = "isNew")]
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct TicketsResponse {
    pub tickets: u32,
}

#[derive(Debug, Serialize)]
pub struct ConsumeTicketResponse {
    pub tickets: u32,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

/// Initialize a visitor
///
/// POST /api/user/init
///
/// Creates the user with one ticket on first contact; later calls return the
/// stored state with `isNew: false`.
pub async fn init_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<InitUserResponse>> {
    let user_id = require_user_id(payload.user_id)?;
    let db = state.db.clone();

    let outcome = tokio::task::spawn_blocking(move || tickets::initialize(&db, &user_id)).await??;

    Ok(Json(InitUserResponse {
        user_id: outcome.user.id,
        tickets: outcome.user.tickets,
        is_completed: outcome.user.is_completed,
        is_new: outcome.is_new,
    }))
}

/// Read the ticket count
///
/// GET /api/user/tickets?userId=<id>
pub async fn get_tickets(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UserIdRequest>,
) -> Result<Json<TicketsResponse>> {
    let user_id = require_user_id(params.user_id)?;
    let db = state.db.clone();

    let tickets =
        tokio::task::spawn_blocking(move || tickets::get_tickets(&db, &user_id)).await??;

    Ok(Json(TicketsResponse { tickets }))
}

/// Spend one ticket to start a quiz attempt
///
/// POST /api/user/tickets
///
/// 404 if the user is unknown, 400 if no tickets remain.
pub async fn consume_ticket(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<ConsumeTicketResponse>> {
    let user_id = require_user_id(payload.user_id)?;
    let db = state.db.clone();

    let tickets = tokio::task::spawn_blocking(move || tickets::consume(&db, &user_id)).await??;

    Ok(Json(ConsumeTicketResponse {
        tickets,
        success: true,
    }))
}

/// Record that the user answered every question
///
/// POST /api/user/complete
pub async fn complete_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<CompleteResponse>> {
    let user_id = require_user_id(payload.user_id)?;
    let db = state.db.clone();

    let user =
        tokio::task::spawn_blocking(move || tickets::mark_completed(&db, &user_id)).await??;

    Ok(Json(CompleteResponse {
        success: true,
        is_completed: user.is_completed,
    }))
}
