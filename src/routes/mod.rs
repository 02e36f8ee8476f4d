pub mod admin;
pub mod extract;
pub mod health;
pub mod referral;
pub mod user;

pub use admin::admin_stats;
pub use extract::{require_user_id, AppJson, AppQuery};
pub use health::health_check;
pub use referral::process_referral;
pub use user::{complete_user, consume_ticket, get_tickets, init_user};

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Ledger endpoints, mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/user/init", post(init_user))
        .route("/user/tickets", get(get_tickets).post(consume_ticket))
        .route("/user/complete", post(complete_user))
        .route("/referral/process", post(process_referral))
}
