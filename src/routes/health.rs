use axum::{extract::State, Json};
use redb::ReadableDatabase;
use serde_json::{json, Value};

use crate::db::tables;
use crate::AppState;

/// Health check endpoint
///
/// Returns the health status of the server and database.
/// Used by load balancers and monitoring systems.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    // Check the database by opening the users table in a read transaction
    let db = state.db.clone();
    let db_status = tokio::task::spawn_blocking(move || {
        let check = || -> Result<(), redb::Error> {
            let read_txn = db.begin_read()?;
            read_txn.open_table(tables::USERS)?;
            Ok(())
        };

        match check() {
            Ok(()) => "connected",
            Err(e) => {
                tracing::error!("Database health check failed: {:?}", e);
                "disconnected"
            }
        }
    })
    .await
    .unwrap_or("error");

    Json(json!({
        "status": if db_status == "connected" { "healthy" } else { "unhealthy" },
        "database": db_status,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
