//! HTTP routes.
//!
//! ```text
//! GET /                   liveness text
//! GET /api/blocks         recent block summaries, newest first
//! GET /api/transactions   recent transaction summaries, newest first
//! GET /api/recent         both of the above in one snapshot
//! GET /api/status         subscriber and buffer counts
//! GET /ws[?backfill=true] live event stream
//! ```

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chainlive_core::{BlockSummary, RecentSnapshot, TransactionSummary};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

pub const LIVENESS_TEXT: &str = "Cardano live explorer server is running.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub subscribers: usize,
    pub blocks: usize,
    pub transactions: usize,
    pub capacity: usize,
    pub latest_height: Option<u64>,
}

/// Build the application router.
pub fn router(state: AppState, cors: bool) -> Router {
    let mut app = Router::new()
        .route("/", get(liveness))
        .route("/api/blocks", get(recent_blocks))
        .route("/api/transactions", get(recent_transactions))
        .route("/api/recent", get(recent_snapshot))
        .route("/api/status", get(status))
        .route("/ws", get(ws::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    app
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn recent_blocks(State(state): State<AppState>) -> Json<Vec<BlockSummary>> {
    Json(state.aggregator.blocks())
}

async fn recent_transactions(State(state): State<AppState>) -> Json<Vec<TransactionSummary>> {
    Json(state.aggregator.transactions())
}

async fn recent_snapshot(State(state): State<AppState>) -> Json<RecentSnapshot> {
    Json(state.aggregator.snapshot())
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let (blocks, transactions) = state.aggregator.counts();
    Json(StatusResponse {
        subscribers: state.broadcaster.subscriber_count(),
        blocks,
        transactions,
        capacity: state.aggregator.capacity(),
        latest_height: state.aggregator.latest_height(),
    })
}
