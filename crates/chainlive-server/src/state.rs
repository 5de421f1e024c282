//! Shared application state.

use std::sync::Arc;

use chainlive_core::{FanoutBroadcaster, RecencyAggregator};

/// Handles shared by every route and viewer connection.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<RecencyAggregator>,
    pub broadcaster: FanoutBroadcaster,
}

impl AppState {
    pub fn new(aggregator: Arc<RecencyAggregator>, broadcaster: FanoutBroadcaster) -> Self {
        Self {
            aggregator,
            broadcaster,
        }
    }
}
