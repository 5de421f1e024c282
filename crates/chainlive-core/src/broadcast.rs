//! Fanout broadcaster: publishes every new block to all connected viewers.
//!
//! Built on `tokio::sync::broadcast`: sending never blocks the chain-sync
//! consumer, each subscriber owns its receive cursor, and a subscriber that
//! falls behind skips ahead on its own without affecting anybody else.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::error::PipelineError;
use crate::handler::{BlockHandler, RollbackHandler, SyncContext};
use crate::types::{Point, SummarizedBlock};

/// Event names a new block is published under. Viewers written against any
/// one of them keep working.
pub const BLOCK_EVENT_ALIASES: &[&str] = &["block", "blocks", "newBlock"];

/// Event published when the upstream rolls back.
pub const ROLLBACK_EVENT: &str = "rollback";

/// Default channel capacity (messages buffered per lagging subscriber).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// One published event. Cloning is cheap; the payload is shared.
#[derive(Debug, Clone)]
pub struct FanoutMessage {
    event: Cow<'static, str>,
    payload: Arc<Value>,
}

#[derive(Serialize)]
struct Frame<'a> {
    event: &'a str,
    data: &'a Value,
}

impl FanoutMessage {
    pub fn new(event: impl Into<Cow<'static, str>>, payload: Arc<Value>) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Wire frame `{"event": ..., "data": ...}` as JSON text.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Frame {
            event: &self.event,
            data: &self.payload,
        })
    }
}

/// Publishes events to every live subscriber.
#[derive(Clone)]
pub struct FanoutBroadcaster {
    tx: broadcast::Sender<FanoutMessage>,
}

impl FanoutBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Attach a new subscriber. It only sees events published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Fire-and-forget publish. Returns how many subscribers the event was
    /// queued for; zero subscribers is not an error.
    pub fn emit(&self, event: impl Into<Cow<'static, str>>, payload: Arc<Value>) -> usize {
        let message = FanoutMessage::new(event, payload);
        match self.tx.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("no active subscribers");
                0
            }
        }
    }

    /// Publish a block and its transactions under every alias.
    ///
    /// The payload is serialized once; lovelace totals are decimal strings.
    pub fn publish_block(&self, block: &SummarizedBlock) -> Result<usize, PipelineError> {
        let payload = Arc::new(serde_json::to_value(block)?);
        let mut receivers = 0;
        for alias in BLOCK_EVENT_ALIASES {
            receivers = self.emit(*alias, payload.clone());
        }
        Ok(receivers)
    }

    /// Tell viewers the chain rolled back to `point`.
    pub fn publish_rollback(&self, point: &Point, ctx: &SyncContext) -> Result<usize, PipelineError> {
        let payload = serde_json::json!({
            "point": point,
            "tip": ctx.tip,
        });
        Ok(self.emit(ROLLBACK_EVENT, Arc::new(payload)))
    }
}

impl Default for FanoutBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl BlockHandler for FanoutBroadcaster {
    async fn handle_block(
        &self,
        block: &SummarizedBlock,
        _ctx: &SyncContext,
    ) -> Result<(), PipelineError> {
        let receivers = self.publish_block(block)?;
        tracing::debug!(
            height = block.block.height,
            subscribers = receivers,
            "block published"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "fanout-broadcaster"
    }
}

#[async_trait]
impl RollbackHandler for FanoutBroadcaster {
    async fn on_rollback(&self, point: &Point, ctx: &SyncContext) -> Result<(), PipelineError> {
        self.publish_rollback(point, ctx)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "fanout-broadcaster"
    }
}

/// One subscriber's view of the broadcast. Dropping it disconnects only
/// this subscriber.
pub struct Subscription {
    rx: broadcast::Receiver<FanoutMessage>,
}

impl Subscription {
    /// Next event, skipping over anything lost while lagging.
    /// Returns `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<FanoutMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagging, dropped events");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
