//! The chain-sync consumer loop.
//!
//! # Startup
//! Intersect at the upstream's current tip. Nothing before the tip is replayed.
//!
//! # Following
//! Request one event at a time. For each event:
//!   - RollForward: summarize, dispatch to block handlers in order
//!   - RollBackward: log, dispatch to rollback handlers (buffers are kept)
//!
//! The next event is requested only after the current one has been handed
//! off to every handler, so at most one request is ever in flight.

use std::future::Future;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::PipelineError;
use crate::handler::{HandlerRegistry, SyncContext};
use crate::summarizer::Summarizer;
use crate::types::{Point, RawBlock, Tip};

/// One event delivered by the upstream chain-sync protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainSyncEvent {
    RollForward { block: RawBlock, tip: Option<Tip> },
    RollBackward { point: Point, tip: Option<Tip> },
}

/// Source of chain-sync events.
#[async_trait]
pub trait ChainSyncClient: Send {
    /// Position the cursor at the upstream's current tip and return it.
    async fn intersect_tip(&mut self) -> Result<Point, PipelineError>;

    /// Request the next event. `Ok(None)` means the upstream closed.
    async fn request_next(&mut self) -> Result<Option<ChainSyncEvent>, PipelineError>;
}

/// Lifecycle of a [`ChainSyncConsumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Not yet started.
    Idle,
    /// Looking for the tip.
    Intersecting,
    /// Processing events as they arrive.
    Following,
    /// Stopped by shutdown or upstream close.
    Stopped,
    /// Stopped by an error.
    Error,
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Intersecting => write!(f, "intersecting"),
            Self::Following => write!(f, "following"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Why [`ChainSyncConsumer::run_until`] returned without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    UpstreamClosed,
}

/// Counters for processed events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub blocks: u64,
    pub rollbacks: u64,
    pub transactions: u64,
}

enum Step<T> {
    Shutdown,
    Ready(T),
}

/// Drives a [`ChainSyncClient`] and feeds every event through the handlers.
pub struct ChainSyncConsumer<C: ChainSyncClient> {
    client: C,
    summarizer: Summarizer,
    handlers: HandlerRegistry,
    state: ConsumerState,
    stats: ConsumerStats,
}

impl<C: ChainSyncClient> ChainSyncConsumer<C> {
    pub fn new(client: C, summarizer: Summarizer, handlers: HandlerRegistry) -> Self {
        Self {
            client,
            summarizer,
            handlers,
            state: ConsumerState::Idle,
            stats: ConsumerStats::default(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Give the client back, e.g. to close its connection.
    pub fn into_client(self) -> C {
        self.client
    }

    /// Run until the upstream closes or an error occurs.
    pub async fn run(&mut self) -> Result<StopReason, PipelineError> {
        self.run_until(futures::future::pending::<()>()).await
    }

    /// Run until `shutdown` resolves, the upstream closes, or an error occurs.
    ///
    /// Shutdown is only observed while waiting on the upstream; an event
    /// that has arrived is always handed off completely.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<StopReason, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        self.state = ConsumerState::Intersecting;
        let step = tokio::select! {
            biased;
            _ = &mut shutdown => Step::Shutdown,
            res = self.client.intersect_tip() => Step::Ready(res),
        };
        let point = match step {
            Step::Shutdown => return Ok(self.stop(StopReason::Shutdown)),
            Step::Ready(Ok(point)) => point,
            Step::Ready(Err(e)) => return Err(self.fail(e)),
        };
        tracing::info!(%point, "Intersected at tip, following chain");
        self.state = ConsumerState::Following;

        loop {
            let step = tokio::select! {
                biased;
                _ = &mut shutdown => Step::Shutdown,
                res = self.client.request_next() => Step::Ready(res),
            };
            match step {
                Step::Shutdown => return Ok(self.stop(StopReason::Shutdown)),
                Step::Ready(Ok(None)) => return Ok(self.stop(StopReason::UpstreamClosed)),
                Step::Ready(Ok(Some(event))) => {
                    if let Err(e) = self.handle(event).await {
                        return Err(self.fail(e));
                    }
                }
                Step::Ready(Err(e)) => return Err(self.fail(e)),
            }
        }
    }

    /// Process a single event through the summarizer and handlers.
    pub async fn handle(&mut self, event: ChainSyncEvent) -> Result<(), PipelineError> {
        match event {
            ChainSyncEvent::RollForward { block, tip } => {
                let ctx = SyncContext::new(tip, Utc::now());
                let summarized = self.summarizer.summarize(&block, ctx.received_at);
                self.handlers.dispatch_block(&summarized, &ctx).await?;

                self.stats.blocks += 1;
                self.stats.transactions += summarized.transactions.len() as u64;
                tracing::debug!(
                    height = summarized.block.height,
                    slot = summarized.block.slot,
                    txs = summarized.transactions.len(),
                    "Block processed"
                );
            }
            ChainSyncEvent::RollBackward { point, tip } => {
                tracing::warn!(%point, "Rollback requested by upstream");
                let ctx = SyncContext::new(tip, Utc::now());
                self.handlers.dispatch_rollback(&point, &ctx).await?;
                self.stats.rollbacks += 1;
            }
        }
        Ok(())
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.state = ConsumerState::Stopped;
        tracing::info!(
            ?reason,
            blocks = self.stats.blocks,
            rollbacks = self.stats.rollbacks,
            "Chain-sync consumer stopped"
        );
        reason
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.state = ConsumerState::Error;
        tracing::error!(error = %error, "Chain-sync consumer failed");
        error
    }
}
