//! Recency aggregator: the last N blocks and last N transactions.
//!
//! Written only by the chain-sync consumer; read by any number of viewers.
//! Readers always receive owned snapshots, so a push that happens while a
//! viewer iterates is never observed half-applied.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::handler::{BlockHandler, SyncContext};
use crate::types::{BlockSummary, SummarizedBlock, TransactionSummary};
use crate::window::{RecencyWindow, DEFAULT_CAPACITY};

/// Point-in-time copy of both buffers, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSnapshot {
    pub blocks: Vec<BlockSummary>,
    pub transactions: Vec<TransactionSummary>,
}

struct Windows {
    blocks: RecencyWindow<BlockSummary>,
    transactions: RecencyWindow<TransactionSummary>,
}

/// Two bounded most-recent-first buffers behind one lock.
pub struct RecencyAggregator {
    inner: RwLock<Windows>,
}

impl RecencyAggregator {
    /// Each buffer holds at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Windows {
                blocks: RecencyWindow::new(capacity),
                transactions: RecencyWindow::new(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.read().blocks.capacity()
    }

    /// Prepend a block summary, evicting the oldest on overflow.
    pub fn push_block(&self, summary: BlockSummary) {
        self.write().blocks.push(summary);
    }

    /// Prepend a block's transactions in their original order.
    pub fn push_transactions(&self, summaries: Vec<TransactionSummary>) {
        self.write().transactions.extend_front(summaries);
    }

    /// Record a block and its transactions atomically.
    pub fn record(&self, summarized: &SummarizedBlock) {
        let mut windows = self.write();
        windows.blocks.push(summarized.block.clone());
        windows
            .transactions
            .extend_front(summarized.transactions.iter().cloned());
    }

    pub fn blocks(&self) -> Vec<BlockSummary> {
        self.read().blocks.snapshot()
    }

    pub fn transactions(&self) -> Vec<TransactionSummary> {
        self.read().transactions.snapshot()
    }

    /// Both buffers, taken under the same read lock.
    pub fn snapshot(&self) -> RecentSnapshot {
        let windows = self.read();
        RecentSnapshot {
            blocks: windows.blocks.snapshot(),
            transactions: windows.transactions.snapshot(),
        }
    }

    /// Height of the newest buffered block.
    pub fn latest_height(&self) -> Option<u64> {
        self.read().blocks.latest().map(|b| b.height)
    }

    /// `(blocks, transactions)` currently buffered.
    pub fn counts(&self) -> (usize, usize) {
        let windows = self.read();
        (windows.blocks.len(), windows.transactions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.read().blocks.is_empty()
    }

    // Every mutation is a single push + truncate; a poisoned lock still
    // guards consistent windows.
    fn read(&self) -> RwLockReadGuard<'_, Windows> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Windows> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for RecencyAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl BlockHandler for RecencyAggregator {
    async fn handle_block(
        &self,
        block: &SummarizedBlock,
        _ctx: &SyncContext,
    ) -> Result<(), PipelineError> {
        self.record(block);
        tracing::trace!(height = block.block.height, "block buffered");
        Ok(())
    }

    fn name(&self) -> &str {
        "recency-aggregator"
    }
}
