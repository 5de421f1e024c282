//! chainlive-core: ingestion pipeline for a live Cardano block explorer.
//!
//! # Architecture
//!
//! ```text
//! ChainSyncClient → ChainSyncConsumer
//!                       ├── Summarizer        (raw block → block + tx summaries)
//!                       └── HandlerRegistry   (dispatch in registration order)
//!                             ├── RecencyAggregator (last N blocks / transactions)
//!                             └── FanoutBroadcaster (block, blocks, newBlock → viewers)
//! ```
//!
//! The consumer is transport-agnostic; `chainlive-ogmios` provides the
//! WebSocket client and `chainlive-server` serves the aggregator and the
//! broadcaster to viewers.

pub mod aggregator;
pub mod broadcast;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod summarizer;
pub mod types;
pub mod units;
pub mod window;

pub use aggregator::{RecencyAggregator, RecentSnapshot};
pub use broadcast::{FanoutBroadcaster, FanoutMessage, Subscription, BLOCK_EVENT_ALIASES};
pub use config::{PipelineBuilder, PipelineConfig, UpstreamConfig};
pub use consumer::{
    ChainSyncClient, ChainSyncConsumer, ChainSyncEvent, ConsumerState, ConsumerStats, StopReason,
};
pub use error::PipelineError;
pub use handler::{BlockHandler, HandlerRegistry, RollbackHandler, SyncContext};
pub use summarizer::Summarizer;
pub use types::{BlockSummary, Point, RawBlock, SummarizedBlock, Tip, TransactionSummary};
pub use units::{EpochSchedule, Lovelace, Network};
pub use window::RecencyWindow;
