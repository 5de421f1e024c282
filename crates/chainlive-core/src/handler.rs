//! Block and rollback handler traits + registry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::types::{Point, SummarizedBlock, Tip};

/// Context passed to handlers for each chain-sync event.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Upstream tip reported alongside the event, if any.
    pub tip: Option<Tip>,
    /// When the event was received.
    pub received_at: DateTime<Utc>,
}

impl SyncContext {
    pub fn new(tip: Option<Tip>, received_at: DateTime<Utc>) -> Self {
        Self { tip, received_at }
    }
}

/// Trait for components that consume each new summarized block.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    async fn handle_block(
        &self,
        block: &SummarizedBlock,
        ctx: &SyncContext,
    ) -> Result<(), PipelineError>;

    /// Name used in logs and handler errors.
    fn name(&self) -> &str;
}

/// Trait for components that react to a chain rollback.
#[async_trait]
pub trait RollbackHandler: Send + Sync {
    async fn on_rollback(&self, point: &Point, ctx: &SyncContext) -> Result<(), PipelineError>;

    fn name(&self) -> &str;
}

/// Registry of block and rollback handlers, dispatched in registration order.
pub struct HandlerRegistry {
    block_handlers: Vec<Arc<dyn BlockHandler>>,
    rollback_handlers: Vec<Arc<dyn RollbackHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            block_handlers: vec![],
            rollback_handlers: vec![],
        }
    }

    /// Register a block handler (called for every rolled-forward block).
    pub fn on_block(&mut self, handler: Arc<dyn BlockHandler>) {
        self.block_handlers.push(handler);
    }

    /// Register a rollback handler.
    pub fn on_rollback(&mut self, handler: Arc<dyn RollbackHandler>) {
        self.rollback_handlers.push(handler);
    }

    pub fn block_handler_count(&self) -> usize {
        self.block_handlers.len()
    }

    pub fn rollback_handler_count(&self) -> usize {
        self.rollback_handlers.len()
    }

    /// Dispatch a block to all block handlers. Stops at the first failure.
    pub async fn dispatch_block(
        &self,
        block: &SummarizedBlock,
        ctx: &SyncContext,
    ) -> Result<(), PipelineError> {
        for handler in &self.block_handlers {
            handler.handle_block(block, ctx).await?;
        }
        Ok(())
    }

    /// Dispatch a rollback to all rollback handlers.
    pub async fn dispatch_rollback(
        &self,
        point: &Point,
        ctx: &SyncContext,
    ) -> Result<(), PipelineError> {
        for handler in &self.rollback_handlers {
            handler.on_rollback(point, ctx).await?;
        }
        Ok(())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
