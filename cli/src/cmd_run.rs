//! `chainlive run`: follow the chain and serve viewers until Ctrl-C.
//!
//! The recency buffers and the broadcaster live for the whole process; only
//! the Ogmios connection is replaced when it fails. Every new connection
//! resumes from the current tip.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;

use chainlive_core::{
    ChainSyncConsumer, FanoutBroadcaster, HandlerRegistry, PipelineConfig, PipelineError,
    RecencyAggregator, StopReason, Summarizer,
};
use chainlive_ogmios::{OgmiosClient, TransportError};
use chainlive_server::AppState;

use crate::settings::Settings;

const RECONNECT_INITIAL: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(60);

/// Outcome of one connection to Ogmios.
struct Session {
    blocks: u64,
    result: Result<StopReason>,
}

/// Reconnect delays: double per failed attempt, capped at [`RECONNECT_MAX`].
#[derive(Debug)]
struct Backoff {
    current: Duration,
}

impl Backoff {
    fn new() -> Self {
        Self {
            current: RECONNECT_INITIAL,
        }
    }

    /// Delay before the next attempt. A session that delivered blocks starts
    /// the sequence over; a permanent failure always waits the maximum.
    fn next_delay(&mut self, blocks: u64, retryable: bool) -> Duration {
        if blocks > 0 {
            self.current = RECONNECT_INITIAL;
        }
        let delay = if retryable { self.current } else { RECONNECT_MAX };
        self.current = (self.current * 2).min(RECONNECT_MAX);
        delay
    }
}

/// Whether a fresh connection is likely to get past `err`.
fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(e) = err.downcast_ref::<TransportError>() {
        e.is_retryable()
    } else if let Some(e) = err.downcast_ref::<PipelineError>() {
        e.is_retryable()
    } else {
        true
    }
}

pub async fn run(settings: Settings) -> Result<()> {
    let pipeline = &settings.pipeline;
    let aggregator = Arc::new(RecencyAggregator::new(pipeline.recent_capacity));
    let broadcaster = FanoutBroadcaster::new(pipeline.channel_capacity);
    let summarizer = Summarizer::new(pipeline.epoch_schedule());

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown requested"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        let _ = stop_tx.send(true);
    });

    let listener = match chainlive_server::bind(&settings.server).await {
        Ok(listener) => listener,
        Err(e) if e.is_address_in_use() => anyhow::bail!(
            "viewer port {} is already in use; choose another with --port",
            settings.server.port
        ),
        Err(e) => return Err(anyhow::Error::new(e).context("failed to start viewer server")),
    };
    let app = chainlive_server::router(
        AppState::new(aggregator.clone(), broadcaster.clone()),
        settings.server.cors,
    );
    let server = tokio::spawn(chainlive_server::serve_on(
        listener,
        app,
        stopped(stop_rx.clone()),
    ));

    tracing::info!(
        upstream = %pipeline.upstream.url(),
        network = %pipeline.network,
        epoch_length = pipeline.epoch_length(),
        capacity = pipeline.recent_capacity,
        "Starting chain follower"
    );

    let mut backoff = Backoff::new();
    loop {
        let session = follow_once(pipeline, summarizer, &aggregator, &broadcaster, &stop_rx).await;

        let retryable = match &session.result {
            Ok(StopReason::Shutdown) => break,
            Ok(StopReason::UpstreamClosed) => {
                tracing::warn!(blocks = session.blocks, "Ogmios closed the connection");
                true
            }
            Err(e) => {
                let retryable = is_retryable(e);
                tracing::error!(
                    error = %format!("{e:#}"),
                    blocks = session.blocks,
                    retryable,
                    "Chain follower failed"
                );
                retryable
            }
        };

        let delay = backoff.next_delay(session.blocks, retryable);
        tracing::info!("Reconnecting in {delay:?}");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stopped(stop_rx.clone()) => break,
        }
    }

    server
        .await
        .context("viewer server task failed")?
        .context("viewer server error")?;
    tracing::info!("Stopped");
    Ok(())
}

/// Connect, follow from the tip, and close the connection again.
async fn follow_once(
    pipeline: &PipelineConfig,
    summarizer: Summarizer,
    aggregator: &Arc<RecencyAggregator>,
    broadcaster: &FanoutBroadcaster,
    stop: &watch::Receiver<bool>,
) -> Session {
    let connected = tokio::select! {
        res = OgmiosClient::connect(&pipeline.upstream) => res,
        _ = stopped(stop.clone()) => {
            return Session {
                blocks: 0,
                result: Ok(StopReason::Shutdown),
            }
        }
    };
    let client = match connected {
        Ok(client) => client,
        Err(e) => {
            return Session {
                blocks: 0,
                result: Err(anyhow::Error::new(e).context("failed to connect to Ogmios")),
            }
        }
    };

    let mut handlers = HandlerRegistry::new();
    handlers.on_block(aggregator.clone());
    handlers.on_block(Arc::new(broadcaster.clone()));
    handlers.on_rollback(Arc::new(broadcaster.clone()));

    let mut consumer = ChainSyncConsumer::new(client, summarizer, handlers);
    let result = consumer.run_until(stopped(stop.clone())).await;
    let blocks = consumer.stats().blocks;

    if let Err(e) = consumer.into_client().close().await {
        tracing::debug!(error = %e, "Ogmios connection did not close cleanly");
    }

    Session {
        blocks,
        result: result.map_err(anyhow::Error::from),
    }
}

/// Resolves once shutdown has been requested.
async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let mut backoff = Backoff::new();
        let delays: Vec<_> = (0..9).map(|_| backoff.next_delay(0, true)).collect();
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_secs(1));
        assert_eq!(delays[2], Duration::from_secs(2));
        assert_eq!(delays[7], Duration::from_secs(60));
        assert_eq!(delays[8], RECONNECT_MAX);
    }

    #[test]
    fn productive_session_resets_backoff() {
        let mut backoff = Backoff::new();
        for _ in 0..4 {
            backoff.next_delay(0, true);
        }
        assert_eq!(backoff.next_delay(12, true), RECONNECT_INITIAL);
    }

    #[test]
    fn permanent_failure_waits_the_maximum() {
        let mut backoff = Backoff::new();
        assert_eq!(backoff.next_delay(0, false), RECONNECT_MAX);
        assert_eq!(backoff.next_delay(0, true), Duration::from_secs(1));
    }

    #[test]
    fn classifies_session_errors() {
        let refused = anyhow::Error::new(TransportError::WebSocket("refused".into()))
            .context("failed to connect to Ogmios");
        assert!(is_retryable(&refused));

        let reset: anyhow::Error = PipelineError::Upstream("socket reset".into()).into();
        assert!(is_retryable(&reset));

        let bad: anyhow::Error = PipelineError::Protocol {
            method: "nextBlock".into(),
            reason: "no direction".into(),
        }
        .into();
        assert!(!is_retryable(&bad));
    }
}
