//! WebSocket JSON-RPC client for the Ogmios chain-synchronization protocol.
//!
//! The client owns its connection directly: chain-sync keeps exactly one
//! request in flight, so there is no background task or pending-request map.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chainlive_core::config::UpstreamConfig;
use chainlive_core::consumer::{ChainSyncClient, ChainSyncEvent};
use chainlive_core::error::PipelineError;
use chainlive_core::types::Point;

use crate::error::TransportError;
use crate::protocol::{self, Intersection, FIND_INTERSECTION, NEXT_BLOCK};
use crate::request::{JsonRpcRequest, JsonRpcResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Chain-sync client connected to one Ogmios instance.
pub struct OgmiosClient {
    url: String,
    ws: WsStream,
    next_id: u64,
    /// Ogmios answers the first `nextBlock` after an intersection with a
    /// rollback to that intersection; it carries no information.
    intersected_at: Option<Point>,
}

impl OgmiosClient {
    /// Open a WebSocket connection to the configured Ogmios endpoint.
    pub async fn connect(config: &UpstreamConfig) -> Result<Self, TransportError> {
        Self::connect_url(config.url()).await
    }

    pub async fn connect_url(url: impl Into<String>) -> Result<Self, TransportError> {
        let url = url.into();
        tracing::info!(url = %url, "Connecting to Ogmios");
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::info!(url = %url, "Connected to Ogmios");
        Ok(Self {
            url,
            ws,
            next_id: 1,
            intersected_at: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Find the first of `points` that is on chain.
    pub async fn find_intersection(
        &mut self,
        points: &[Point],
    ) -> Result<Intersection, TransportError> {
        let params = protocol::find_intersection_params(points);
        let response = self
            .call(FIND_INTERSECTION, Some(params))
            .await?
            .ok_or(TransportError::Closed)?;
        let result = response.into_result().map_err(protocol::intersection_error)?;
        protocol::parse_intersection(result)
    }

    /// Request the next chain-sync event. `Ok(None)` if the connection closed.
    pub async fn next_block(&mut self) -> Result<Option<ChainSyncEvent>, TransportError> {
        let Some(response) = self.call(NEXT_BLOCK, None).await? else {
            return Ok(None);
        };
        let result = response.into_result().map_err(|error| TransportError::Rpc {
            method: NEXT_BLOCK.into(),
            error,
        })?;
        protocol::parse_next_block(result).map(Some)
    }

    /// Close the connection politely.
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.ws.close(None).await?;
        Ok(())
    }

    /// Send one request and wait for its response.
    async fn call(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Option<JsonRpcResponse>, TransportError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        let text = serde_json::to_string(&request)?;
        tracing::trace!(method, id, "Sending request");
        self.ws.send(Message::Text(text.into())).await?;

        loop {
            let text = match self.ws.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => text.to_string(),
                Some(Ok(Message::Binary(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
                Some(Ok(Message::Ping(payload))) => {
                    self.ws.send(Message::Pong(payload)).await?;
                    continue;
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Ogmios closed the connection");
                    return Ok(None);
                }
                Some(Ok(_)) => continue,
            };

            let response: JsonRpcResponse = serde_json::from_str(&text)?;
            if !response.answers(id) {
                tracing::debug!(expected = id, got = %response.id, "Ignoring unrelated response");
                continue;
            }
            return Ok(Some(response));
        }
    }
}

#[async_trait]
impl ChainSyncClient for OgmiosClient {
    async fn intersect_tip(&mut self) -> Result<Point, PipelineError> {
        // Any findIntersection reports the tip; ask again to move the cursor there.
        let probe = self.find_intersection(&[Point::origin()]).await?;
        let found = self.find_intersection(&[probe.tip.point()]).await?;
        tracing::debug!(
            point = %found.intersection,
            tip_height = ?found.tip.height(),
            "Intersection found"
        );
        self.intersected_at = Some(found.intersection.clone());
        Ok(found.intersection)
    }

    async fn request_next(&mut self) -> Result<Option<ChainSyncEvent>, PipelineError> {
        loop {
            let Some(event) = self.next_block().await? else {
                return Ok(None);
            };
            let intersected_at = self.intersected_at.take();
            if let ChainSyncEvent::RollBackward { point, .. } = &event {
                if intersected_at.as_ref() == Some(point) {
                    tracing::trace!(%point, "Skipping rollback to intersection");
                    continue;
                }
            }
            return Ok(Some(event));
        }
    }
}
