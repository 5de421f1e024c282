//! chainlive-ogmios: Ogmios v6 chain-sync client.
//!
//! Speaks JSON-RPC 2.0 over a WebSocket (`ws://` or `wss://`) and implements
//! [`chainlive_core::ChainSyncClient`], so it plugs straight into a
//! [`chainlive_core::ChainSyncConsumer`].
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use chainlive_core::{ChainSyncConsumer, HandlerRegistry, Summarizer, UpstreamConfig};
//! use chainlive_ogmios::OgmiosClient;
//!
//! let client = OgmiosClient::connect(&UpstreamConfig::default()).await?;
//! let mut consumer = ChainSyncConsumer::new(client, Summarizer::default(), HandlerRegistry::new());
//! consumer.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod request;

pub use client::OgmiosClient;
pub use error::TransportError;
pub use protocol::Intersection;
