//! chainlive-server: serves the recency buffers and the live block stream
//! to viewers.
//!
//! The server only reads: it takes owned snapshots from the
//! [`RecencyAggregator`](chainlive_core::RecencyAggregator) and subscribes
//! each WebSocket viewer to the
//! [`FanoutBroadcaster`](chainlive_core::FanoutBroadcaster). A slow or
//! disconnected viewer never holds up ingestion.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;

pub use config::ServerConfig;
pub use error::ServerError;
pub use routes::router;
pub use state::AppState;

/// Bind the configured address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `app` on an already-bound listener until `shutdown` resolves.
pub async fn serve_on<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Viewer server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Viewer server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn port_in_use_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            bind: "127.0.0.1".into(),
            port: taken.local_addr().unwrap().port(),
            cors: true,
        };
        let err = bind(&config).await.unwrap_err();
        assert!(err.is_address_in_use(), "unexpected {err:?}");
    }
}
