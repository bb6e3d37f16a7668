//! Accept loop — one session task per connection.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use voxbridge_core::config::Config;
use voxbridge_core::VoxError;
use voxbridge_engine::ConversionEngine;

use crate::session::SessionController;

/// Run the relay until Ctrl-C.
pub async fn run(config: Config, engine: Arc<dyn ConversionEngine>) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        });
    }
    serve(config, engine, cancel).await
}

/// Run the relay until the token is cancelled.
///
/// The accept loop is the only shared structure; each connection gets its
/// own task and its own session state, and a session failure never
/// touches the listener or any sibling session.
pub async fn serve(
    config: Config,
    engine: Arc<dyn ConversionEngine>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    voxbridge_engine::warm_up(engine.as_ref(), config.engine.warmup, config.audio.chunk_bytes).await;

    let addr = format!("{}:{}", config.listener.bind, config.listener.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(mode = ?config.mode, "voxbridge listening on {addr}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("listener shutting down");
                engine.shutdown().await;
                return Ok(());
            }
            accepted = listener.accept() => {
                // Transient accept failures (ECONNABORTED and friends) stay
                // local; only cancellation stops the relay.
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(%e, "accept failed");
                        continue;
                    }
                };
                let conn_id = Uuid::new_v4();
                info!(conn_id = %conn_id, %peer, "client connected");

                let config = config.clone();
                let engine = engine.clone();
                tokio::spawn(async move {
                    let session = SessionController::new(stream, conn_id, config, engine);
                    match session.run().await {
                        Ok(()) => info!(conn_id = %conn_id, "session closed"),
                        Err(VoxError::IdleTimeout { timeouts }) => {
                            // Dead connection, not a peer-visible error.
                            info!(conn_id = %conn_id, timeouts, "session idle, closing")
                        }
                        Err(e) => warn!(conn_id = %conn_id, %e, "session failed"),
                    }
                });
            }
        }
    }
}
