//! Per-socket connection handling.

use crate::config::ServerConfig;
use crate::connection::{ConnectionManager, MessageSink};
use crate::error::ServerError;
use crate::server::handshake::{perform_handshake, HandshakeOutcome};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Upgrades an accepted socket, runs the handshake and hands the transport
/// to the connection manager.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    config: ServerConfig,
) -> Result<(), ServerError> {
    let ws_stream = tokio::time::timeout(
        config.handshake_timeout,
        tokio_tungstenite::accept_async(stream),
    )
    .await
    .map_err(|_| ServerError::Handshake(format!("WebSocket upgrade from {addr} timed out")))?
    .map_err(|e| ServerError::Handshake(e.to_string()))?;

    debug!("WebSocket connection established with {}", addr);
    let (mut sink, mut stream) = ws_stream.split();

    let outcome = perform_handshake(
        connection_manager.repo(),
        &mut sink,
        &mut stream,
        config.handshake_timeout,
    )
    .await;

    match outcome {
        Ok(HandshakeOutcome::Session { key, first_join }) => {
            info!("🤝 {} bound to {}", addr, key);
            connection_manager.register(key, sink, stream, first_join);
            Ok(())
        }
        Ok(HandshakeOutcome::Answered) => {
            let _ = MessageSink::close(&mut sink).await;
            Ok(())
        }
        Err(e) => {
            let _ = MessageSink::close(&mut sink).await;
            Err(e)
        }
    }
}
