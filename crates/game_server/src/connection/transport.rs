//! Duplex byte-message transports
//!
//! The connection layer only needs "send these bytes" and "give me the next
//! inbound message". WebSocket halves produced by `StreamExt::split` implement
//! both traits, and [`channel_transport`] provides an in-process pair for
//! tests and embedding.

use crate::error::TransportError;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Outbound half of a transport.
#[async_trait]
pub trait MessageSink: Send {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// One inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Payload(Vec<u8>),
    /// A control frame such as a WebSocket ping. Proves liveness, carries nothing.
    KeepAlive,
}

/// Inbound half of a transport.
#[async_trait]
pub trait MessageStream: Send {
    /// Next inbound payload, or `None` once the peer has closed.
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>>;

    /// Next inbound frame including keep-alives. Transports without control
    /// frames only ever yield payloads.
    async fn recv_frame(&mut self) -> Option<Result<Inbound, TransportError>> {
        self.recv().await.map(|received| received.map(Inbound::Payload))
    }
}

// ============================================================================
// WebSocket
// ============================================================================

#[async_trait]
impl<S> MessageSink for SplitSink<WebSocketStream<S>, Message>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        let message = match String::from_utf8(payload) {
            Ok(text) => Message::text(text),
            Err(err) => Message::binary(err.into_bytes()),
        };
        SinkExt::send(self, message)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        SinkExt::close(self)
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))
    }
}

#[async_trait]
impl<S> MessageStream for SplitStream<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        loop {
            match self.recv_frame().await? {
                Ok(Inbound::Payload(payload)) => return Some(Ok(payload)),
                Ok(Inbound::KeepAlive) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    async fn recv_frame(&mut self) -> Option<Result<Inbound, TransportError>> {
        loop {
            match self.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(Ok(Inbound::Payload(text.as_str().as_bytes().to_vec())))
                }
                Ok(Message::Binary(data)) => return Some(Ok(Inbound::Payload(data.to_vec()))),
                // Pings are answered by tungstenite itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => return Some(Ok(Inbound::KeepAlive)),
                Ok(Message::Close(_)) => return None,
                Ok(Message::Frame(_)) => continue,
                Err(e) => return Some(Err(TransportError::WebSocket(e.to_string()))),
            }
        }
    }
}

// ============================================================================
// In-process channels
// ============================================================================

/// Server-side outbound half of a channel transport.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

/// Server-side inbound half of a channel transport.
pub struct ChannelStream {
    rx: mpsc::Receiver<Vec<u8>>,
}

/// The client end of a channel transport.
pub struct ChannelPeer {
    pub outgoing: mpsc::Sender<Vec<u8>>,
    pub incoming: mpsc::Receiver<Vec<u8>>,
}

/// Creates a connected transport pair backed by bounded tokio channels.
pub fn channel_transport(capacity: usize) -> (ChannelSink, ChannelStream, ChannelPeer) {
    let (to_client, from_server) = mpsc::channel(capacity);
    let (to_server, from_client) = mpsc::channel(capacity);
    (
        ChannelSink { tx: Some(to_client) },
        ChannelStream { rx: from_client },
        ChannelPeer {
            outgoing: to_server,
            incoming: from_server,
        },
    )
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn send(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(payload).await.map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

#[async_trait]
impl MessageStream for ChannelStream {
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transport_round_trip() {
        let (mut sink, mut stream, mut peer) = channel_transport(4);

        sink.send(b"hello".to_vec()).await.unwrap();
        assert_eq!(peer.incoming.recv().await.unwrap(), b"hello");

        peer.outgoing.send(b"world".to_vec()).await.unwrap();
        assert_eq!(stream.recv().await.unwrap().unwrap(), b"world");

        sink.close().await.unwrap();
        assert!(peer.incoming.recv().await.is_none());
        assert_eq!(sink.send(vec![1]).await, Err(TransportError::Closed));

        drop(peer.outgoing);
        assert!(stream.recv().await.is_none());
    }
}
