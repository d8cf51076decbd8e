//! A single live player connection

use crate::error::TransportError;
use game_logic::{GameId, PlayerId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Connections are keyed by the seat they occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub game_id: GameId,
    pub player_id: PlayerId,
}

impl ConnectionKey {
    pub fn new(game_id: GameId, player_id: PlayerId) -> Self {
        Self { game_id, player_id }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_id, self.player_id)
    }
}

/// Monotonic id so log lines can tell a reconnect apart from its predecessor.
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub struct Connection {
    id: ConnectionId,
    key: ConnectionKey,
    connected_at: Instant,
    /// Milliseconds after `connected_at` at which the last inbound frame arrived
    last_seen_ms: AtomicU64,
    outbound: mpsc::Sender<Vec<u8>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    closed: AtomicBool,
}

impl Connection {
    /// Creates the record together with the receiving end of its outbound queue.
    pub(crate) fn new(key: ConnectionKey, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Vec<u8>>) {
        let (outbound, outbound_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let connection = Arc::new(Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            key,
            connected_at: Instant::now(),
            last_seen_ms: AtomicU64::new(0),
            outbound,
            shutdown_tx,
            shutdown_rx,
            closed: AtomicBool::new(false),
        });
        (connection, outbound_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// When the peer last sent anything, keep-alives included.
    pub fn last_seen(&self) -> Instant {
        self.connected_at + Duration::from_millis(self.last_seen_ms.load(Ordering::Relaxed))
    }

    /// Records inbound activity.
    pub(crate) fn touch(&self) {
        let elapsed = self.connected_at.elapsed().as_millis();
        self.last_seen_ms
            .fetch_max(u64::try_from(elapsed).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Queues a payload without waiting.
    pub fn enqueue(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        self.outbound.try_send(payload).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    /// Raises the shutdown signal. Returns `false` if it was already raised.
    pub(crate) fn signal_shutdown(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.shutdown_tx.send_replace(true);
        true
    }

    /// A receiver that observes the shutdown signal even if it was raised
    /// before the receiver was created.
    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ConnectionKey {
        ConnectionKey::new(GameId::new(), PlayerId::new())
    }

    #[tokio::test]
    async fn test_shutdown_is_signalled_once() {
        let (connection, _rx) = Connection::new(key(), 4);
        let mut signal = connection.shutdown_signal();

        assert!(connection.signal_shutdown());
        assert!(!connection.signal_shutdown());
        assert!(connection.is_closed());

        signal.changed().await.unwrap();
        assert!(*signal.borrow());

        // Late subscribers still see it
        let mut late = connection.shutdown_signal();
        late.changed().await.unwrap();
    }

    #[test]
    fn test_full_queue_is_reported() {
        let (connection, _rx) = Connection::new(key(), 1);
        connection.enqueue(vec![1]).unwrap();
        assert_eq!(connection.enqueue(vec![2]), Err(TransportError::QueueFull));

        connection.signal_shutdown();
        assert_eq!(connection.enqueue(vec![3]), Err(TransportError::Closed));
    }

    #[test]
    fn test_touch_moves_last_seen_forward() {
        let (connection, _rx) = Connection::new(key(), 1);
        assert_eq!(connection.last_seen(), connection.connected_at());

        std::thread::sleep(Duration::from_millis(5));
        connection.touch();
        assert!(connection.last_seen() > connection.connected_at());
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _) = Connection::new(key(), 1);
        let (b, _) = Connection::new(key(), 1);
        assert_ne!(a.id(), b.id());
    }
}
