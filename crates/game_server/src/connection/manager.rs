//! Connection registry and per-connection tasks
//!
//! Every registered connection runs two tasks:
//!
//! * a **send loop** draining the connection's bounded outbound queue into
//!   the transport, and
//! * a **receive loop** decoding inbound payloads into [`ClientCommand`]s and
//!   handing them to the [`CommandHandler`].
//!
//! Both loops stop when the connection's shutdown signal is raised. Closing
//! is idempotent and only the connection currently registered for a seat
//! marks the player as disconnected.
//!
//! The player's connectivity flag is only changed while the seat's map shard
//! is locked, so the flag always agrees with the map entry even when a close
//! races a reconnect.

use super::connection::{Connection, ConnectionKey};
use super::transport::{Inbound, MessageSink, MessageStream};
use crate::error::{ServerError, TransportError};
use crate::messaging::types::{ClientCommand, ServerEvent};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use game_logic::GameId;
use game_repo::GameRepo;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A decoded command tagged with the seat it came from.
#[derive(Debug, Clone)]
pub struct GameMessage {
    pub key: ConnectionKey,
    pub command: ClientCommand,
}

/// Game-side reactions to connection traffic.
///
/// Handlers run synchronously on the receive task and must not block on
/// network I/O; they reply through the manager's non-blocking send methods.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, manager: &ConnectionManager, message: GameMessage);

    /// Called after a connection has been registered and its player marked connected.
    fn on_connect(&self, manager: &ConnectionManager, key: ConnectionKey, first_join: bool);

    /// Called after the current connection of a seat closed and its player was marked disconnected.
    fn on_disconnect(&self, manager: &ConnectionManager, key: ConnectionKey);
}

#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub outbound_capacity: usize,
    /// Close connections that stay silent this long. `None` disables it.
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            outbound_capacity: 64,
            idle_timeout: None,
        }
    }
}

pub struct ConnectionManager {
    connections: DashMap<ConnectionKey, Arc<Connection>>,
    repo: Arc<GameRepo>,
    handler: Arc<dyn CommandHandler>,
    settings: ConnectionSettings,
}

impl ConnectionManager {
    pub fn new(
        repo: Arc<GameRepo>,
        handler: Arc<dyn CommandHandler>,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            connections: DashMap::new(),
            repo,
            handler,
            settings,
        }
    }

    pub fn repo(&self) -> &Arc<GameRepo> {
        &self.repo
    }

    /// Registers a transport for a seat and starts its send and receive tasks.
    ///
    /// A previous connection for the same seat is replaced and closed without
    /// marking the player disconnected.
    pub fn register<S, R>(
        self: &Arc<Self>,
        key: ConnectionKey,
        sink: S,
        stream: R,
        first_join: bool,
    ) -> Arc<Connection>
    where
        S: MessageSink + 'static,
        R: MessageStream + 'static,
    {
        let (connection, outbound) = Connection::new(key, self.settings.outbound_capacity);

        let (previous, marked) = match self.connections.entry(key) {
            Entry::Occupied(mut occupied) => {
                let marked = self.repo.connect_player(key.game_id, key.player_id);
                (Some(occupied.insert(connection.clone())), marked)
            }
            Entry::Vacant(vacant) => {
                let marked = self.repo.connect_player(key.game_id, key.player_id);
                vacant.insert(connection.clone());
                (None, marked)
            }
        };

        if let Some(previous) = previous {
            info!(
                "🔁 Connection {} replaces {} for {}",
                connection.id(),
                previous.id(),
                key
            );
            previous.signal_shutdown();
        }

        self.spawn_guarded(&connection, "send", self.clone().send_loop(connection.clone(), sink, outbound));
        self.spawn_guarded(&connection, "receive", self.clone().receive_loop(connection.clone(), stream));

        match marked {
            Ok(()) => {
                info!("🔗 Connection {} registered for {}", connection.id(), key);
                self.handler.on_connect(self, key, first_join);
            }
            Err(e) => {
                warn!("Cannot mark {} as connected: {}", key, e);
                self.close(&connection);
            }
        }

        connection
    }

    /// Runs a connection task, closing the connection if it panics.
    fn spawn_guarded<F>(self: &Arc<Self>, connection: &Arc<Connection>, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let manager = self.clone();
        let connection = connection.clone();
        tokio::spawn(async move {
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                error!("💥 {} task of connection {} panicked", name, connection.id());
                manager.close(&connection);
            }
        });
    }

    async fn send_loop<S: MessageSink>(
        self: Arc<Self>,
        connection: Arc<Connection>,
        mut sink: S,
        mut outbound: mpsc::Receiver<Vec<u8>>,
    ) {
        let mut shutdown = connection.shutdown_signal();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                payload = outbound.recv() => match payload {
                    Some(payload) => {
                        if let Err(e) = sink.send(payload).await {
                            debug!("Send to connection {} failed: {}", connection.id(), e);
                            self.close(&connection);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        match AssertUnwindSafe(sink.close()).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Closing transport of connection {}: {}", connection.id(), e),
            Err(_) => error!("💥 Closing transport of connection {} panicked", connection.id()),
        }
        debug!("Send loop of connection {} finished", connection.id());
    }

    async fn receive_loop<R: MessageStream>(self: Arc<Self>, connection: Arc<Connection>, mut stream: R) {
        let mut shutdown = connection.shutdown_signal();
        let idle_timeout = self.settings.idle_timeout;

        loop {
            let deadline = idle_timeout.map(|limit| connection.last_seen() + limit);
            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = next_inbound(&mut stream, deadline) => received,
            };

            match received {
                Ok(Some(frame)) => {
                    connection.touch();
                    if let Inbound::Payload(payload) = frame {
                        self.dispatch(&connection, &payload);
                    }
                }
                Ok(None) => {
                    debug!("Peer closed connection {}", connection.id());
                    break;
                }
                Err(TransportError::Timeout) => {
                    info!("⏰ Connection {} idle for too long", connection.id());
                    break;
                }
                Err(e) => {
                    debug!("Receive on connection {} failed: {}", connection.id(), e);
                    break;
                }
            }
        }

        self.close(&connection);
    }

    fn dispatch(&self, connection: &Arc<Connection>, payload: &[u8]) {
        match serde_json::from_slice::<ClientCommand>(payload) {
            Ok(command) => {
                debug!("📨 {:?} from {}", command, connection.key());
                self.handler.handle(
                    self,
                    GameMessage {
                        key: connection.key(),
                        command,
                    },
                );
            }
            Err(e) => {
                debug!("Undecodable message from {}: {}", connection.key(), e);
                let err = ServerError::Serialization(e);
                self.deliver(connection, &ServerEvent::command_error(&err));
            }
        }
    }

    /// Closes a connection. Safe to call any number of times.
    pub fn close(&self, connection: &Arc<Connection>) {
        if !connection.signal_shutdown() {
            return;
        }

        let key = connection.key();
        let mut marked = None;
        self.connections.remove_if(&key, |_, current| {
            if !Arc::ptr_eq(current, connection) {
                return false;
            }
            marked = Some(self.repo.disconnect_player(key.game_id, key.player_id));
            true
        });

        let Some(marked) = marked else {
            debug!("Closed superseded connection {} for {}", connection.id(), key);
            return;
        };

        match marked {
            Ok(()) => {
                info!("🔌 Player {} disconnected from game {}", key.player_id, key.game_id);
                self.handler.on_disconnect(self, key);
            }
            // The player left or the game was evicted
            Err(e) => debug!("Connection {} closed without a seat: {}", connection.id(), e),
        }
    }

    pub fn close_key(&self, key: ConnectionKey) {
        let connection = self.connections.get(&key).map(|entry| entry.value().clone());
        if let Some(connection) = connection {
            self.close(&connection);
        }
    }

    /// Closes every connection of a game, returning how many were closed.
    pub fn close_game(&self, game_id: GameId) -> usize {
        let targets = self.game_connections(game_id);
        for connection in &targets {
            self.close(connection);
        }
        targets.len()
    }

    pub fn shutdown_all(&self) {
        let targets: Vec<Arc<Connection>> =
            self.connections.iter().map(|entry| entry.value().clone()).collect();
        info!("🛑 Closing {} connection(s)", targets.len());
        for connection in &targets {
            self.close(connection);
        }
    }

    /// Queues an event for every connected player of a game.
    ///
    /// A connection whose queue is full is closed; the others are unaffected.
    pub fn broadcast(&self, game_id: GameId, event: &ServerEvent) -> usize {
        let Some(payload) = encode(event) else {
            return 0;
        };

        self.game_connections(game_id)
            .iter()
            .filter(|connection| self.enqueue(connection, payload.clone()))
            .count()
    }

    /// Queues an event for one seat. Returns `false` if it is not connected.
    pub fn send_to(&self, key: ConnectionKey, event: &ServerEvent) -> bool {
        let connection = self.connections.get(&key).map(|entry| entry.value().clone());
        match connection {
            Some(connection) => self.deliver(&connection, event),
            None => false,
        }
    }

    fn deliver(&self, connection: &Arc<Connection>, event: &ServerEvent) -> bool {
        encode(event).is_some_and(|payload| self.enqueue(connection, payload))
    }

    fn enqueue(&self, connection: &Arc<Connection>, payload: Vec<u8>) -> bool {
        match connection.enqueue(payload) {
            Ok(()) => true,
            Err(TransportError::QueueFull) => {
                warn!("🐌 Outbound queue of connection {} is full, closing it", connection.id());
                self.close(connection);
                false
            }
            Err(_) => false,
        }
    }

    fn game_connections(&self, game_id: GameId) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|entry| entry.key().game_id == game_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn is_connected(&self, key: ConnectionKey) -> bool {
        self.connections.contains_key(&key)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

async fn next_inbound<R: MessageStream>(
    stream: &mut R,
    deadline: Option<Instant>,
) -> Result<Option<Inbound>, TransportError> {
    let received = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline.into(), stream.recv_frame())
            .await
            .map_err(|_| TransportError::Timeout)?,
        None => stream.recv_frame().await,
    };
    received.transpose()
}

fn encode(event: &ServerEvent) -> Option<Vec<u8>> {
    serde_json::to_vec(event)
        .map_err(|e| error!("Failed to serialize event: {}", e))
        .ok()
}
