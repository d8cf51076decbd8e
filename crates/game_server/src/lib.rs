//! # Game Server
//!
//! WebSocket front end for the party card game. Each socket is bound to one
//! seat (a player in a game) by its first message, after which it carries
//! [`ClientCommand`]s in and [`ServerEvent`]s out.
//!
//! ## Architecture Overview
//!
//! * **Game Repository** - `game_repo::GameRepo` holds every game and expires stale ones
//! * **Connection Manager** - one send task and one receive task per socket,
//!   bounded outbound queues and reconnect replacement
//! * **Router** - [`GameRouter`](messaging::GameRouter) applies commands to
//!   games and fans events out to the right players
//!
//! ### Message Flow
//!
//! 1. Client opens a WebSocket and sends a hello (`createGame`, `createPlayer`,
//!    `rejoin`, `listGames` or `listPacks`)
//! 2. The server answers with a `session` (or the requested listing)
//! 3. The session socket is registered and the player marked connected
//! 4. Commands are decoded on the receive task and applied under the game's lock
//! 5. Resulting events are queued on every affected connection
//!
//! ```json
//! { "type": "createPlayer", "gameId": "…", "playerName": "Bob", "password": "" }
//! ```
//!
//! ## Error Handling
//!
//! Rejected commands never affect other players: the sender receives a
//! `commandError` carrying a message and an [`ErrorCategory`].
//!
//! ## Thread Safety
//!
//! * Connections live in a `DashMap` keyed by (game, player)
//! * Every game is guarded by its own mutex; the repository lock is always
//!   taken before a game lock

// Re-export core types and functions for easy access
pub use config::ServerConfig;
pub use connection::{ConnectionKey, ConnectionManager, ConnectionSettings};
pub use error::{ErrorCategory, ServerError, TransportError};
pub use messaging::{ClientCommand, ClientHello, GameRouter, HandshakeReply, ServerEvent};
pub use server::GameServer;

pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod server;
pub mod shutdown;

use game_logic::Catalog;
use std::path::Path;
use std::sync::Arc;

/// Loads a card pack file into a shareable catalog.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Arc<Catalog>, ServerError> {
    let catalog = Catalog::load_from_file(path.as_ref())
        .map_err(|e| ServerError::Config(e.to_string()))?;
    Ok(Arc::new(catalog))
}

/// Creates a server with default configuration.
pub fn create_server(catalog: Arc<Catalog>) -> GameServer {
    GameServer::new(ServerConfig::default(), catalog)
}

pub fn create_server_with_config(config: ServerConfig, catalog: Arc<Catalog>) -> GameServer {
    GameServer::new(config, catalog)
}
