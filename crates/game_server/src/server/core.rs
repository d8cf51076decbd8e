//! Core game server implementation.
//!
//! [`GameServer`] owns the game repository and the connection manager, runs
//! the accept loop and the periodic eviction sweep, and coordinates shutdown.

use crate::{
    config::ServerConfig,
    connection::ConnectionManager,
    error::ServerError,
    messaging::GameRouter,
    server::handlers::handle_connection,
};
use game_logic::Catalog;
use game_repo::GameRepo;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// The game server.
///
/// All game state lives in the [`GameRepo`]; the server only moves messages
/// between sockets and games and expires stale games.
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Registry of every live game
    repo: Arc<GameRepo>,

    /// Manager for player connections and messaging
    connection_manager: Arc<ConnectionManager>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a server over the given card catalog. Nothing is bound until
    /// [`start`](Self::start) or [`serve`](Self::serve) is called.
    pub fn new(config: ServerConfig, catalog: Arc<Catalog>) -> Self {
        let repo = Arc::new(GameRepo::with_policy(catalog, config.eviction));
        let router = Arc::new(GameRouter::new(repo.clone()));
        let connection_manager = Arc::new(ConnectionManager::new(
            repo.clone(),
            router,
            config.connection,
        ));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            repo,
            connection_manager,
            shutdown_sender,
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting game server on {}", self.config.bind_address);
        let listener = bind_listener(self.config.bind_address)?;
        info!("✅ Listener bound on {}", self.config.bind_address);
        self.serve(listener).await
    }

    /// Runs the accept loop and the eviction sweep on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let sweeper = self.spawn_eviction_task();

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        debug!("Accepted connection from {}", addr);
                        let connection_manager = self.connection_manager.clone();
                        let config = self.config.clone();

                        tokio::spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, addr, connection_manager, config).await
                            {
                                warn!("Connection from {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        return Err(ServerError::Network(e.to_string()));
                    }
                }
            }
        };

        let result = tokio::select! {
            result = accept_loop => result,
            _ = shutdown_receiver.recv() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        sweeper.abort();
        info!("🧹 Closing remaining connections...");
        self.connection_manager.shutdown_all();
        info!("Server stopped");
        result
    }

    /// Periodically evicts stale games and drops their connections.
    fn spawn_eviction_task(&self) -> JoinHandle<()> {
        let repo = self.repo.clone();
        let connection_manager = self.connection_manager.clone();
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_receiver.recv() => break,
                }

                for (game_id, reason) in repo.sweep(Instant::now()) {
                    let closed = connection_manager.close_game(game_id);
                    info!(
                        "🧽 Evicted game {} ({:?}), closed {} connection(s)",
                        game_id, reason, closed
                    );
                }
            }
            debug!("Eviction task stopped");
        })
    }

    /// Signals the accept loop and the sweeper to stop and closes every connection.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        self.connection_manager.shutdown_all();
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn repo(&self) -> Arc<GameRepo> {
        self.repo.clone()
    }

    pub fn connection_manager(&self) -> Arc<ConnectionManager> {
        self.connection_manager.clone()
    }
}

fn bind_listener(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
    socket.set_reuse_address(true).ok();

    socket
        .bind(&addr.into())
        .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
    socket
        .listen(1024)
        .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

    let std_listener: StdTcpListener = socket.into();
    std_listener
        .set_nonblocking(true)
        .map_err(|e| ServerError::Network(e.to_string()))?;

    TcpListener::from_std(std_listener)
        .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))
}
