//! Connection management for player transports.
//!
//! This module owns the lifecycle of every live connection: registration
//! keyed by (game, player), the per-connection send and receive tasks,
//! bounded outbound queues and disconnect detection.

pub mod connection;
pub mod manager;
pub mod transport;

pub use connection::{Connection, ConnectionId, ConnectionKey};
pub use manager::{CommandHandler, ConnectionManager, ConnectionSettings, GameMessage};
pub use transport::{
    channel_transport, ChannelPeer, ChannelSink, ChannelStream, Inbound, MessageSink, MessageStream,
};
