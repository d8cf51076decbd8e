//! Socket acceptance, handshakes and the server lifecycle.

pub mod core;
pub mod handlers;
pub mod handshake;

pub use self::core::GameServer;
pub use handshake::{perform_handshake, HandshakeOutcome};
