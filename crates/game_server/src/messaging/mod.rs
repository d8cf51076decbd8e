//! Wire messages and command routing.

pub mod router;
pub mod types;

pub use router::GameRouter;
pub use types::{ClientCommand, ClientHello, HandshakeReply, ServerEvent};
