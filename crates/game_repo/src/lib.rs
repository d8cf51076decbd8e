//! # Game Registry
//!
//! Maps game ids to running [`Game`](game_logic::Game)s, keeps them ordered by
//! creation time and evicts the ones that have gone stale.
//!
//! A single [`GameRepo`] is shared by the whole server (usually as
//! `Arc<GameRepo>`). The connection layer calls [`GameRepo::sweep`] on a fixed
//! interval and closes the connections of whatever it evicted.

pub mod error;
pub mod policy;
pub mod repo;

pub use error::{RepoError, RepoResult};
pub use policy::{
    EvictionPolicy, EvictionReason, EMPTY_GAME_GRACE, MAX_IN_PROGRESS_AGE, MAX_LOBBY_AGE,
};
pub use repo::GameRepo;
