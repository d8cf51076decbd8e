//! Configuration file structures
//!
//! The TOML file has one table per concern. Every table and every key is
//! optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};

/// Root of the configuration file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub lifecycle: LifecycleSettings,
    pub cards: CardSettings,
    pub logging: Option<LoggingSettings>,
}

/// Network and connection settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct ServerSettings {
    /// Format: "IP:PORT" (e.g. "127.0.0.1:8080", or "0.0.0.0:8080" for all interfaces)
    pub listen_addr: String,

    /// Events buffered per connection before a slow client is dropped
    pub outbound_queue_capacity: usize,

    /// Seconds of client silence before a connection is closed, 0 disables it
    pub connection_timeout_secs: u64,

    /// Seconds a fresh socket gets to upgrade and send its first message
    pub handshake_timeout_secs: u64,
}

/// Game expiry settings, all in seconds.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct LifecycleSettings {
    pub sweep_interval_secs: u64,
    pub max_lobby_age_secs: u64,
    pub max_in_progress_age_secs: u64,
    pub empty_game_grace_secs: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct CardSettings {
    /// JSON file holding the white cards, black cards and packs
    pub pack_file: String,
}

/// Logging output settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingSettings {
    /// Filter directive such as "info" or "game_server=debug"
    pub level: String,

    /// Emit structured JSON lines instead of human-readable output
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            outbound_queue_capacity: 64,
            connection_timeout_secs: 0,
            handshake_timeout_secs: 10,
        }
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 1,
            max_lobby_age_secs: 15 * 60,
            max_in_progress_age_secs: 3 * 60 * 60,
            empty_game_grace_secs: 2,
        }
    }
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            pack_file: "cards.json".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
