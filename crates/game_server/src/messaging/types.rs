//! Message type definitions for client-server communication.
//!
//! Every message is a JSON object tagged by its `type` field, with camelCase
//! field names.
//!
//! ```json
//! { "type": "playCards", "cardIds": [12, 40] }
//! ```

use crate::error::{ErrorCategory, ServerError};
use game_logic::{
    BlackCard, CardId, CardPack, GameId, GameInfo, GameOverReason, GameSettings, GameStateInfo,
    PlayerId, RoundWinner, SubmittedPlay, WhiteCard,
};
use serde::{Deserialize, Serialize};

/// First message on a fresh connection, choosing what the socket is for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientHello {
    #[serde(rename_all = "camelCase")]
    CreateGame {
        settings: GameSettings,
        player_name: String,
    },
    #[serde(rename_all = "camelCase")]
    CreatePlayer {
        game_id: GameId,
        player_name: String,
        #[serde(default)]
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    Rejoin {
        game_id: GameId,
        player_id: PlayerId,
        #[serde(default)]
        password: String,
    },
    ListGames,
    ListPacks,
}

/// Server answer to a [`ClientHello`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HandshakeReply {
    #[serde(rename_all = "camelCase")]
    Session { game_id: GameId, player_id: PlayerId },
    Games { games: Vec<GameInfo> },
    #[serde(rename_all = "camelCase")]
    Packs {
        packs: Vec<CardPack>,
        default_settings: Option<GameSettings>,
    },
    HandshakeError {
        reason: String,
        category: ErrorCategory,
    },
}

/// Commands a registered player can send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    StartGame,
    ChangeSettings {
        settings: GameSettings,
    },
    #[serde(rename_all = "camelCase")]
    PlayCards {
        card_ids: Vec<CardId>,
    },
    #[serde(rename_all = "camelCase")]
    SelectWinner {
        player_id: PlayerId,
    },
    NextRound,
    LeaveGame,
    Ping,
}

/// Events pushed to players.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    PlayerJoined { player_id: PlayerId, name: String },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        new_owner: Option<PlayerId>,
    },
    #[serde(rename_all = "camelCase")]
    PlayerConnected { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    PlayerDisconnected { player_id: PlayerId },
    StateSnapshot { state: GameStateInfo },
    SettingsChanged { settings: GameSettings },
    /// Sent to each player separately; `hand` is the receiver's own hand
    #[serde(rename_all = "camelCase")]
    RoundStarted {
        round: u32,
        czar_id: PlayerId,
        black_card: BlackCard,
        hand: Vec<WhiteCard>,
    },
    HandUpdated { hand: Vec<WhiteCard> },
    #[serde(rename_all = "camelCase")]
    CardsPlayed { player_id: PlayerId },
    CzarJudging { plays: Vec<SubmittedPlay> },
    WinnerAnnounced { winner: RoundWinner },
    GameOver {
        reason: GameOverReason,
        winners: Vec<PlayerId>,
    },
    CommandError {
        message: String,
        category: ErrorCategory,
    },
    Pong,
}

impl ServerEvent {
    pub fn command_error(err: &ServerError) -> Self {
        ServerEvent::CommandError {
            message: err.to_string(),
            category: err.category(),
        }
    }
}

impl HandshakeReply {
    pub fn error(err: &ServerError) -> Self {
        HandshakeReply::HandshakeError {
            reason: err.to_string(),
            category: err.category(),
        }
    }
}
