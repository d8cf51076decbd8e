//! First-message negotiation on a fresh socket.
//!
//! A socket either binds to a seat (create a game, join one, or rejoin with
//! an issued player id) or asks a one-off lobby question and is then closed.

use crate::connection::{ConnectionKey, MessageSink, MessageStream};
use crate::error::{ServerError, TransportError};
use crate::messaging::types::{ClientHello, HandshakeReply};
use game_logic::GameSettings;
use game_repo::GameRepo;
use std::time::Duration;
use tracing::{debug, info};

/// What a finished handshake asks the caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// Register the transport for this seat.
    Session {
        key: ConnectionKey,
        /// The seat was created by this handshake and other players have not
        /// been told about it yet
        first_join: bool,
    },
    /// A lobby query was answered; the socket has no further use.
    Answered,
}

/// Reads the hello, performs it against the repository and writes the reply.
///
/// Failures that the client caused are answered with a `handshakeError`
/// before being returned.
pub async fn perform_handshake<S, R>(
    repo: &GameRepo,
    sink: &mut S,
    stream: &mut R,
    timeout: Duration,
) -> Result<HandshakeOutcome, ServerError>
where
    S: MessageSink,
    R: MessageStream,
{
    let payload = match tokio::time::timeout(timeout, stream.recv()).await {
        Ok(Some(Ok(payload))) => payload,
        Ok(Some(Err(e))) => return Err(e.into()),
        Ok(None) => return Err(TransportError::Closed.into()),
        Err(_) => return Err(TransportError::Timeout.into()),
    };

    let result = serde_json::from_slice::<ClientHello>(&payload)
        .map_err(ServerError::from)
        .and_then(|hello| answer(repo, hello));

    match result {
        Ok((reply, outcome)) => {
            sink.send(serde_json::to_vec(&reply)?).await?;
            Ok(outcome)
        }
        Err(err) => {
            debug!("Handshake rejected: {}", err);
            sink.send(serde_json::to_vec(&HandshakeReply::error(&err))?)
                .await?;
            Err(err)
        }
    }
}

fn answer(repo: &GameRepo, hello: ClientHello) -> Result<(HandshakeReply, HandshakeOutcome), ServerError> {
    match hello {
        ClientHello::CreateGame {
            settings,
            player_name,
        } => {
            let (game_id, player_id) = repo.create_game(settings, &player_name)?;
            Ok(session(game_id, player_id, false))
        }
        ClientHello::CreatePlayer {
            game_id,
            player_name,
            password,
        } => {
            let player_id = repo.create_player(game_id, &player_name, &password)?;
            info!("👋 '{}' joined game {} as {}", player_name, game_id, player_id);
            Ok(session(game_id, player_id, true))
        }
        ClientHello::Rejoin {
            game_id,
            player_id,
            password,
        } => {
            repo.join_game(game_id, player_id, &password)?;
            Ok(session(game_id, player_id, false))
        }
        ClientHello::ListGames => Ok((
            HandshakeReply::Games {
                games: repo.game_infos(),
            },
            HandshakeOutcome::Answered,
        )),
        ClientHello::ListPacks => {
            let catalog = repo.catalog();
            let packs = catalog.packs().iter().map(|pack| (**pack).clone()).collect();
            Ok((
                HandshakeReply::Packs {
                    packs,
                    default_settings: GameSettings::default_for(catalog).ok(),
                },
                HandshakeOutcome::Answered,
            ))
        }
    }
}

fn session(
    game_id: game_logic::GameId,
    player_id: game_logic::PlayerId,
    first_join: bool,
) -> (HandshakeReply, HandshakeOutcome) {
    (
        HandshakeReply::Session { game_id, player_id },
        HandshakeOutcome::Session {
            key: ConnectionKey::new(game_id, player_id),
            first_join,
        },
    )
}
