//! Command routing from players to their games.
//!
//! [`GameRouter`] turns decoded [`ClientCommand`]s into game operations and
//! fans the resulting events out through the [`ConnectionManager`]. Every
//! failure is reported back to the sender only, as a `commandError` event.

use crate::connection::{CommandHandler, ConnectionKey, ConnectionManager, GameMessage};
use crate::error::ServerError;
use crate::messaging::types::{ClientCommand, ServerEvent};
use game_logic::{Game, GameError, GameOver, GameState, RoundOutcome};
use game_repo::GameRepo;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct GameRouter {
    repo: Arc<GameRepo>,
}

impl GameRouter {
    pub fn new(repo: Arc<GameRepo>) -> Self {
        Self { repo }
    }

    fn execute(
        &self,
        manager: &ConnectionManager,
        key: ConnectionKey,
        command: ClientCommand,
    ) -> Result<(), ServerError> {
        let ConnectionKey { game_id, player_id } = key;

        match command {
            ClientCommand::Ping => {
                manager.send_to(key, &ServerEvent::Pong);
            }
            ClientCommand::StartGame => {
                let game = self.owned_game(key)?;
                game.start_game()?;
                info!("▶️ Player {} started game {}", player_id, game_id);
                broadcast_snapshot(manager, &game);
                send_round_started(manager, &game)?;
            }
            ClientCommand::ChangeSettings { settings } => {
                self.owned_game(key)?;
                self.repo.change_settings(game_id, settings.clone())?;
                manager.broadcast(game_id, &ServerEvent::SettingsChanged { settings });
            }
            ClientCommand::PlayCards { card_ids } => {
                let game = self.repo.get_game(game_id)?;
                let outcome = game.play_cards(player_id, &card_ids)?;

                manager.broadcast(game_id, &ServerEvent::CardsPlayed { player_id });
                manager.send_to(
                    key,
                    &ServerEvent::HandUpdated {
                        hand: game.hand_of(player_id)?,
                    },
                );

                if outcome.judging_started {
                    manager.broadcast(game_id, &ServerEvent::CzarJudging { plays: outcome.plays });
                }
            }
            ClientCommand::SelectWinner {
                player_id: winner_id,
            } => {
                let game = self.repo.get_game(game_id)?;
                let winner = game.czar_select_winner(player_id, winner_id)?;
                manager.broadcast(game_id, &ServerEvent::WinnerAnnounced { winner });
            }
            ClientCommand::NextRound => {
                let game = self.owned_game(key)?;
                match game.next_round()? {
                    RoundOutcome::Started { round, .. } => {
                        debug!("Game {} entered round {}", game_id, round);
                        broadcast_snapshot(manager, &game);
                        send_round_started(manager, &game)?;
                    }
                    RoundOutcome::GameOver(over) => {
                        broadcast_game_over(manager, &game, over);
                    }
                }
            }
            ClientCommand::LeaveGame => {
                let removal = self.repo.player_leave_game(game_id, player_id)?;

                manager.broadcast(
                    game_id,
                    &ServerEvent::PlayerLeft {
                        player_id,
                        new_owner: removal.new_owner,
                    },
                );
                manager.close_key(key);

                if removal.players_left > 0 {
                    let game = self.repo.get_game(game_id)?;
                    if let Some(over) = removal.game_over {
                        broadcast_game_over(manager, &game, over);
                    } else {
                        broadcast_snapshot(manager, &game);
                        if removal.round_voided {
                            send_round_started(manager, &game)?;
                        }
                        if removal.judging_started {
                            manager.broadcast(game_id, &ServerEvent::CzarJudging { plays: removal.plays });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn owned_game(&self, key: ConnectionKey) -> Result<Arc<Game>, ServerError> {
        let game = self.repo.get_game(key.game_id)?;
        if !game.is_owner(key.player_id) {
            return Err(GameError::NotGameOwner.into());
        }
        Ok(game)
    }
}

impl CommandHandler for GameRouter {
    fn handle(&self, manager: &ConnectionManager, message: GameMessage) {
        let key = message.key;
        if let Err(err) = self.execute(manager, key, message.command) {
            debug!("Command from {} rejected: {}", key, err);
            manager.send_to(key, &ServerEvent::command_error(&err));
        }
    }

    fn on_connect(&self, manager: &ConnectionManager, key: ConnectionKey, first_join: bool) {
        let game = match self.repo.get_game(key.game_id) {
            Ok(game) => game,
            Err(e) => {
                warn!("Connected player {} has no game: {}", key.player_id, e);
                return;
            }
        };

        if first_join {
            if let Ok(name) = game.player_name(key.player_id) {
                manager.broadcast(
                    key.game_id,
                    &ServerEvent::PlayerJoined {
                        player_id: key.player_id,
                        name,
                    },
                );
            }
        }

        manager.broadcast(
            key.game_id,
            &ServerEvent::PlayerConnected {
                player_id: key.player_id,
            },
        );

        // Bring the (re)connected player up to date
        manager.send_to(
            key,
            &ServerEvent::StateSnapshot {
                state: game.state_info(),
            },
        );
        if game.state() != GameState::InLobby {
            if let Ok(hand) = game.hand_of(key.player_id) {
                manager.send_to(key, &ServerEvent::HandUpdated { hand });
            }
        }
    }

    fn on_disconnect(&self, manager: &ConnectionManager, key: ConnectionKey) {
        manager.broadcast(
            key.game_id,
            &ServerEvent::PlayerDisconnected {
                player_id: key.player_id,
            },
        );
    }
}

fn broadcast_snapshot(manager: &ConnectionManager, game: &Game) {
    manager.broadcast(
        game.id(),
        &ServerEvent::StateSnapshot {
            state: game.state_info(),
        },
    );
}

/// Sends every player the round view containing only their own hand.
fn send_round_started(manager: &ConnectionManager, game: &Game) -> Result<(), ServerError> {
    let round = game.round_info()?;
    for (player_id, hand) in round.hands {
        manager.send_to(
            ConnectionKey::new(game.id(), player_id),
            &ServerEvent::RoundStarted {
                round: round.round,
                czar_id: round.czar_id,
                black_card: round.black_card.clone(),
                hand,
            },
        );
    }
    Ok(())
}

fn broadcast_game_over(manager: &ConnectionManager, game: &Game, over: GameOver) {
    info!("🏁 Game {} is over ({:?})", game.id(), over.reason);
    manager.broadcast(
        game.id(),
        &ServerEvent::GameOver {
            reason: over.reason,
            winners: over.winners,
        },
    );
    broadcast_snapshot(manager, game);
}
