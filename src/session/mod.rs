//! Client-side session state machine.
//!
//! [`SessionMachine`] is a synchronous reducer. Relay notifications, server
//! events and local actions each read the current state, update it and return
//! the [`Effect`]s the driver must carry out. Nothing here waits on the
//! network: commands are fire-and-forget and the server's later events drive
//! every transition that matters.

mod game;
mod negotiation;

pub use game::{ChatLine, GameState, GameSummary, Phase, ShotError};
pub use negotiation::{
    MatchOffer, Matchmaking, Negotiations, Notice, NoticeLevel, Overlay,
};

use std::collections::VecDeque;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::common::BoardError;
use crate::coord::{self, CoordError};
use crate::protocol::{
    decode_event, ChallengeStatus, Command, DrawStatus, Event, LeaderboardEntry, MatchRecord,
    PlayerEntry, RelayEvent, RECONNECT_GRACE_SECS,
};
use crate::store::Identity;

/// Notices kept for display before the oldest are dropped.
const MAX_NOTICES: usize = 32;

/// Work the driver performs on behalf of the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Command),
    Notify(Notice),
    SaveIdentity(Identity),
    ClearIdentity,
    SetInGame(bool),
}

/// Coarse position in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unauthenticated,
    Lobby,
    InGame(Phase),
}

/// Something the local player asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Login { username: String, password: String },
    Register { username: String, password: String },
    Logout,
    RefreshPlayers,
    RefreshLeaderboard,
    RefreshHistory,
    Challenge { target: String },
    AnswerChallenge { accept: bool },
    /// Place the next catalog ship anchored at a coordinate like `A5`.
    PlaceShip { coord: String },
    ToggleOrientation,
    RotateShip { index: usize },
    ResetFleet,
    AutoPlace,
    ConfirmShips,
    Fire { coord: String },
    Chat { message: String },
    Surrender,
    OfferDraw,
    AnswerDraw { accept: bool },
    StartMatching,
    CancelMatching,
    MatchReady,
    MatchDecline,
    /// Resume a dropped session with the stored token.
    Reconnect,
    DismissNotice,
}

/// A local action refused before anything was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("not connected to game server")]
    NotConnected,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("already logged in")]
    AlreadyLoggedIn,
    #[error("no game in progress")]
    NotInGame,
    #[error("already in a game")]
    AlreadyInGame,
    #[error("not possible while the game is {0:?}")]
    WrongPhase(Phase),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("place every ship before confirming")]
    FleetIncomplete,
    #[error("ships were already submitted")]
    PlacementSubmitted,
    #[error("nothing is waiting for an answer")]
    NoPendingNegotiation,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordError),
    #[error("{0}")]
    Placement(#[from] BoardError),
    #[error("no stored session to resume")]
    MissingSessionToken,
}

/// Lobby data as last sent by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyCache {
    pub players: Vec<PlayerEntry>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub history: Vec<MatchRecord>,
}

pub struct SessionMachine {
    bridge_live: bool,
    authenticated: bool,
    identity: Option<Identity>,
    game: Option<GameState>,
    negotiations: Negotiations,
    lobby: LobbyCache,
    notices: VecDeque<Notice>,
    last_summary: Option<GameSummary>,
    rng: SmallRng,
}

impl SessionMachine {
    /// Start unauthenticated, remembering `identity` for auto-login.
    pub fn new(identity: Option<Identity>) -> Self {
        Self::with_rng(identity, SmallRng::from_rng(&mut rand::rng()))
    }

    /// Same as [`SessionMachine::new`] with a fixed generator for auto-placement.
    pub fn with_rng(identity: Option<Identity>, rng: SmallRng) -> Self {
        Self {
            bridge_live: false,
            authenticated: false,
            identity,
            game: None,
            negotiations: Negotiations::default(),
            lobby: LobbyCache::default(),
            notices: VecDeque::new(),
            last_summary: None,
            rng,
        }
    }

    pub fn stage(&self) -> Stage {
        match (&self.game, self.authenticated) {
            (_, false) => Stage::Unauthenticated,
            (Some(game), true) => Stage::InGame(game.phase()),
            (None, true) => Stage::Lobby,
        }
    }

    pub fn bridge_live(&self) -> bool {
        self.bridge_live
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn negotiations(&self) -> &Negotiations {
        &self.negotiations
    }

    pub fn lobby(&self) -> &LobbyCache {
        &self.lobby
    }

    pub fn notices(&self) -> &VecDeque<Notice> {
        &self.notices
    }

    pub fn last_summary(&self) -> Option<&GameSummary> {
        self.last_summary.as_ref()
    }

    /// The prompt the UI should show on top of everything else.
    pub fn top_overlay(&self) -> Option<Overlay<'_>> {
        self.negotiations.top(&self.notices)
    }

    fn notify(&mut self, notice: Notice) -> Effect {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(notice.clone());
        Effect::Notify(notice)
    }

    /// React to a notification from the bridge.
    pub fn handle_relay(&mut self, event: RelayEvent) -> Vec<Effect> {
        match event {
            RelayEvent::ServerConnected { message } => {
                info!("[Session] bridge live: {}", message);
                self.bridge_live = true;
                match (&self.identity, self.authenticated) {
                    (Some(identity), false) => vec![Effect::Send(Command::Login {
                        username: identity.username.clone(),
                        password: None,
                    })],
                    _ => Vec::new(),
                }
            }
            RelayEvent::ServerMessage(value) => match decode_event(value) {
                Ok(event) => self.handle_event(event),
                Err(e) => {
                    warn!("[Session] dropping server message: {}", e);
                    Vec::new()
                }
            },
            RelayEvent::ServerError { error } => {
                self.link_lost();
                vec![self.notify(Notice::error(format!("Server error: {error}")))]
            }
            RelayEvent::ServerDisconnected { message } => {
                self.link_lost();
                vec![self.notify(Notice::error(message))]
            }
            RelayEvent::Error { message } => vec![self.notify(Notice::error(message))],
        }
    }

    // The server session ended with the link; prompts belonged to it.
    fn link_lost(&mut self) {
        self.bridge_live = false;
        self.authenticated = false;
        self.negotiations.clear();
    }

    /// React to one decoded server event.
    pub fn handle_event(&mut self, event: Event) -> Vec<Effect> {
        debug!("[Session] event {:?}", event);
        match event {
            Event::LoginSuccess {
                username,
                elo,
                session_token,
            } => {
                let identity = Identity {
                    username,
                    elo,
                    session_token,
                };
                self.identity = Some(identity.clone());
                self.authenticated = true;
                let welcome = format!("Logged in as {} (ELO {})", identity.username, identity.elo);
                vec![Effect::SaveIdentity(identity), self.notify(Notice::info(welcome))]
            }
            Event::RegisterSuccess {} => {
                vec![self.notify(Notice::info("Registration successful, you can log in now"))]
            }
            Event::GameStart { opponent, your_turn } => {
                self.negotiations.clear();
                let text = format!("Game against {} started, place your ships", opponent);
                self.game = Some(GameState::new(opponent, your_turn));
                vec![Effect::SetInGame(true), self.notify(Notice::info(text))]
            }
            Event::GameReady {} => match self.game.as_mut() {
                Some(game) => {
                    game.start_playing();
                    let text = if game.your_turn() {
                        "Both fleets are ready, you fire first"
                    } else {
                        "Both fleets are ready, waiting for the opponent"
                    };
                    vec![self.notify(Notice::info(text))]
                }
                None => ignored("GAME_READY"),
            },
            Event::MoveResult {
                coord,
                result,
                ship_sunk,
                is_your_shot,
            } => {
                let Some(game) = self.game.as_mut() else {
                    return ignored("MOVE_RESULT");
                };
                if let Err(e) = game.apply_shot(&coord, result, is_your_shot) {
                    warn!("[Session] dropping MOVE_RESULT for {:?}: {}", coord, e);
                    return Vec::new();
                }
                match ship_sunk {
                    Some(ship) if is_your_shot.unwrap_or(true) => {
                        vec![self.notify(Notice::info(format!("You sank the {ship}!")))]
                    }
                    Some(ship) => {
                        vec![self.notify(Notice::warning(format!("Your {ship} was sunk")))]
                    }
                    None => Vec::new(),
                }
            }
            Event::TurnChange { your_turn } => match self.game.as_mut() {
                Some(game) => {
                    game.set_turn(your_turn);
                    Vec::new()
                }
                None => ignored("TURN_CHANGE"),
            },
            Event::GameEnd { result, reason, elo } => {
                let opponent = self
                    .game
                    .take()
                    .map(|game| game.opponent().to_string())
                    .unwrap_or_default();
                self.negotiations.clear();
                let mut effects = Vec::new();
                if let (Some(elo), Some(identity)) = (elo, self.identity.as_mut()) {
                    identity.elo = elo;
                    effects.push(Effect::SaveIdentity(identity.clone()));
                }
                let summary = GameSummary {
                    opponent,
                    result,
                    reason,
                    elo,
                };
                effects.push(Effect::SetInGame(false));
                effects.push(self.notify(Notice::info(summary.headline())));
                self.last_summary = Some(summary);
                effects
            }
            Event::Challenge { challenger } => {
                if !self.negotiations.push_challenge(challenger.clone()) {
                    debug!("[Session] duplicate challenge from {}", challenger);
                }
                Vec::new()
            }
            Event::SystemMsg { code, message } => {
                if code == 200 {
                    return vec![self.notify(Notice::info(message))];
                }
                let rejected_placement = self.game.as_mut().filter(|game| {
                    game.phase() == Phase::Placing
                        && game.placement_submitted()
                        && !game.placement_confirmed()
                });
                match rejected_placement {
                    Some(game) => {
                        game.revert_placement();
                        let text = format!("Ship placement rejected: {message}");
                        vec![self.notify(Notice::error(text))]
                    }
                    None => vec![self.notify(Notice::error(message))],
                }
            }
            Event::DrawOffer { from } => {
                self.negotiations.offer_draw(from);
                Vec::new()
            }
            Event::DrawRejected {} => {
                self.negotiations.set_awaiting_draw_reply(false);
                vec![self.notify(Notice::info("Your draw offer was rejected"))]
            }
            Event::MatchingStarted {} => {
                self.negotiations.start_search();
                Vec::new()
            }
            Event::MatchFound { opponent, elo } => {
                self.negotiations.match_found(opponent, elo);
                Vec::new()
            }
            Event::OpponentReady {} => {
                if !self.negotiations.mark_opponent_ready() {
                    return ignored("OPPONENT_READY");
                }
                Vec::new()
            }
            Event::WaitingOpponent {} => {
                vec![self.notify(Notice::info("Waiting for the opponent to accept"))]
            }
            Event::MatchDeclined { message } => {
                self.negotiations.clear_matchmaking();
                let text = message.unwrap_or_else(|| "The match was declined".to_string());
                vec![self.notify(Notice::info(text))]
            }
            Event::MatchingCancelled {} => {
                self.negotiations.clear_matchmaking();
                vec![self.notify(Notice::info("Matchmaking cancelled"))]
            }
            Event::LogoutSuccess {} => {
                self.authenticated = false;
                self.identity = None;
                self.game = None;
                self.negotiations.clear();
                self.lobby = LobbyCache::default();
                vec![
                    Effect::ClearIdentity,
                    Effect::SetInGame(false),
                    self.notify(Notice::info("Logged out")),
                ]
            }
            Event::PlayerList { players } => {
                self.lobby.players = players;
                Vec::new()
            }
            Event::Leaderboard { players } => {
                self.lobby.leaderboard = players;
                Vec::new()
            }
            Event::MatchHistory { matches } => {
                self.lobby.history = matches;
                Vec::new()
            }
            Event::Chat { from, message } => match self.game.as_mut() {
                Some(game) => {
                    game.push_chat(from, message);
                    Vec::new()
                }
                None => ignored("CHAT"),
            },
            Event::OpponentDisconnected { opponent, timeout } => {
                if let Some(game) = self.game.as_mut() {
                    game.set_opponent_away(true);
                }
                let secs = timeout.unwrap_or(RECONNECT_GRACE_SECS);
                let text = format!("{opponent} disconnected, waiting up to {secs}s for them to return");
                vec![self.notify(Notice::warning(text))]
            }
            Event::OpponentReconnected { opponent } => {
                if let Some(game) = self.game.as_mut() {
                    game.set_opponent_away(false);
                }
                vec![self.notify(Notice::info(format!("{opponent} is back")))]
            }
            Event::ReconnectSuccess {
                username,
                elo,
                status,
                opponent,
                your_turn,
                phase,
                my_board,
            } => {
                let session_token = self
                    .identity
                    .as_ref()
                    .and_then(|identity| identity.session_token.clone());
                let identity = Identity {
                    username,
                    elo,
                    session_token,
                };
                self.identity = Some(identity.clone());
                self.authenticated = true;
                self.negotiations.clear();

                let mut effects = vec![Effect::SaveIdentity(identity)];
                match (status.as_str(), opponent) {
                    ("IN_GAME", Some(opponent)) => {
                        let phase = phase
                            .as_deref()
                            .and_then(Phase::from_wire)
                            .unwrap_or(Phase::Placing);
                        let text = format!("Resumed game against {opponent}");
                        let mut game =
                            GameState::resumed(opponent, your_turn.unwrap_or(false), phase);
                        if let Some(grid) = my_board {
                            if let Err(e) = game.restore_own_board(&grid) {
                                warn!("[Session] ignoring replayed board: {}", e);
                            }
                        }
                        self.game = Some(game);
                        effects.push(Effect::SetInGame(true));
                        effects.push(self.notify(Notice::info(text)));
                    }
                    _ => {
                        self.game = None;
                        effects.push(Effect::SetInGame(false));
                        effects.push(self.notify(Notice::info("Session resumed")));
                    }
                }
                effects
            }
            Event::ReconnectFailed { message } => {
                self.authenticated = false;
                self.game = None;
                let mut effects = vec![Effect::SetInGame(false)];
                if let Some(identity) = self.identity.as_mut() {
                    identity.session_token = None;
                    effects.push(Effect::SaveIdentity(identity.clone()));
                }
                let text = message.unwrap_or_else(|| "Could not resume the session".to_string());
                effects.push(self.notify(Notice::error(text)));
                effects
            }
            Event::Welcome { message } => {
                debug!("[Session] server greeting: {:?}", message);
                Vec::new()
            }
            Event::ChallengeReply { player, status } => {
                let who = player.unwrap_or_else(|| "Your opponent".to_string());
                let notice = match status {
                    ChallengeStatus::Accept => {
                        Notice::info(format!("{who} accepted your challenge"))
                    }
                    ChallengeStatus::Reject => {
                        Notice::warning(format!("{who} rejected your challenge"))
                    }
                };
                vec![self.notify(notice)]
            }
            Event::PlaceShipAck { message } => {
                let confirmed = self
                    .game
                    .as_mut()
                    .is_some_and(|game| game.confirm_placement());
                if !confirmed {
                    return ignored("PLACE_SHIP_ACK");
                }
                let text = message.unwrap_or_else(|| "Ships placed".to_string());
                vec![self.notify(Notice::info(text))]
            }
            Event::Error { message } => vec![self.notify(Notice::error(message))],
        }
    }

    /// The transport to the bridge ended without a terminal notification.
    pub fn handle_link_closed(&mut self) -> Vec<Effect> {
        if !self.bridge_live {
            return Vec::new();
        }
        self.link_lost();
        vec![self.notify(Notice::error("Connection to the relay lost"))]
    }

    /// Validate and carry out a local action.
    pub fn perform(&mut self, action: Action) -> Result<Vec<Effect>, ActionError> {
        match action {
            Action::Login { username, password } => {
                self.require_link()?;
                if self.authenticated {
                    return Err(ActionError::AlreadyLoggedIn);
                }
                let username = non_empty(username, "username")?;
                Ok(send(Command::Login {
                    username,
                    password: Some(password),
                }))
            }
            Action::Register { username, password } => {
                self.require_link()?;
                let username = non_empty(username, "username")?;
                let password = non_empty(password, "password")?;
                Ok(send(Command::Register { username, password }))
            }
            Action::Logout => {
                self.require_login()?;
                Ok(send(Command::Logout {}))
            }
            Action::RefreshPlayers => {
                self.require_login()?;
                Ok(send(Command::PlayerList {}))
            }
            Action::RefreshLeaderboard => {
                self.require_login()?;
                Ok(send(Command::Leaderboard {}))
            }
            Action::RefreshHistory => {
                self.require_login()?;
                Ok(send(Command::MatchHistory {}))
            }
            Action::Challenge { target } => {
                self.require_lobby()?;
                let target_username = non_empty(target, "opponent name")?;
                Ok(send(Command::Challenge { target_username }))
            }
            Action::AnswerChallenge { accept } => {
                self.require_login()?;
                let challenger_username = self
                    .negotiations
                    .pop_challenge()
                    .ok_or(ActionError::NoPendingNegotiation)?;
                let status = if accept {
                    ChallengeStatus::Accept
                } else {
                    ChallengeStatus::Reject
                };
                Ok(send(Command::ChallengeReply {
                    challenger_username,
                    status,
                }))
            }
            Action::PlaceShip { coord } => {
                let (row, col) = coord::decode(&coord)?;
                self.editable_fleet()?.fleet_mut().place_next(row, col)?;
                Ok(Vec::new())
            }
            Action::ToggleOrientation => {
                self.editable_fleet()?.fleet_mut().toggle_orientation();
                Ok(Vec::new())
            }
            Action::RotateShip { index } => {
                self.editable_fleet()?.fleet_mut().rotate(index)?;
                Ok(Vec::new())
            }
            Action::ResetFleet => {
                self.editable_fleet()?.fleet_mut().reset();
                Ok(Vec::new())
            }
            Action::AutoPlace => {
                let game = self.game.as_mut().ok_or(ActionError::NotInGame)?;
                check_editable(game)?;
                game.fleet_mut().auto_place(&mut self.rng)?;
                Ok(Vec::new())
            }
            Action::ConfirmShips => {
                self.require_login()?;
                let game = self.editable_fleet()?;
                if !game.fleet().is_complete() {
                    return Err(ActionError::FleetIncomplete);
                }
                let ships = game.submit_placement()?;
                Ok(send(Command::PlaceShips { ships }))
            }
            Action::Fire { coord } => {
                self.require_login()?;
                let game = self.game.as_ref().ok_or(ActionError::NotInGame)?;
                if game.phase() != Phase::Playing {
                    return Err(ActionError::WrongPhase(game.phase()));
                }
                if !game.your_turn() {
                    return Err(ActionError::NotYourTurn);
                }
                let (row, col) = coord::decode(&coord)?;
                Ok(send(Command::Move {
                    coord: coord::encode(row, col)?,
                }))
            }
            Action::Chat { message } => {
                self.require_login()?;
                self.game.as_ref().ok_or(ActionError::NotInGame)?;
                let message = non_empty(message, "message")?;
                Ok(send(Command::Chat { message }))
            }
            Action::Surrender => {
                self.require_login()?;
                self.game.as_ref().ok_or(ActionError::NotInGame)?;
                Ok(send(Command::Surrender {}))
            }
            Action::OfferDraw => {
                self.require_login()?;
                let game = self.game.as_ref().ok_or(ActionError::NotInGame)?;
                if game.phase() != Phase::Playing {
                    return Err(ActionError::WrongPhase(game.phase()));
                }
                self.negotiations.set_awaiting_draw_reply(true);
                Ok(send(Command::DrawOffer {}))
            }
            Action::AnswerDraw { accept } => {
                self.require_login()?;
                self.negotiations
                    .take_draw_offer()
                    .ok_or(ActionError::NoPendingNegotiation)?;
                let status = if accept {
                    DrawStatus::Accept
                } else {
                    DrawStatus::Reject
                };
                Ok(send(Command::DrawReply { status }))
            }
            Action::StartMatching => {
                self.require_lobby()?;
                self.negotiations.start_search();
                Ok(send(Command::StartMatching {}))
            }
            Action::CancelMatching => {
                self.require_login()?;
                self.negotiations.clear_matchmaking();
                Ok(send(Command::CancelMatching {}))
            }
            Action::MatchReady => {
                self.require_login()?;
                if !self.negotiations.mark_self_ready() {
                    return Err(ActionError::NoPendingNegotiation);
                }
                Ok(send(Command::MatchReady {}))
            }
            Action::MatchDecline => {
                self.require_login()?;
                if self.negotiations.match_offer().is_none() {
                    return Err(ActionError::NoPendingNegotiation);
                }
                self.negotiations.clear_matchmaking();
                Ok(send(Command::MatchDecline {}))
            }
            Action::Reconnect => {
                self.require_link()?;
                let session_token = self
                    .identity
                    .as_ref()
                    .and_then(|identity| identity.session_token.clone())
                    .ok_or(ActionError::MissingSessionToken)?;
                Ok(send(Command::Reconnect { session_token }))
            }
            Action::DismissNotice => {
                self.notices.pop_front();
                Ok(Vec::new())
            }
        }
    }

    fn require_link(&self) -> Result<(), ActionError> {
        if self.bridge_live {
            Ok(())
        } else {
            Err(ActionError::NotConnected)
        }
    }

    fn require_login(&self) -> Result<(), ActionError> {
        self.require_link()?;
        if self.authenticated {
            Ok(())
        } else {
            Err(ActionError::NotLoggedIn)
        }
    }

    fn require_lobby(&self) -> Result<(), ActionError> {
        self.require_login()?;
        if self.game.is_some() {
            return Err(ActionError::AlreadyInGame);
        }
        Ok(())
    }

    fn editable_fleet(&mut self) -> Result<&mut GameState, ActionError> {
        let game = self.game.as_mut().ok_or(ActionError::NotInGame)?;
        check_editable(game)?;
        Ok(game)
    }
}

fn check_editable(game: &GameState) -> Result<(), ActionError> {
    if game.phase() != Phase::Placing {
        return Err(ActionError::WrongPhase(game.phase()));
    }
    if game.placement_submitted() {
        return Err(ActionError::PlacementSubmitted);
    }
    Ok(())
}

fn send(command: Command) -> Vec<Effect> {
    vec![Effect::Send(command)]
}

fn non_empty(value: String, field: &'static str) -> Result<String, ActionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ActionError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

fn ignored(cmd: &str) -> Vec<Effect> {
    warn!("[Session] {} outside of its context, ignored", cmd);
    Vec::new()
}
