use serde::{Deserialize, Deserializer, Serialize};

use super::ChallengeStatus;

/// Outcome reported for a single shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotResult {
    Hit,
    Miss,
    AlreadyHit,
}

/// Final result of a game from the receiving player's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GameResult {
    Win,
    Lose,
    Draw,
}

/// Why a game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndReason {
    AllShipsSunk,
    Surrender,
    DrawAccepted,
    /// The opponent left mid-game.
    OpponentDisconnected,
    /// The opponent left before both fleets were placed.
    SetupAbandoned,
    /// The opponent did not come back within the server's grace window.
    OpponentTimeout,
    Other(String),
}

impl EndReason {
    pub fn code(&self) -> &str {
        match self {
            EndReason::AllShipsSunk => "ALL_SHIPS_SUNK",
            EndReason::Surrender => "SURRENDER",
            EndReason::DrawAccepted => "DRAW_ACCEPTED",
            EndReason::OpponentDisconnected => "OPPONENT_LOGOUT_GAME",
            EndReason::SetupAbandoned => "OPPONENT_LOGOUT_SETUP",
            EndReason::OpponentTimeout => "OPPONENT_TIMEOUT",
            EndReason::Other(code) => code,
        }
    }

    /// Sentence shown to the player.
    pub fn describe(&self) -> String {
        match self {
            EndReason::AllShipsSunk => "All ships of the losing fleet were sunk".to_string(),
            EndReason::Surrender => "A player surrendered".to_string(),
            EndReason::DrawAccepted => "Both players agreed to a draw".to_string(),
            EndReason::OpponentDisconnected => "Your opponent left the game".to_string(),
            EndReason::SetupAbandoned => "Your opponent left during ship placement".to_string(),
            EndReason::OpponentTimeout => format!(
                "Your opponent did not reconnect within {} seconds",
                RECONNECT_GRACE_SECS
            ),
            EndReason::Other(code) => code.clone(),
        }
    }
}

/// Grace window the server gives a dropped player before forfeiting the game.
pub const RECONNECT_GRACE_SECS: u64 = 60;

impl From<String> for EndReason {
    fn from(code: String) -> Self {
        match code.as_str() {
            "ALL_SHIPS_SUNK" => EndReason::AllShipsSunk,
            "SURRENDER" => EndReason::Surrender,
            "DRAW_ACCEPTED" => EndReason::DrawAccepted,
            "OPPONENT_LOGOUT_GAME" => EndReason::OpponentDisconnected,
            "OPPONENT_LOGOUT_SETUP" => EndReason::SetupAbandoned,
            "OPPONENT_TIMEOUT" => EndReason::OpponentTimeout,
            _ => EndReason::Other(code),
        }
    }
}

impl From<EndReason> for String {
    fn from(reason: EndReason) -> Self {
        reason.code().to_string()
    }
}

/// Lobby status of a listed player; the server sends a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlayerStatus {
    Code(i64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub username: String,
    pub elo: i32,
    pub status: PlayerStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub elo: i32,
    pub games: u32,
    pub wins: u32,
    pub winrate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub opponent: String,
    pub result: GameResult,
    pub timestamp: i64,
}

/// Events sent by the authoritative server. Unknown payload fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    LoginSuccess {
        username: String,
        elo: i32,
        #[serde(rename = "sessionToken", default, skip_serializing_if = "Option::is_none")]
        session_token: Option<String>,
    },
    RegisterSuccess {},
    GameStart {
        opponent: String,
        #[serde(deserialize_with = "flag")]
        your_turn: bool,
    },
    GameReady {},
    MoveResult {
        coord: String,
        result: ShotResult,
        #[serde(default, deserialize_with = "non_empty", skip_serializing_if = "Option::is_none")]
        ship_sunk: Option<String>,
        #[serde(default, deserialize_with = "opt_flag", skip_serializing_if = "Option::is_none")]
        is_your_shot: Option<bool>,
    },
    TurnChange {
        #[serde(deserialize_with = "flag")]
        your_turn: bool,
    },
    GameEnd {
        result: GameResult,
        reason: EndReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        elo: Option<i32>,
    },
    Challenge {
        challenger: String,
    },
    SystemMsg {
        code: u16,
        message: String,
    },
    DrawOffer {
        from: String,
    },
    DrawRejected {},
    MatchingStarted {},
    MatchFound {
        opponent: String,
        elo: i32,
    },
    OpponentReady {},
    WaitingOpponent {},
    MatchDeclined {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    MatchingCancelled {},
    LogoutSuccess {},
    PlayerList {
        players: Vec<PlayerEntry>,
    },
    Leaderboard {
        players: Vec<LeaderboardEntry>,
    },
    MatchHistory {
        matches: Vec<MatchRecord>,
    },
    Chat {
        from: String,
        message: String,
    },
    OpponentDisconnected {
        opponent: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<u64>,
    },
    OpponentReconnected {
        opponent: String,
    },
    ReconnectSuccess {
        username: String,
        elo: i32,
        /// `ONLINE` or `IN_GAME`.
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opponent: Option<String>,
        #[serde(default, deserialize_with = "opt_flag", skip_serializing_if = "Option::is_none")]
        your_turn: Option<bool>,
        /// `placing_ships` or `playing`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<String>,
        /// Own grid, row-major cell codes: 0 empty, 1 ship, 2 hit, 3 miss.
        /// Only sent once play has started.
        #[serde(rename = "myBoard", default, skip_serializing_if = "Option::is_none")]
        my_board: Option<Vec<Vec<u8>>>,
    },
    ReconnectFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Greeting sent on every new connection.
    Welcome {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The answer to a challenge we sent.
    ChallengeReply {
        #[serde(alias = "target_username", default, skip_serializing_if = "Option::is_none")]
        player: Option<String>,
        status: ChallengeStatus,
    },
    /// The server accepted our fleet.
    PlaceShipAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Every `cmd` name the catalog understands.
pub const EVENT_NAMES: &[&str] = &[
    "LOGIN_SUCCESS",
    "REGISTER_SUCCESS",
    "GAME_START",
    "GAME_READY",
    "MOVE_RESULT",
    "TURN_CHANGE",
    "GAME_END",
    "CHALLENGE",
    "SYSTEM_MSG",
    "DRAW_OFFER",
    "DRAW_REJECTED",
    "MATCHING_STARTED",
    "MATCH_FOUND",
    "OPPONENT_READY",
    "WAITING_OPPONENT",
    "MATCH_DECLINED",
    "MATCHING_CANCELLED",
    "LOGOUT_SUCCESS",
    "PLAYER_LIST",
    "LEADERBOARD",
    "MATCH_HISTORY",
    "CHAT",
    "OPPONENT_DISCONNECTED",
    "OPPONENT_RECONNECTED",
    "RECONNECT_SUCCESS",
    "RECONNECT_FAILED",
    "WELCOME",
    "CHALLENGE_REPLY",
    "PLACE_SHIP_ACK",
    "ERROR",
];

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl From<Flag> for bool {
    fn from(flag: Flag) -> Self {
        match flag {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }
    }
}

// The server writes some booleans as 0/1.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Flag::deserialize(deserializer).map(bool::from)
}

fn opt_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Flag>::deserialize(deserializer)?.map(bool::from))
}

// `ship_sunk` is always present and empty when nothing sank.
fn non_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}
