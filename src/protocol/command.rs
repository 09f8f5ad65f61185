use serde::{Deserialize, Serialize};

use crate::ship::ShipPlacement;

/// Answer to a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChallengeStatus {
    Accept,
    Reject,
}

/// Answer to a draw offer. Lowercase on the wire, unlike challenge replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawStatus {
    Accept,
    Reject,
}

/// Commands sent from the client to the authoritative server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Log in. A resumed session sends the username alone.
    Login {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },
    Register {
        username: String,
        password: String,
    },
    Logout {},
    PlayerList {},
    Leaderboard {},
    MatchHistory {},
    Challenge {
        target_username: String,
    },
    ChallengeReply {
        challenger_username: String,
        status: ChallengeStatus,
    },
    PlaceShips {
        ships: Vec<ShipPlacement>,
    },
    /// Fire at a cell encoded like `A5`.
    Move {
        coord: String,
    },
    Chat {
        message: String,
    },
    Surrender {},
    DrawOffer {},
    DrawReply {
        status: DrawStatus,
    },
    StartMatching {},
    CancelMatching {},
    MatchReady {},
    MatchDecline {},
    /// Restore a dropped session from its token.
    Reconnect {
        session_token: String,
    },
}
