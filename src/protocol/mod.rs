//! Message catalog shared by the bridge and the session state machine.
//!
//! Game messages use the envelope `{"cmd": <NAME>, "payload": {...}}` in both
//! directions. [`Command`] and [`Event`] are closed sets: anything the server
//! sends outside [`EVENT_NAMES`] is reported, not ignored.

mod command;
mod event;
mod relay;

pub use command::{ChallengeStatus, Command, DrawStatus};
pub use event::{
    EndReason, Event, GameResult, LeaderboardEntry, MatchRecord, PlayerEntry, PlayerStatus,
    ShotResult, EVENT_NAMES, RECONNECT_GRACE_SECS,
};
pub use relay::{RelayEvent, RelayRequest};

use serde_json::Value;

/// A server message that could not be turned into an [`Event`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message has no string `cmd` field")]
    MissingCommand,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("malformed {cmd} payload: {source}")]
    Malformed {
        cmd: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one server message into an [`Event`].
pub fn decode_event(value: Value) -> Result<Event, ProtocolError> {
    let cmd = value
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingCommand)?
        .to_string();
    if !EVENT_NAMES.contains(&cmd.as_str()) {
        return Err(ProtocolError::UnknownCommand(cmd));
    }
    serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { cmd, source })
}
