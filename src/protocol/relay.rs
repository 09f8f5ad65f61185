//! Envelope spoken between a browser client and the bridge.
//!
//! Every WebSocket text frame carries `{"event": <name>, "data": <value>}`.
//! Game traffic rides inside `client-message` / `server-message` untouched;
//! the remaining events describe the state of the outbound link.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Command;

/// Browser → bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayRequest {
    /// A wire envelope to forward to the game server as-is.
    ClientMessage(Value),
}

impl RelayRequest {
    pub fn command(command: &Command) -> Result<Self, serde_json::Error> {
        Ok(RelayRequest::ClientMessage(serde_json::to_value(command)?))
    }
}

/// Bridge → browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum RelayEvent {
    /// The outbound link to the game server is up.
    ServerConnected { message: String },
    /// One message received from the game server.
    ServerMessage(Value),
    /// The outbound link failed: unreachable, broken, idle or overloaded.
    ServerError { error: String },
    /// The game server closed the outbound link.
    ServerDisconnected { message: String },
    /// A browser request could not be handled.
    Error { message: String },
}

impl RelayEvent {
    pub fn connected() -> Self {
        RelayEvent::ServerConnected {
            message: "Connected to game server".to_string(),
        }
    }

    pub fn disconnected() -> Self {
        RelayEvent::ServerDisconnected {
            message: "Disconnected from game server".to_string(),
        }
    }

    /// True for the notifications that end a bridged connection.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayEvent::ServerError { .. } | RelayEvent::ServerDisconnected { .. }
        )
    }
}
