mod bitboard;
pub mod board;
pub mod bridge;
pub mod client_node;
mod common;
mod config;
pub mod coord;
pub mod fleet;
pub mod frame;
mod logging;
pub mod protocol;
pub mod session;
mod ship;
pub mod store;
pub mod terminal;
pub mod transport;

pub use bitboard::{BitBoard, BitBoardError};
pub use board::*;
pub use bridge::{Bridge, CloseReason, ConnectionRegistry, LinkState, ShutdownHandle};
pub use client_node::{ClientError, ClientNode};
pub use common::*;
pub use config::*;
pub use fleet::FleetBuilder;
pub use frame::{encode_frame, FrameDecoder, FrameError};
pub use logging::init_logging;
pub use protocol::*;
pub use session::{Action, ActionError, Effect, SessionMachine, Stage};
pub use ship::*;
pub use store::{FileStore, Identity, MemoryStore, SessionStore, StoreError};
pub use transport::{InMemoryTransport, Transport, WsTransport};
