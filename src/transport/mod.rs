//! How a client reaches the bridge.

use crate::protocol::{RelayEvent, RelayRequest};

#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: RelayRequest) -> anyhow::Result<()>;

    /// Next notification from the bridge, or `Ok(None)` once the link is gone.
    async fn recv(&mut self) -> anyhow::Result<Option<RelayEvent>>;
}

pub mod in_memory;
pub mod ws;

pub use in_memory::InMemoryTransport;
pub use ws::WsTransport;
