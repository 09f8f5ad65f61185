use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::yield_now;

use crate::protocol::{RelayEvent, RelayRequest};
use crate::transport::Transport;

/// One end of an in-process link, sending `S` and receiving `R`.
pub struct InMemoryTransport<S = RelayRequest, R = RelayEvent> {
    recv_queue: Arc<Mutex<VecDeque<R>>>,
    send_queue: Arc<Mutex<VecDeque<S>>>,
}

/// The bridge-side end of [`InMemoryTransport::pair`].
pub type BridgeEnd = InMemoryTransport<RelayEvent, RelayRequest>;

impl InMemoryTransport {
    /// A client end and the matching bridge end.
    pub fn pair() -> (Self, BridgeEnd) {
        let requests = Arc::new(Mutex::new(VecDeque::new()));
        let events = Arc::new(Mutex::new(VecDeque::new()));
        (
            InMemoryTransport {
                recv_queue: events.clone(),
                send_queue: requests.clone(),
            },
            InMemoryTransport {
                recv_queue: requests,
                send_queue: events,
            },
        )
    }
}

impl<S, R> InMemoryTransport<S, R> {
    pub fn push(&self, msg: S) {
        self.send_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(msg);
    }

    /// Everything received so far, without waiting.
    pub fn drain(&self) -> Vec<R> {
        self.recv_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Wait for the next message; `None` once the other end is dropped and
    /// the queue is empty.
    pub async fn next(&self) -> Option<R> {
        loop {
            if let Some(msg) = self
                .recv_queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
            {
                return Some(msg);
            }
            if Arc::strong_count(&self.recv_queue) == 1 {
                return None;
            }
            yield_now().await;
        }
    }
}

#[async_trait::async_trait]
impl Transport for InMemoryTransport {
    async fn send(&mut self, msg: RelayRequest) -> anyhow::Result<()> {
        if Arc::strong_count(&self.send_queue) == 1 {
            anyhow::bail!("in-memory link closed");
        }
        self.push(msg);
        Ok(())
    }

    async fn recv(&mut self) -> anyhow::Result<Option<RelayEvent>> {
        Ok(self.next().await)
    }
}
