use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier of one browser connection, unique for the lifetime of a bridge.
pub type ConnectionId = u64;

/// Lifecycle of a bridged connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Bridged,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub peer: SocketAddr,
    pub state: LinkState,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<ConnectionId, ConnectionInfo>>,
}

/// Live connections of a bridge.
///
/// An entry is inserted and removed only by the task serving that
/// connection, through its [`Registration`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ConnectionId, ConnectionInfo>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate an id for a new browser connection.
    pub fn register(&self, peer: SocketAddr) -> Registration {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.entries().insert(
            id,
            ConnectionInfo {
                peer,
                state: LinkState::Connecting,
            },
        );
        Registration {
            id,
            registry: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionInfo> {
        self.entries().get(&id).cloned()
    }

    /// Number of connections currently in `state`.
    pub fn count_in(&self, state: LinkState) -> usize {
        self.entries().values().filter(|info| info.state == state).count()
    }
}

/// Handle owned by a connection task; unregisters on drop.
#[derive(Debug)]
pub struct Registration {
    id: ConnectionId,
    registry: ConnectionRegistry,
}

impl Registration {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn set_state(&self, state: LinkState) {
        if let Some(info) = self.registry.entries().get_mut(&self.id) {
            info.state = state;
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.entries().remove(&self.id);
    }
}
