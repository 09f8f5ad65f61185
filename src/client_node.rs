use log::{debug, error, warn};

use crate::protocol::{RelayEvent, RelayRequest};
use crate::session::{Action, ActionError, Effect, Notice, SessionMachine};
use crate::store::SessionStore;
use crate::transport::Transport;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Link(#[from] anyhow::Error),
}

/// Runs a [`SessionMachine`] against a bridge link and a store.
pub struct ClientNode<S: SessionStore> {
    machine: SessionMachine,
    store: S,
    transport: Box<dyn Transport>,
    fresh: Vec<Notice>,
}

impl<S: SessionStore> ClientNode<S> {
    /// Build a node, restoring the identity kept in `store`.
    pub fn new(store: S, transport: Box<dyn Transport>) -> Self {
        let identity = match store.identity() {
            Ok(identity) => identity,
            Err(e) => {
                warn!("[ClientNode] ignoring stored identity: {}", e);
                None
            }
        };
        Self::with_machine(SessionMachine::new(identity), store, transport)
    }

    pub fn with_machine(machine: SessionMachine, store: S, transport: Box<dyn Transport>) -> Self {
        Self {
            machine,
            store,
            transport,
            fresh: Vec::new(),
        }
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.fresh)
    }

    /// Wait for the next bridge notification; `None` once the link is gone.
    pub async fn next_event(&mut self) -> anyhow::Result<Option<RelayEvent>> {
        self.transport.recv().await
    }

    pub async fn handle(&mut self, event: RelayEvent) -> anyhow::Result<()> {
        let effects = self.machine.handle_relay(event);
        self.apply(effects).await
    }

    pub async fn perform(&mut self, action: Action) -> Result<(), ClientError> {
        let effects = self.machine.perform(action)?;
        self.apply(effects).await?;
        Ok(())
    }

    /// Tell the machine the link ended without a terminal notification.
    pub async fn link_closed(&mut self) -> anyhow::Result<()> {
        let effects = self.machine.handle_link_closed();
        self.apply(effects).await
    }

    /// Swap in a freshly opened link after the previous one ended.
    pub fn replace_transport(&mut self, transport: Box<dyn Transport>) {
        self.transport = transport;
    }

    /// Process notifications until the bridge link ends.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        while let Some(event) = self.next_event().await? {
            self.handle(event).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, effects: Vec<Effect>) -> anyhow::Result<()> {
        for effect in effects {
            match effect {
                Effect::Send(command) => {
                    debug!("[ClientNode] sending {:?}", command);
                    self.transport.send(RelayRequest::command(&command)?).await?;
                }
                Effect::Notify(notice) => self.fresh.push(notice),
                Effect::SaveIdentity(identity) => {
                    if let Err(e) = self.store.save_identity(&identity) {
                        error!("[ClientNode] could not save identity: {}", e);
                    }
                }
                Effect::ClearIdentity => {
                    if let Err(e) = self.store.clear_identity() {
                        error!("[ClientNode] could not clear identity: {}", e);
                    }
                }
                Effect::SetInGame(in_game) => {
                    if let Err(e) = self.store.set_in_game(in_game) {
                        error!("[ClientNode] could not update in-game marker: {}", e);
                    }
                }
            }
        }
        Ok(())
    }
}
