use crate::connection::{ConnectState, ConnectionManager, TransportSlot};
use crate::sync::lock;
use crate::transport::Transport;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::watch;
use tracing::{info, warn};

impl ConnectionManager {
    /// Opens the transport unless a session is already up or underway.
    /// Returns the state stream either way.
    pub fn connect(&self) -> watch::Receiver<ConnectState> {
        let states = self.inner.state.subscribe();
        if self.is_disposed() {
            return states;
        }

        let started = self.inner.state.send_if_modified(|state| {
            if *state == ConnectState::Disconnected {
                *state = ConnectState::Connecting;
                true
            } else {
                false
            }
        });
        if !started {
            return states;
        }
        info!("Connection state: {:?}", ConnectState::Connecting);

        let (transport, generation) = {
            let slot = lock(&self.inner.slot);
            (slot.transport.clone(), slot.generation)
        };
        let this = self.clone();
        tokio::spawn(async move {
            match transport.open().await {
                Ok(()) => this.transition(generation, ConnectState::Connected),
                Err(e) => {
                    warn!("Connect attempt failed: {}", e);
                    this.transition(generation, ConnectState::Disconnected);
                }
            }
        });

        states
    }

    /// Marks the connection `Disconnected` and closes the transport.
    pub async fn disconnect(&self) {
        self.set_state(ConnectState::Disconnected);
        self.inner.transport().close().await;
    }

    /// Stops the heartbeat, closes the transport and drops every listener
    /// and pending invocation. The manager is unusable afterwards.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Disposing connection manager");

        if let Some(heartbeat) = lock(&self.inner.heartbeat).take() {
            heartbeat.task.abort();
        }
        lock(&self.inner.subscriptions).clear();
        lock(&self.inner.pending).clear();
        // Always notifies, which wakes dispatchers parked on the state.
        self.inner.state.send_replace(ConnectState::Disconnected);

        self.inner.transport().close().await;
    }

    /// Applies a state reached by the transport of `generation`; outcomes
    /// from replaced transports are ignored.
    pub(super) fn transition(&self, generation: u64, state: ConnectState) {
        if self.is_disposed() || generation != self.inner.generation() {
            return;
        }
        self.set_state(state);
    }

    pub(super) fn set_state(&self, state: ConnectState) {
        let previous = self.inner.state.send_replace(state);
        if previous != state {
            info!("Connection state: {:?}", state);
        }
    }

    /// Subscribes to `transport`'s close notification.
    pub(super) fn watch_close(&self, transport: &Arc<dyn Transport>, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        transport.on_close(Arc::new(move |reason| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = ConnectionManager { inner };
            if generation != manager.inner.generation() {
                return;
            }
            match reason {
                Some(e) => warn!("Transport closed: {}", e),
                None => info!("Transport closed"),
            }
            manager.set_state(ConnectState::Disconnected);
        }));
    }

    /// Installs a fresh transport from the factory and returns the old one.
    pub(super) fn replace_transport(&self) -> Arc<dyn Transport> {
        let transport = self.inner.factory.create();
        let (old, generation) = {
            let mut slot = lock(&self.inner.slot);
            let generation = slot.generation + 1;
            let old = std::mem::replace(
                &mut *slot,
                TransportSlot {
                    transport: transport.clone(),
                    generation,
                },
            );
            (old.transport, generation)
        };
        self.watch_close(&transport, generation);
        old
    }
}
