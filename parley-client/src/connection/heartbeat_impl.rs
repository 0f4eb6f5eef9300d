use crate::connection::{ConnectState, ConnectionInner, ConnectionManager, HeartbeatLoop};
use crate::sync::lock;
use parley_core::HEARTBEAT;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

impl ConnectionManager {
    /// Starts a new heartbeat loop, replacing any running one.
    pub(super) fn start_heartbeat(&self) {
        let id = self.inner.heartbeat_ids.fetch_add(1, Ordering::SeqCst) + 1;
        let period = self.inner.config.heartbeat_interval;
        let weak = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            let in_flight = Arc::new(AtomicBool::new(false));
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(manager) = upgrade(&weak) else {
                    break;
                };
                if in_flight.load(Ordering::SeqCst) {
                    debug!("Heartbeat still in flight, skipping tick");
                    continue;
                }
                if manager.state() == ConnectState::Connecting {
                    debug!("Connection underway, skipping heartbeat");
                    continue;
                }
                in_flight.store(true, Ordering::SeqCst);
                tokio::spawn(manager.beat(id, in_flight.clone()));
            }
        });

        let previous = lock(&self.inner.heartbeat).replace(HeartbeatLoop { id, task });
        if let Some(previous) = previous {
            previous.task.abort();
        }
    }

    /// One beat. If the connection turned out to be down, the loop that
    /// sent it is cancelled and the transport rebuilt, once.
    async fn beat(self, loop_id: u64, in_flight: Arc<AtomicBool>) {
        let (transport, generation) = {
            let slot = lock(&self.inner.slot);
            (slot.transport.clone(), slot.generation)
        };
        let limit = self.inner.config.heartbeat_interval;
        match tokio::time::timeout(limit, transport.send(HEARTBEAT, Vec::new())).await {
            Ok(Ok(_)) => debug!("Heartbeat acknowledged"),
            Ok(Err(e)) => debug!("Heartbeat failed: {}", e),
            Err(_) => {
                // The hub went quiet without closing the socket.
                warn!("Heartbeat unanswered after {:?}, dropping transport", limit);
                transport.close().await;
                self.transition(generation, ConnectState::Disconnected);
            }
        }
        in_flight.store(false, Ordering::SeqCst);

        if self.state() != ConnectState::Disconnected || self.is_disposed() {
            return;
        }

        let stale = {
            let mut heartbeat = lock(&self.inner.heartbeat);
            match heartbeat.as_ref() {
                Some(current) if current.id == loop_id => heartbeat.take(),
                _ => None,
            }
        };
        let Some(stale) = stale else {
            return;
        };
        stale.task.abort();
        self.reconnect().await;
    }

    /// Replaces the transport, re-arms every live subscription on it (their
    /// cached values stay), restarts the heartbeat and connects.
    async fn reconnect(&self) {
        info!("Reconnecting to hub");
        let old = self.replace_transport();
        old.close().await;

        let names = lock(&self.inner.subscriptions).names();
        for name in &names {
            self.arm(name);
        }
        debug!("Re-armed {} subscription(s)", names.len());

        self.start_heartbeat();
        self.connect();
    }
}

fn upgrade(weak: &Weak<ConnectionInner>) -> Option<ConnectionManager> {
    weak.upgrade().map(|inner| ConnectionManager { inner })
}
