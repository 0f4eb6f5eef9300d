use crate::connection::ConnectionInner;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::mpsc;
use tracing::debug;

pub(crate) type ListenerId = u64;

type Delivery = (String, Vec<Value>);
type Listener = (ListenerId, mpsc::UnboundedSender<Delivery>);

#[derive(Default)]
struct Topic {
    last: Option<Vec<Value>>,
    listeners: Vec<Listener>,
}

/// Event name → ordered listeners plus the last value seen, which is
/// replayed to every new listener.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    topics: HashMap<String, Topic>,
    next_id: ListenerId,
}

pub(crate) struct Added {
    pub id: ListenerId,
    pub rx: mpsc::UnboundedReceiver<Delivery>,
    /// Names that had no listeners before this one.
    pub first: Vec<String>,
}

impl SubscriptionRegistry {
    /// Registers one listener on every name in `names`. All of them feed the
    /// same channel, so events keep their arrival order across names.
    pub fn add(&mut self, names: &[&str]) -> Added {
        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut first = Vec::new();
        for name in names {
            let topic = self.topics.entry(name.to_string()).or_default();
            if let Some(last) = &topic.last {
                let _ = tx.send((name.to_string(), last.clone()));
            }
            if topic.listeners.is_empty() {
                first.push(name.to_string());
            }
            topic.listeners.push((id, tx.clone()));
        }

        Added { id, rx, first }
    }

    /// Removes one listener from `name` and returns how many remain.
    pub fn remove(&mut self, name: &str, id: ListenerId) -> usize {
        let Some(topic) = self.topics.get_mut(name) else {
            return 0;
        };
        topic.listeners.retain(|(lid, _)| *lid != id);
        topic.listeners.len()
    }

    /// Caches `args` and hands them to every live listener in order.
    /// Returns the number of listeners reached.
    pub fn publish(&mut self, name: &str, args: Vec<Value>) -> usize {
        let Some(topic) = self.topics.get_mut(name) else {
            debug!("Event `{}` arrived with no subscription", name);
            return 0;
        };
        topic.listeners.retain(|(_, tx)| !tx.is_closed());
        for (_, tx) in &topic.listeners {
            let _ = tx.send((name.to_string(), args.clone()));
        }
        topic.last = Some(args);
        topic.listeners.len()
    }

    /// Forgets the topic if nobody listens any more. Returns the number of
    /// listeners still attached (zero means it was removed).
    pub fn disarm(&mut self, name: &str) -> usize {
        let remaining = self
            .topics
            .get(name)
            .map(|topic| topic.listeners.iter().filter(|(_, tx)| !tx.is_closed()).count())
            .unwrap_or(0);
        if remaining == 0 {
            self.topics.remove(name);
        }
        remaining
    }

    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.topics.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }
}

/// A live listener on one or more hub events. Yields cached last values
/// first, then every later event in arrival order. Dropping it
/// unsubscribes; dropping the last listener of an event disarms it on the
/// transport.
pub struct Subscription {
    names: Vec<String>,
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<Delivery>,
    manager: Weak<ConnectionInner>,
}

impl Subscription {
    pub(crate) fn new(
        names: Vec<String>,
        id: ListenerId,
        rx: mpsc::UnboundedReceiver<Delivery>,
        manager: Weak<ConnectionInner>,
    ) -> Self {
        Self {
            names,
            id,
            rx,
            manager,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Arguments of the next event; `None` once the manager is disposed.
    pub async fn recv(&mut self) -> Option<Vec<Value>> {
        self.rx.recv().await.map(|(_, args)| args)
    }

    /// Next event together with its name.
    pub async fn recv_event(&mut self) -> Option<(String, Vec<Value>)> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Vec<Value>> {
        self.rx.try_recv().ok().map(|(_, args)| args)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.manager.upgrade() {
            for name in &self.names {
                inner.release(name, self.id);
            }
        }
    }
}
