use crate::connection::invocation::InvokeKey;
use crate::connection::{ConnectState, ConnectionManager};
use crate::error::ClientError;
use crate::sync::lock;
use serde_json::Value;
use std::sync::atomic::Ordering;
use tokio::sync::oneshot;
use tracing::debug;

impl ConnectionManager {
    /// Invokes a hub method once the connection is up.
    ///
    /// Calls with the same method and equal arguments that overlap while the
    /// first one is still waiting to be sent are coalesced: the hub sees one
    /// invocation and every caller gets its outcome.
    pub async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }

        let key = InvokeKey::new(method, &args);
        let (tx, rx) = oneshot::channel();
        let first = lock(&self.inner.pending).enlist(key.clone(), tx);

        if first {
            let this = self.clone();
            tokio::spawn(async move { this.dispatch(key, args).await });
        } else {
            debug!("Coalescing invocation {}", key);
            self.connect();
        }

        rx.await.unwrap_or(Err(ClientError::Disposed))
    }

    /// Waits for `Connected`, evicts `key` and performs the single send.
    async fn dispatch(self, key: InvokeKey, args: Vec<Value>) {
        let mut states = self.connect();
        let inner = self.inner.clone();
        let ready = async move {
            states
                .wait_for(|state| {
                    *state == ConnectState::Connected || inner.disposed.load(Ordering::SeqCst)
                })
                .await
                .is_ok()
        };
        let connected = match self.inner.config.invoke_timeout {
            Some(limit) => tokio::time::timeout(limit, ready).await.unwrap_or(false),
            None => ready.await,
        };

        let waiters = lock(&self.inner.pending).take(&key);
        if self.is_disposed() {
            for waiter in waiters {
                let _ = waiter.send(Err(ClientError::Disposed));
            }
            return;
        }
        if !connected {
            debug!("Invocation {} gave up waiting for a connection", key);
            for waiter in waiters {
                let _ = waiter.send(Err(ClientError::Timeout(key.method.clone())));
            }
            return;
        }

        debug!("Sending invocation {} for {} caller(s)", key, waiters.len());
        let outcome = self
            .inner
            .transport()
            .send(&key.method, args)
            .await
            .map_err(ClientError::from);
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
