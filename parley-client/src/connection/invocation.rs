use crate::error::ClientError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;

pub(crate) type Waiter = oneshot::Sender<Result<Value, ClientError>>;

/// Identity of an invocation for deduplication: the method plus the
/// canonical JSON of its arguments. `serde_json` keeps object keys sorted,
/// so equal argument values always render the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InvokeKey {
    pub method: String,
    pub fingerprint: String,
}

impl InvokeKey {
    pub fn new(method: &str, args: &[Value]) -> Self {
        Self {
            method: method.to_string(),
            fingerprint: Value::Array(args.to_vec()).to_string(),
        }
    }
}

impl fmt::Display for InvokeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.method, self.fingerprint)
    }
}

/// Callers waiting on an invocation that has not been sent yet.
#[derive(Default)]
pub(crate) struct PendingInvocations {
    waiting: HashMap<InvokeKey, Vec<Waiter>>,
}

impl PendingInvocations {
    /// Adds a waiter; `true` if it is the first one for `key`.
    pub fn enlist(&mut self, key: InvokeKey, waiter: Waiter) -> bool {
        let waiters = self.waiting.entry(key).or_default();
        waiters.push(waiter);
        waiters.len() == 1
    }

    /// Evicts `key`, returning everyone coalesced onto it.
    pub fn take(&mut self, key: &InvokeKey) -> Vec<Waiter> {
        self.waiting.remove(key).unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.waiting.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.waiting.len()
    }
}
