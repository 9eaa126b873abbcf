use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::StoreResult;
use crate::query::Query;

/// A stored document: the store-assigned id plus the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Deserialize the payload with the store-assigned id spliced into the
    /// object, mirroring how the store client merges `id` into document data.
    pub fn deserialize<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// The full current result set of a live query at one point in time.
pub type Snapshot = Vec<Document>;

/// Read surface of the remote document store. Write paths (casting votes,
/// creating posts) belong to other collaborators and are not modeled here.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// One-shot read. Reflects the store at call time, nothing more.
    async fn fetch(&self, query: Query) -> StoreResult<Snapshot>;

    /// Live query: the returned subscription yields the current result set
    /// immediately and again after every matching change.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;
}

/// Handle for a live query. Each `recv` yields a full snapshot of the
/// query's current results. Dropping the handle, or calling [`stop`],
/// releases the watcher on the store side; `stop` is idempotent.
///
/// [`stop`]: Subscription::stop
pub struct Subscription {
    changes: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub fn new(changes: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { changes }
    }

    /// Build a subscription plus the sender half that feeds it. Store
    /// implementations push snapshots through the sender; once the
    /// subscription is released the sends start failing and the
    /// implementation can drop its watcher.
    pub fn channel() -> (mpsc::UnboundedSender<Snapshot>, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Subscription::new(rx))
    }

    /// Next snapshot; `None` once the store side closed the stream.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.changes.recv().await
    }

    /// Release the live query. Safe to call more than once.
    pub fn stop(&mut self) {
        self.changes.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
