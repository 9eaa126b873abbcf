use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreResult;
use crate::query::{Direction, Query};
use crate::store::{Document, DocumentStore, Snapshot, Subscription};

/// In-process document store with live-query notification. Backs tests and
/// local development; production deployments reach the managed store
/// through another implementation of [`DocumentStore`].
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Document>>,
    watchers: Mutex<Vec<Watcher>>,
    next_id: AtomicU64,
}

struct Watcher {
    query: Query,
    tx: tokio::sync::mpsc::UnboundedSender<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with a store-assigned id.
    pub fn insert(&self, collection: &str, data: Value) -> Document {
        let id = format!("doc-{}", self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        self.insert_with_id(collection, id, data)
    }

    pub fn insert_with_id(
        &self,
        collection: &str,
        id: impl Into<String>,
        data: Value,
    ) -> Document {
        let doc = Document::new(id, data);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        self.notify(collection);
        doc
    }

    /// Replace a document's payload; true when the id existed.
    pub fn update(&self, collection: &str, id: &str, data: Value) -> bool {
        let updated = {
            match self.collections.get_mut(collection) {
                Some(mut docs) => match docs.iter_mut().find(|d| d.id == id) {
                    Some(doc) => {
                        doc.data = data;
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };
        if updated {
            self.notify(collection);
        }
        updated
    }

    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let removed = {
            match self.collections.get_mut(collection) {
                Some(mut docs) => {
                    let before = docs.len();
                    docs.retain(|d| d.id != id);
                    docs.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(collection);
        }
        removed
    }

    /// Live watchers currently registered. Released subscriptions are
    /// pruned on the next notification for their collection.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().expect("watcher registry poisoned").len()
    }

    fn evaluate(&self, query: &Query) -> Snapshot {
        let mut docs: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|doc| query.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            // stable sort: ties keep insertion order
            docs.sort_by(|a, b| {
                let ord = compare_fields(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        docs
    }

    fn notify(&self, collection: &str) {
        let mut watchers = self.watchers.lock().expect("watcher registry poisoned");
        watchers.retain(|w| {
            if w.query.collection != collection {
                return true;
            }
            let snapshot = self.evaluate(&w.query);
            w.tx.send(snapshot).is_ok()
        });
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, query: Query) -> StoreResult<Snapshot> {
        Ok(self.evaluate(&query))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        let (tx, sub) = Subscription::channel();
        // live queries fire immediately with the current result set
        let _ = tx.send(self.evaluate(&query));
        debug!(collection = %query.collection, "registered live query");
        self.watchers
            .lock()
            .expect("watcher registry poisoned")
            .push(Watcher { query, tx });
        Ok(sub)
    }
}
