use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::warn;
use uuid::Uuid;

use doc_store::{DocumentStore, Query, Snapshot, Subscription};

use crate::config::VoteSyncConfig;
use crate::error::Result;
use crate::models::PostVote;

/// Collection path holding one user's vote records.
fn votes_collection(user: &Uuid) -> String {
    format!("users/{user}/postVotes")
}

/// Opens and interprets the live vote query for the current feed and
/// user. Subscription lifecycle (teardown, retry, mapping reset) is
/// driven by the controller.
#[derive(Clone)]
pub struct VoteSynchronizer {
    store: Arc<dyn DocumentStore>,
}

impl VoteSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// One live query, scoped to the user's own vote collection and
    /// filtered to the feed's post ids. Callers must hold a non-empty id
    /// list and a present identity; with either missing the synchronizer
    /// stays inert and this is never called.
    pub async fn open(&self, user: &Uuid, post_ids: &[String]) -> Result<Subscription> {
        let query = Query::collection(votes_collection(user))
            .where_in("postId", post_ids.iter().map(String::as_str));
        Ok(self.store.subscribe(query).await?)
    }

    /// Turn a snapshot into the post-id keyed vote mapping. Full replace
    /// semantics: the caller swaps the whole mapping, never patches it.
    /// Documents that fail to decode are skipped, not fatal.
    pub fn votes_from_snapshot(snapshot: Snapshot) -> HashMap<String, PostVote> {
        let mut votes = HashMap::with_capacity(snapshot.len());
        for doc in snapshot {
            match doc.deserialize::<PostVote>() {
                Ok(vote) => {
                    votes.insert(vote.post_id.clone(), vote);
                }
                Err(error) => {
                    warn!(doc_id = %doc.id, %error, "skipping undecodable vote record");
                }
            }
        }
        votes
    }
}

/// Capped exponential backoff with up to 25% jitter. `attempt` counts
/// from 1 for the first retry.
pub(crate) fn backoff_delay(config: &VoteSyncConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let base_ms = (config.initial_backoff.as_millis() as u64).saturating_mul(1u64 << exponent);
    let capped_ms = base_ms.min(config.max_backoff.as_millis() as u64);
    let jitter_ms = rand::thread_rng().gen_range(0..=capped_ms / 4);
    Duration::from_millis(capped_ms + jitter_ms)
}
