use std::collections::HashMap;

use crate::models::{Post, PostVote};

/// Health of the live vote subscription, surfaced to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSyncStatus {
    /// Preconditions not met (no identity or empty feed); nothing is open.
    Inactive,
    /// Subscription open and at least one snapshot applied.
    Live,
    /// Subscription lost; re-subscribe pending with backoff.
    Retrying,
}

/// Everything the renderer needs for the page, published as one value on a
/// watch channel. Owned and mutated exclusively by the controller task.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    /// Insertion order = query completion order, not globally
    /// time-ordered across communities.
    pub posts: Vec<Post>,
    /// Current user's votes, keyed by post id. Scoped to the signed-in
    /// user only; cleared whenever identity or feed contents change.
    pub post_votes: HashMap<String, PostVote>,
    /// True while a feed assembly is outstanding.
    pub loading: bool,
    pub vote_sync: VoteSyncStatus,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            post_votes: HashMap::new(),
            loading: false,
            vote_sync: VoteSyncStatus::Inactive,
        }
    }
}

impl FeedState {
    /// The viewer's vote value on a post, if any.
    pub fn vote_for(&self, post_id: &str) -> Option<i64> {
        self.post_votes.get(post_id).map(|v| v.vote_value)
    }

    pub fn post_ids(&self) -> Vec<String> {
        self.posts.iter().map(|p| p.id.clone()).collect()
    }
}
