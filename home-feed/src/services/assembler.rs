use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use doc_store::{DocumentStore, Query};

use crate::config::FeedConfig;
use crate::error::Result;
use crate::models::{CommunitySnippet, Post};

pub const POSTS_COLLECTION: &str = "posts";

/// Assembles the viewer's home feed out of bounded store reads. Pure
/// read-side logic; committing results to page state is the controller's
/// job.
#[derive(Clone)]
pub struct FeedAssembler {
    store: Arc<dyn DocumentStore>,
    config: FeedConfig,
}

impl FeedAssembler {
    pub fn new(store: Arc<dyn DocumentStore>, config: FeedConfig) -> Self {
        Self { store, config }
    }

    /// Posts for a subscribed viewer: one bounded read per followed
    /// community, capped at the first `max_home_communities` snippets,
    /// all issued concurrently. All-or-nothing join: any failed read
    /// fails the whole assembly. Results concatenate in snippet order;
    /// store-returned order is preserved within each community's batch.
    pub async fn home_posts(&self, snippets: &[CommunitySnippet]) -> Result<Vec<Post>> {
        let community_ids: Vec<&str> = snippets
            .iter()
            .take(self.config.max_home_communities)
            .map(|s| s.community_id.as_str())
            .collect();

        let reads = community_ids.iter().map(|community_id| {
            self.store.fetch(
                Query::collection(POSTS_COLLECTION)
                    .where_eq("communityId", *community_id)
                    .limit(self.config.posts_per_community),
            )
        });
        let batches = try_join_all(reads).await?;

        let mut posts = Vec::new();
        for batch in batches {
            for doc in batch {
                posts.push(doc.deserialize::<Post>()?);
            }
        }
        debug!(
            communities = community_ids.len(),
            posts = posts.len(),
            "assembled home feed"
        );
        Ok(posts)
    }

    /// Globally top-ranked posts: the fallback when the viewer follows no
    /// communities or is signed out.
    pub async fn top_posts(&self) -> Result<Vec<Post>> {
        let docs = self
            .store
            .fetch(
                Query::collection(POSTS_COLLECTION)
                    .order_by_desc("voteStatus")
                    .limit(self.config.top_posts_limit),
            )
            .await?;

        let mut posts = Vec::with_capacity(docs.len());
        for doc in docs {
            posts.push(doc.deserialize::<Post>()?);
        }
        debug!(posts = posts.len(), "assembled global feed");
        Ok(posts)
    }
}
