use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as the store hands it out. Read-only on this page; creation and
/// vote writes happen in other flows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub community_id: String,
    pub creator_id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Rank score, mutated externally by vote events.
    #[serde(default)]
    pub vote_status: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One user's vote on one post. Uniqueness per (user, post) is enforced by
/// the store's per-user collection path, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostVote {
    pub id: String,
    pub post_id: String,
    /// +1 or -1.
    pub vote_value: i64,
}

/// A community the viewer follows. The home page only consumes the
/// identifier; the list itself is resolved elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommunitySnippet {
    pub community_id: String,
}

impl CommunitySnippet {
    pub fn new(community_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
        }
    }
}
