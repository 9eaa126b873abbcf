use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub feed: FeedConfig,
    pub vote_sync: VoteSyncConfig,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// At most this many followed communities are queried per assembly.
    pub max_home_communities: usize,
    /// Per-community read cap.
    pub posts_per_community: usize,
    /// Result cap of the global ranked fallback feed.
    pub top_posts_limit: usize,
}

#[derive(Debug, Clone)]
pub struct VoteSyncConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failures after which retry logging escalates to error.
    pub failure_alert_threshold: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_home_communities: 3,
            posts_per_community: 3,
            top_posts_limit: 10,
        }
    }
}

impl Default for VoteSyncConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            failure_alert_threshold: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            feed: FeedConfig {
                max_home_communities: env_parse(
                    "HOME_MAX_COMMUNITIES",
                    FeedConfig::default().max_home_communities,
                )?,
                posts_per_community: env_parse(
                    "HOME_POSTS_PER_COMMUNITY",
                    FeedConfig::default().posts_per_community,
                )?,
                top_posts_limit: env_parse(
                    "HOME_TOP_POSTS_LIMIT",
                    FeedConfig::default().top_posts_limit,
                )?,
            },
            vote_sync: VoteSyncConfig {
                initial_backoff: Duration::from_millis(env_parse(
                    "VOTE_SYNC_INITIAL_BACKOFF_MS",
                    500u64,
                )?),
                max_backoff: Duration::from_millis(env_parse(
                    "VOTE_SYNC_MAX_BACKOFF_MS",
                    30_000u64,
                )?),
                failure_alert_threshold: env_parse("VOTE_SYNC_ALERT_THRESHOLD", 5u32)?,
            },
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {}: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
