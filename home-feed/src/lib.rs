//! Home-feed page core: assembles the viewer's feed from the remote
//! document store and keeps the viewer's per-post vote state live. The
//! store, the session provider, and the view renderer are external
//! collaborators; they reach this crate only through [`DocumentStore`],
//! the input watch channels, and [`FeedHandle`].
//!
//! [`DocumentStore`]: doc_store::DocumentStore

pub mod config;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod session;
pub mod state;

pub use config::{Config, FeedConfig, VoteSyncConfig};
pub use controller::{FeedHandle, HomeController, PostActions};
pub use error::{AppError, Result};
pub use models::{CommunitySnippet, Post, PostVote};
pub use session::{SessionState, SnippetState};
pub use state::{FeedState, VoteSyncStatus};
