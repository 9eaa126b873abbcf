use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use doc_store::{DocumentStore, Snapshot, Subscription};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{CommunitySnippet, Post};
use crate::services::vote_sync::backoff_delay;
use crate::services::{FeedAssembler, VoteSynchronizer};
use crate::session::{SessionState, SnippetState};
use crate::state::{FeedState, VoteSyncStatus};

/// Per-item interaction callbacks supplied by the embedding layer. The
/// page core passes these through to the renderer untouched; their
/// effects (vote writes, navigation, deletion) live outside this crate.
pub trait PostActions: Send + Sync {
    fn on_vote(&self, _post: &Post, _value: i64) {}
    fn on_select_post(&self, _post: &Post) {}
    fn on_delete_post(&self, _post: &Post) {}
}

#[derive(Debug)]
enum Command {
    Refresh,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    Home,
    Top,
}

impl FetchMode {
    fn as_str(self) -> &'static str {
        match self {
            FetchMode::Home => "home",
            FetchMode::Top => "top",
        }
    }
}

/// Result of one spawned assembly, tagged with the generation it was
/// issued under. Stale generations are discarded on receipt.
struct FetchComplete {
    generation: u64,
    mode: FetchMode,
    result: Result<Vec<Post>>,
    elapsed: Duration,
}

/// The inputs the last issued assembly was computed from. Re-evaluations
/// that resolve to the same trigger are skipped; `Refresh` clears it.
#[derive(Debug, Clone, PartialEq)]
struct Trigger {
    user: Option<Uuid>,
    communities: Vec<String>,
}

struct RetryState {
    deadline: Instant,
    attempt: u32,
}

/// Rendering-side handle: read-only feed state plus command and callback
/// pass-through. Dropping every handle shuts the controller down.
pub struct FeedHandle {
    state: watch::Receiver<FeedState>,
    commands: mpsc::Sender<Command>,
    actions: Arc<dyn PostActions>,
}

impl FeedHandle {
    pub fn state(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    pub fn current(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Force a re-assembly off the current inputs.
    pub async fn refresh(&self) -> Result<()> {
        self.commands
            .send(Command::Refresh)
            .await
            .map_err(|_| AppError::Channel("home controller stopped".to_string()))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.commands
            .send(Command::Shutdown)
            .await
            .map_err(|_| AppError::Channel("home controller stopped".to_string()))
    }

    pub fn actions(&self) -> Arc<dyn PostActions> {
        Arc::clone(&self.actions)
    }
}

/// Page-level controller owning the feed state. All mutations happen on
/// one actor task; the renderer observes through the watch channel.
pub struct HomeController {
    assembler: FeedAssembler,
    votes: VoteSynchronizer,
    config: Config,

    state: FeedState,
    state_tx: watch::Sender<FeedState>,

    session_rx: watch::Receiver<SessionState>,
    snippets_rx: watch::Receiver<SnippetState>,
    commands_rx: mpsc::Receiver<Command>,

    fetch_tx: mpsc::Sender<FetchComplete>,
    fetch_rx: mpsc::Receiver<FetchComplete>,
    generation: u64,
    last_trigger: Option<Trigger>,

    vote_sub: Option<Subscription>,
    vote_key: Option<(Uuid, Vec<String>)>,
    vote_retry: Option<RetryState>,
}

impl HomeController {
    pub fn spawn(
        store: Arc<dyn DocumentStore>,
        config: Config,
        session_rx: watch::Receiver<SessionState>,
        snippets_rx: watch::Receiver<SnippetState>,
        actions: Arc<dyn PostActions>,
    ) -> (FeedHandle, JoinHandle<()>) {
        let (state_tx, state_rx) = watch::channel(FeedState::default());
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (fetch_tx, fetch_rx) = mpsc::channel(16);

        let controller = HomeController {
            assembler: FeedAssembler::new(Arc::clone(&store), config.feed.clone()),
            votes: VoteSynchronizer::new(store),
            config,
            state: FeedState::default(),
            state_tx,
            session_rx,
            snippets_rx,
            commands_rx,
            fetch_tx,
            fetch_rx,
            generation: 0,
            last_trigger: None,
            vote_sub: None,
            vote_key: None,
            vote_retry: None,
        };
        let task = tokio::spawn(controller.run());
        let handle = FeedHandle {
            state: state_rx,
            commands: commands_tx,
            actions,
        };
        (handle, task)
    }

    async fn run(mut self) {
        // act on whatever the inputs already hold before waiting for changes
        self.evaluate_triggers();
        self.reconcile_votes().await;

        loop {
            let retry_deadline = self.vote_retry.as_ref().map(|r| r.deadline);
            tokio::select! {
                changed = self.session_rx.changed() => {
                    if changed.is_err() {
                        info!("session input closed; shutting down home controller");
                        break;
                    }
                    self.evaluate_triggers();
                    self.reconcile_votes().await;
                }
                changed = self.snippets_rx.changed() => {
                    if changed.is_err() {
                        info!("subscription-list input closed; shutting down home controller");
                        break;
                    }
                    self.evaluate_triggers();
                    self.reconcile_votes().await;
                }
                Some(done) = self.fetch_rx.recv() => {
                    self.on_fetch_complete(done).await;
                }
                snapshot = next_vote_snapshot(&mut self.vote_sub) => {
                    match snapshot {
                        Some(snapshot) => self.apply_vote_snapshot(snapshot),
                        None => self.on_votes_closed(),
                    }
                }
                _ = sleep_until_deadline(retry_deadline) => {
                    self.try_resubscribe().await;
                }
                command = self.commands_rx.recv() => {
                    match command {
                        Some(Command::Refresh) => {
                            self.last_trigger = None;
                            self.evaluate_triggers();
                            self.reconcile_votes().await;
                        }
                        Some(Command::Shutdown) | None => break,
                    }
                }
            }
        }

        // teardown: release the live query and drop the per-user mapping
        self.align_vote_target_to(None);
        self.publish();
    }

    /// The triggering policy, made first-class: assemble for a signed-in
    /// viewer only once the snippet list finished its initial load; run
    /// the global fallback once the session definitively resolved to
    /// signed-out. Re-evaluations under unchanged inputs are no-ops.
    fn evaluate_triggers(&mut self) {
        let session = self.session_rx.borrow().clone();
        let snippets = self.snippets_rx.borrow().clone();

        let trigger = match session.user {
            Some(user) if snippets.loaded => Some(Trigger {
                user: Some(user),
                communities: snippets
                    .snippets
                    .iter()
                    .map(|s| s.community_id.clone())
                    .collect(),
            }),
            Some(_) => None, // snippet list still loading
            None if !session.loading => Some(Trigger {
                user: None,
                communities: Vec::new(),
            }),
            None => None, // session still resolving
        };

        let Some(trigger) = trigger else { return };
        if self.last_trigger.as_ref() == Some(&trigger) {
            return;
        }
        let snippets: Vec<CommunitySnippet> = trigger
            .communities
            .iter()
            .cloned()
            .map(CommunitySnippet::new)
            .collect();
        self.last_trigger = Some(trigger);
        self.begin_assembly(snippets);
    }

    fn begin_assembly(&mut self, snippets: Vec<CommunitySnippet>) {
        self.generation += 1;
        let generation = self.generation;
        let mode = if snippets.is_empty() {
            FetchMode::Top
        } else {
            FetchMode::Home
        };
        debug!(generation, mode = mode.as_str(), "starting feed assembly");
        self.state.loading = true;
        self.publish();

        let assembler = self.assembler.clone();
        let completions = self.fetch_tx.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let result = match mode {
                FetchMode::Home => assembler.home_posts(&snippets).await,
                FetchMode::Top => assembler.top_posts().await,
            };
            let _ = completions
                .send(FetchComplete {
                    generation,
                    mode,
                    result,
                    elapsed: started.elapsed(),
                })
                .await;
        });
    }

    async fn on_fetch_complete(&mut self, done: FetchComplete) {
        if done.generation != self.generation {
            debug!(
                generation = done.generation,
                current = self.generation,
                "discarding stale feed fetch"
            );
            metrics::observe_feed_fetch(done.mode.as_str(), "stale", done.elapsed);
            return;
        }
        match done.result {
            Ok(posts) => {
                info!(
                    mode = done.mode.as_str(),
                    posts = posts.len(),
                    "feed assembled"
                );
                metrics::observe_feed_fetch(done.mode.as_str(), "ok", done.elapsed);
                self.state.posts = posts;
                self.state.loading = false;
                // the mapping reset must land in the same published state
                // as the feed it belongs to
                let desired = self.desired_vote_target();
                self.align_vote_target_to(desired);
                self.publish();
                self.ensure_vote_subscription().await;
            }
            Err(error) => {
                warn!(
                    mode = done.mode.as_str(),
                    %error,
                    "feed fetch failed; keeping previous feed"
                );
                metrics::observe_feed_fetch(done.mode.as_str(), "error", done.elapsed);
                self.state.loading = false;
                self.publish();
            }
        }
    }

    /// The (user, feed-ids) pair the vote subscription should be scoped
    /// to right now; `None` when the preconditions do not hold.
    fn desired_vote_target(&self) -> Option<(Uuid, Vec<String>)> {
        match self.session_rx.borrow().user {
            Some(user) if !self.state.posts.is_empty() => Some((user, self.state.post_ids())),
            _ => None,
        }
    }

    /// Re-scope the subscription to the given target. On any change the
    /// old subscription is released and the mapping cleared before a new
    /// one can deliver. Does not publish; callers do.
    fn align_vote_target_to(&mut self, desired: Option<(Uuid, Vec<String>)>) {
        if desired == self.vote_key {
            return;
        }
        if let Some(mut sub) = self.vote_sub.take() {
            sub.stop();
        }
        self.vote_retry = None;
        self.vote_key = desired;
        self.state.post_votes.clear();
        self.state.vote_sync = VoteSyncStatus::Inactive;
    }

    async fn reconcile_votes(&mut self) {
        let desired = self.desired_vote_target();
        if desired != self.vote_key {
            self.align_vote_target_to(desired);
            self.publish();
        }
        self.ensure_vote_subscription().await;
    }

    async fn ensure_vote_subscription(&mut self) {
        if self.vote_sub.is_some() || self.vote_retry.is_some() {
            return;
        }
        if let Some((user, ids)) = self.vote_key.clone() {
            self.open_votes(user, ids, 0).await;
        }
    }

    async fn open_votes(&mut self, user: Uuid, ids: Vec<String>, failed_attempts: u32) {
        match self.votes.open(&user, &ids).await {
            Ok(sub) => {
                debug!(%user, posts = ids.len(), "vote subscription opened");
                self.vote_sub = Some(sub);
                self.vote_retry = None;
            }
            Err(error) => {
                self.schedule_vote_retry(failed_attempts + 1, &error.to_string());
            }
        }
    }

    fn apply_vote_snapshot(&mut self, snapshot: Snapshot) {
        metrics::observe_vote_snapshot();
        // full replace, never an incremental patch
        self.state.post_votes = VoteSynchronizer::votes_from_snapshot(snapshot);
        self.state.vote_sync = VoteSyncStatus::Live;
        self.publish();
    }

    fn on_votes_closed(&mut self) {
        self.vote_sub = None;
        let attempt = self.vote_retry.as_ref().map(|r| r.attempt).unwrap_or(0) + 1;
        self.schedule_vote_retry(attempt, "snapshot stream closed");
    }

    fn schedule_vote_retry(&mut self, attempt: u32, reason: &str) {
        let delay = backoff_delay(&self.config.vote_sync, attempt);
        if attempt >= self.config.vote_sync.failure_alert_threshold {
            error!(
                reason,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "vote subscription failing repeatedly"
            );
        } else {
            warn!(
                reason,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "vote subscription lost; will re-subscribe"
            );
        }
        self.vote_retry = Some(RetryState {
            deadline: Instant::now() + delay,
            attempt,
        });
        if self.state.vote_sync != VoteSyncStatus::Retrying {
            self.state.vote_sync = VoteSyncStatus::Retrying;
            self.publish();
        }
    }

    async fn try_resubscribe(&mut self) {
        let Some(retry) = self.vote_retry.take() else {
            return;
        };
        let Some((user, ids)) = self.vote_key.clone() else {
            return;
        };
        metrics::observe_vote_resubscribe();
        self.open_votes(user, ids, retry.attempt).await;
    }

    fn publish(&mut self) {
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn next_vote_snapshot(sub: &mut Option<Subscription>) -> Option<Snapshot> {
    match sub {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
