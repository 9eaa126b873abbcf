#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{watch, Semaphore};
use tokio::time::{sleep, timeout};
use uuid::Uuid;

use doc_store::{
    DocumentStore, MemoryStore, Query, Snapshot, StoreError, StoreResult, Subscription,
};
use home_feed::{
    CommunitySnippet, Config, FeedHandle, FeedState, HomeController, PostActions, SessionState,
    SnippetState,
};

pub struct NoActions;

impl PostActions for NoActions {}

/// Wraps the in-memory store, recording every one-shot query and
/// optionally failing reads on demand.
pub struct CountingStore {
    pub inner: Arc<MemoryStore>,
    queries: Mutex<Vec<Query>>,
    fail_fetches: AtomicBool,
}

impl CountingStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
            fail_fetches: AtomicBool::new(false),
        }
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn fetch(&self, query: Query) -> StoreResult<Snapshot> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected fetch failure".to_string()));
        }
        self.inner.fetch(query).await
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        self.inner.subscribe(query).await
    }
}

/// Store whose fetches park until permits are released, so tests can
/// observe the page mid-assembly.
pub struct GatedStore {
    pub inner: Arc<MemoryStore>,
    gate: Semaphore,
}

impl GatedStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
        }
    }

    pub fn release(&self, fetches: usize) {
        self.gate.add_permits(fetches);
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn fetch(&self, query: Query) -> StoreResult<Snapshot> {
        self.gate
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("gate closed".to_string()))?
            .forget();
        self.inner.fetch(query).await
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        self.inner.subscribe(query).await
    }
}

/// A spawned page with externally drivable inputs.
pub struct RawPage {
    pub session_tx: watch::Sender<SessionState>,
    pub snippets_tx: watch::Sender<SnippetState>,
    pub handle: FeedHandle,
    pub task: tokio::task::JoinHandle<()>,
}

/// Opt-in test logging: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn spawn_page_with(store: Arc<dyn DocumentStore>, config: Config) -> RawPage {
    init_tracing();
    let (session_tx, session_rx) = watch::channel(SessionState::resolving());
    let (snippets_tx, snippets_rx) = watch::channel(SnippetState::default());
    let (handle, task) =
        HomeController::spawn(store, config, session_rx, snippets_rx, Arc::new(NoActions));
    RawPage {
        session_tx,
        snippets_tx,
        handle,
        task,
    }
}

pub struct Page {
    pub store: Arc<MemoryStore>,
    pub counting: Arc<CountingStore>,
    pub session_tx: watch::Sender<SessionState>,
    pub snippets_tx: watch::Sender<SnippetState>,
    pub handle: FeedHandle,
    pub task: tokio::task::JoinHandle<()>,
}

pub fn spawn_page() -> Page {
    let store = Arc::new(MemoryStore::new());
    let counting = Arc::new(CountingStore::new(Arc::clone(&store)));
    let raw = spawn_page_with(
        Arc::clone(&counting) as Arc<dyn DocumentStore>,
        Config::default(),
    );
    Page {
        store,
        counting,
        session_tx: raw.session_tx,
        snippets_tx: raw.snippets_tx,
        handle: raw.handle,
        task: raw.task,
    }
}

pub fn seed_post(store: &MemoryStore, id: &str, community: &str, vote_status: i64) {
    store.insert_with_id(
        "posts",
        id,
        json!({
            "communityId": community,
            "creatorId": "author-1",
            "title": id,
            "voteStatus": vote_status,
        }),
    );
}

pub fn votes_collection(user: &Uuid) -> String {
    format!("users/{user}/postVotes")
}

pub fn seed_vote(store: &MemoryStore, user: &Uuid, id: &str, post_id: &str, value: i64) {
    store.insert_with_id(
        &votes_collection(user),
        id,
        json!({"postId": post_id, "voteValue": value}),
    );
}

pub fn snippet_list(ids: &[&str]) -> Vec<CommunitySnippet> {
    ids.iter().map(|id| CommunitySnippet::new(*id)).collect()
}

/// Wait until the published feed state satisfies the predicate; panics
/// with `what` after two seconds.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<FeedState>,
    what: &str,
    predicate: impl Fn(&FeedState) -> bool,
) -> FeedState {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let state = rx.borrow();
                if predicate(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("feed state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

/// Poll an out-of-band condition (query counters, watcher counts).
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}
