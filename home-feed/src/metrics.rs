//! Prometheus metrics for feed assembly and vote synchronization.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

lazy_static! {
    static ref FEED_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "home_feed_fetches_total",
        "Feed assembly completions by mode and outcome",
        &["mode", "outcome"]
    )
    .expect("register home_feed_fetches_total");
    static ref FEED_FETCH_DURATION_SECONDS: Histogram = register_histogram!(
        "home_feed_fetch_duration_seconds",
        "Wall time of feed assembly operations"
    )
    .expect("register home_feed_fetch_duration_seconds");
    static ref VOTE_SNAPSHOTS_TOTAL: IntCounter = register_int_counter!(
        "home_feed_vote_snapshots_total",
        "Vote subscription snapshots applied"
    )
    .expect("register home_feed_vote_snapshots_total");
    static ref VOTE_RESUBSCRIBES_TOTAL: IntCounter = register_int_counter!(
        "home_feed_vote_resubscribes_total",
        "Vote subscription retry attempts after a failure"
    )
    .expect("register home_feed_vote_resubscribes_total");
}

pub fn observe_feed_fetch(mode: &str, outcome: &str, elapsed: Duration) {
    FEED_FETCHES_TOTAL
        .with_label_values(&[mode, outcome])
        .inc();
    FEED_FETCH_DURATION_SECONDS.observe(elapsed.as_secs_f64());
}

pub fn observe_vote_snapshot() {
    VOTE_SNAPSHOTS_TOTAL.inc();
}

pub fn observe_vote_resubscribe() {
    VOTE_RESUBSCRIBES_TOTAL.inc();
}
