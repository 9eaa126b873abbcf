//! Client-side abstraction over the remote document store.
//!
//! The store itself is an external managed service; this crate only models
//! the read surface the application consumes: filtered/ordered/limited
//! one-shot reads and live-query subscriptions. [`MemoryStore`] is an
//! in-process implementation of the same trait, used by tests and local
//! development.

pub mod error;
pub mod memory;
pub mod query;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use query::{Direction, Filter, OrderBy, Query};
pub use store::{Document, DocumentStore, Snapshot, Subscription};
