pub mod assembler;
pub mod vote_sync;

pub use assembler::FeedAssembler;
pub use vote_sync::VoteSynchronizer;
