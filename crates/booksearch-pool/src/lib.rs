//! booksearch-pool
//!
//! Parallel search over a document: a coordinator task hands fixed-size
//! chunks of paragraphs to OS worker threads, pulls the next chunk for a slot
//! only once that slot has finished its current one, and folds every result of
//! the current epoch into paced, ranked snapshots.
//!
//! Start with [`Dispatcher::new`] and [`Dispatcher::spawn`]; drive it through
//! the returned [`SearchController`] and read [`SearchUpdates`].
#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod accumulator;
pub mod chunk;
pub mod dispatcher;
pub mod local;
pub mod message;
pub mod pacer;
pub mod schedule;
pub mod worker;

pub use accumulator::{accumulate, ResultAccumulator, DEFAULT_TOP_K};
pub use chunk::{next_chunk, Chunk, ChunkSource};
pub use dispatcher::{Dispatcher, SearchController, SearchEvent, SearchInput, SearchUpdates};
pub use local::accumulated_search;
pub use message::{MatchReport, SlotReply, WorkerMessage, WorkerReply};
pub use schedule::{ChunkSchedule, SlotState};
