//! Client-side feed synchronization for accord-rs.
//!
//! This crate keeps a local render-ready copy of each open topic's feed in
//! sync with the server:
//!
//! - **Feed**: per-topic merge/dedup cache over pages and pushed events
//! - **Connection**: stream connection state machine with backoff
//! - **Coordinator**: reconnection resync and scroll-up backfill
//!
//! Everything here is transport-agnostic; the stream and HTTP transports
//! plug in through the [`coordinator::PageFetcher`] seam.

pub mod connection;
pub mod coordinator;
pub mod feed;

pub use connection::{Connection, ConnectionState, RetryPolicy};
pub use coordinator::{PageFetcher, SyncCoordinator};
pub use feed::FeedCache;
