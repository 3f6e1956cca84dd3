//! HTTP API layer for accord-rs.
//!
//! This crate provides the REST API and real-time streaming:
//!
//! - **Endpoints**: cursor-paginated message reads and mutations
//! - **Extractors**: authentication via the identity collaborator
//! - **Middleware**: auth, logging, CORS
//! - **Streaming**: per-topic WebSocket fan-out of message events
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod streaming;

pub use endpoints::router;
pub use streaming::{streaming_handler, TopicHub};
