//! Common utilities and shared types for accord-rs.
//!
//! This crate provides foundational components used across all accord-rs crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Wire types**: [`Message`], [`MessagePage`] and [`MessageEvent`] shared
//!   by the server and the client session core
//!
//! # Example
//!
//! ```no_run
//! use accord_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod message;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use message::{AttachmentKind, Message, MessageEvent, MessagePage, MESSAGE_BATCH};
