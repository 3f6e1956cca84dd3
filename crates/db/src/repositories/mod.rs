//! Database repositories.

mod message;

pub use message::MessageRepository;
