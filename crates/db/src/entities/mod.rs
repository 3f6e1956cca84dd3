//! Database entities.

pub mod message;
