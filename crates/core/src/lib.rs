//! Core business logic for accord-rs.

pub mod services;

pub use services::*;
