//! Business logic services.

pub mod event_publisher;
pub mod identity;
pub mod message;

pub use event_publisher::{EventPublisherService, MessageEventPublisher, NoOpEventPublisher};
pub use identity::{IdentityProvider, IdentityService, Profile, StaticIdentityProvider};
pub use message::{CreateMessageInput, MessageService};
