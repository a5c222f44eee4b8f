//! In-process job event bus.
//!
//! The generation pipeline publishes a [`JobEvent`] on every lifecycle
//! transition; the API forwards them to WebSocket subscribers.

pub mod bus;

pub use bus::{EventBus, JobEvent};
