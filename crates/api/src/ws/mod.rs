//! WebSocket feed of job lifecycle events.

pub mod handler;

pub use handler::ws_handler;
