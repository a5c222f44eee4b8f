//! Job storage for the generation service.
//!
//! [`JobStore`] is the seam the pipeline and the HTTP layer depend on;
//! [`MemJobStore`] is the in-process implementation. Jobs are not
//! persisted across restarts.

pub mod job_store;

pub use job_store::{JobStore, MemJobStore};

/// Shared handle to whichever store backs the service.
pub type SharedJobStore = std::sync::Arc<dyn JobStore>;
