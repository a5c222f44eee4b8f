//! Framecast domain types shared by every crate in the workspace.
//!
//! Holds the job model and its validation rules, merge quality profiles,
//! the ffmpeg command wrapper and the error type used across crate
//! boundaries. Nothing in here talks to the network.

pub mod error;
pub mod ffmpeg;
pub mod job;
pub mod job_events;
pub mod media;
pub mod quality;
pub mod types;
