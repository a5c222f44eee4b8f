pub mod jobs;
pub mod merge;
