//! Process table inspection
//!
//! Answers "is a daemon matching this name alive" from a scan of the process
//! directory.

pub mod registry;

pub use registry::{ProcessRegistry, ProcessSnapshot};
