//! File primitives
//!
//! Whole-file line reads and in-place overwrites shared by every config patch.

pub mod line_file;

pub use line_file::{read_lines, set_permissions, write, write_lines};
