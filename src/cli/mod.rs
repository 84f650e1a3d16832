//! CLI command implementations
//!
//! Each `run_*` function returns the process exit code for its subcommand.

pub mod conf;
pub mod process;
