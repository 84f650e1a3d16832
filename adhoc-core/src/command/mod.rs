//! Shell command execution
//!
//! Plain and elevated shell commands, the shared elevated-command script, and
//! the once-per-process privilege probe.

pub mod privilege;
pub mod runner;
pub mod script;

pub use privilege::{ElevationProbe, PrivilegeGate, PrivilegeVerdict};
pub use runner::{CommandResult, CommandRunner};
pub use script::ElevatedScript;
