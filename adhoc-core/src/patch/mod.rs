//! Config file patching
//!
//! Parsing into [`ConfigTable`]s, the rewrite strategies built on them, and
//! the per-daemon file handles.

pub mod daemons;
pub mod strategy;
pub mod table;

pub use daemons::{AdhocConf, BluetoothScript, DnsmasqConf, TiWlanConf, WpaSupplicantConf};
pub use strategy::{
    patch_key_values, patch_marker_line, patch_token_after, replace_token_after, LanAddress,
    LineSignature,
};
pub use table::{ConfigLine, ConfigTable, Dialect};
