//! Error types for the adhoc supervisor
//!
//! Only failures a caller cannot route around are modelled here. Missing
//! files, absent keys and processes that are not running are ordinary
//! results (`false`, empty collections) and never surface as errors.

use thiserror::Error;

/// Main error type for the adhoc supervisor
#[derive(Error, Debug)]
pub enum AdhocError {
    /// Errors related to loading or saving the settings file
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised while launching a child process
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Invalid input handed to a config patch
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Settings-file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save configuration file: {path}")]
    SaveFailed { path: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Failures to start a child process
///
/// A child that starts and then exits non-zero is not an error; its exit
/// code is returned to the caller as data.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No elevation binary found (searched: {searched})")]
    ElevationUnavailable { searched: String },

    #[error("Failed to stage elevated command script {path}: {source}")]
    Script {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid patch input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("Invalid LAN address: {address}")]
    InvalidLanAddress { address: String },

    #[error("Invalid key=value assignment: {input}")]
    InvalidAssignment { input: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AdhocError>;
