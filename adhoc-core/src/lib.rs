//! Core library for the adhoc daemon supervisor
//!
//! This crate provides privileged command execution, process-table liveness
//! checks and structure-preserving rewrites of the line-oriented config files
//! used by the mesh network daemons (wpa_supplicant, dnsmasq, the TI WLAN
//! driver and the Bluetooth tether script).

pub mod error;

pub mod command;
pub mod config;
pub mod files;
pub mod patch;
pub mod process;
pub mod supervisor;

pub use supervisor::Supervisor;

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when running under systemd.
/// Otherwise logs to stderr with pretty formatting.
pub fn init_logging(
    level: tracing_subscriber::filter::LevelFilter,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(level)
                .init();
            return Ok(());
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
        .with(level)
        .init();

    Ok(())
}
