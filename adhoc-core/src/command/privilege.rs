//! Once-per-process elevated access check
//!
//! The first call to [`PrivilegeGate::has_privilege`] looks for the elevation
//! binary and, if present, keeps issuing a no-op elevated command until one
//! succeeds. On most devices that means waiting for a human to answer the
//! superuser prompt, so the call can block for a long time, and forever if the
//! prompt is dismissed without an explicit denial. Set a probe bound to trade
//! that for a `Denied` verdict.
//!
//! The verdict is recorded once and never re-evaluated; a restart is the only
//! way to re-probe.

use crate::command::runner::CommandRunner;
use crate::error::CommandError;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Elevated-access verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeVerdict {
    /// Not probed yet
    Unknown,

    /// A no-op elevated command succeeded
    Granted,

    /// No elevation binary, or probing gave up
    Denied,
}

impl std::fmt::Display for PrivilegeVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivilegeVerdict::Unknown => write!(f, "unknown"),
            PrivilegeVerdict::Granted => write!(f, "granted"),
            PrivilegeVerdict::Denied => write!(f, "denied"),
        }
    }
}

/// Something that can attempt elevated execution
pub trait ElevationProbe {
    /// Whether an elevation binary exists at all
    fn elevation_available(&self) -> bool;

    /// Run one no-op elevated command and return its exit code
    fn probe(&self) -> Result<i32, CommandError>;
}

impl ElevationProbe for CommandRunner {
    fn elevation_available(&self) -> bool {
        self.elevation_binary().is_some()
    }

    fn probe(&self) -> Result<i32, CommandError> {
        self.run_elevated("", true)
    }
}

impl<T: ElevationProbe + ?Sized> ElevationProbe for Arc<T> {
    fn elevation_available(&self) -> bool {
        (**self).elevation_available()
    }

    fn probe(&self) -> Result<i32, CommandError> {
        (**self).probe()
    }
}

fn process_verdict() -> Arc<OnceLock<PrivilegeVerdict>> {
    static CELL: OnceLock<Arc<OnceLock<PrivilegeVerdict>>> = OnceLock::new();
    CELL.get_or_init(|| Arc::new(OnceLock::new())).clone()
}

/// Caches the elevated-access verdict
///
/// Concurrent first callers block on the same initialization, so at most one
/// probe sequence (and one superuser prompt) runs per verdict cell.
#[derive(Debug)]
pub struct PrivilegeGate<P> {
    probe: P,
    verdict: Arc<OnceLock<PrivilegeVerdict>>,
    max_attempts: Option<u32>,
    probe_interval: Duration,
}

impl<P: ElevationProbe> PrivilegeGate<P> {
    /// Gate with its own verdict cell
    pub fn new(probe: P) -> Self {
        Self::with_cell(probe, Arc::new(OnceLock::new()))
    }

    /// Gate sharing the process-wide verdict cell
    pub fn process_wide(probe: P) -> Self {
        Self::with_cell(probe, process_verdict())
    }

    fn with_cell(probe: P, verdict: Arc<OnceLock<PrivilegeVerdict>>) -> Self {
        Self {
            probe,
            verdict,
            max_attempts: None,
            probe_interval: Duration::from_millis(500),
        }
    }

    /// Give up after `max_attempts` failed probes (`None` probes forever)
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Pause between failed probes
    pub fn with_probe_interval(mut self, probe_interval: Duration) -> Self {
        self.probe_interval = probe_interval;
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Whether elevated commands can be run, probing on first use
    pub fn has_privilege(&self) -> bool {
        *self.verdict.get_or_init(|| self.evaluate()) == PrivilegeVerdict::Granted
    }

    /// Current verdict without probing
    pub fn verdict(&self) -> PrivilegeVerdict {
        self.verdict
            .get()
            .copied()
            .unwrap_or(PrivilegeVerdict::Unknown)
    }

    fn evaluate(&self) -> PrivilegeVerdict {
        if !self.probe.elevation_available() {
            warn!("Unable to get root permission: elevation binary not found");
            return PrivilegeVerdict::Denied;
        }

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.probe.probe() {
                Ok(0) => {
                    info!("Root permission granted after {} probe(s)", attempts);
                    return PrivilegeVerdict::Granted;
                }
                Ok(code) => debug!("Elevation probe {} returned {}", attempts, code),
                Err(e) => {
                    warn!("Unable to get root permission: {}", e);
                    return PrivilegeVerdict::Denied;
                }
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                warn!("Root permission not granted after {} probe(s)", attempts);
                return PrivilegeVerdict::Denied;
            }
            std::thread::sleep(self.probe_interval);
        }
    }
}
