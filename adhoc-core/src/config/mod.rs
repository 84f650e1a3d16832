//! Configuration module
//!
//! Settings for the supervisor itself: where the daemon files live, which
//! shell and elevation binary to use, and how patient the privilege probe is.
//! The daemon config files it patches are handled by [`crate::patch`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod toml_config;

/// Default data directory holding `conf/`, `bin/` and `var/`
pub const DEFAULT_DATA_DIR: &str = "/data/data/org.servalproject";

/// Well-known locations of the `su` binary
pub const DEFAULT_ELEVATION_CANDIDATES: [&str; 2] = ["/system/bin/su", "/system/xbin/su"];

/// Complete supervisor settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub shell: ShellSettings,

    #[serde(default)]
    pub privilege: PrivilegeSettings,
}

impl Settings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), String> {
        if self.paths.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }

        if self.paths.proc_root.as_os_str().is_empty() {
            return Err("Process directory cannot be empty".to_string());
        }

        if self.shell.shell.as_os_str().is_empty() {
            return Err("Shell cannot be empty".to_string());
        }

        if self.shell.elevation_candidates.is_empty() && !self.shell.search_path {
            return Err(
                "At least one elevation candidate is required unless search_path is enabled"
                    .to_string(),
            );
        }

        if self.privilege.probe_interval_ms == 0 {
            return Err("Probe interval cannot be zero".to_string());
        }

        if self.privilege.max_probe_attempts == Some(0) {
            return Err("Max probe attempts cannot be zero".to_string());
        }

        Ok(())
    }
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Base data directory of the daemon file set
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Root of the process table (normally `/proc`)
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            proc_root: default_proc_root(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// Shell and elevation binary selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellSettings {
    /// Shell used for unprivileged commands and as the script interpreter
    #[serde(default = "default_shell")]
    pub shell: PathBuf,

    /// Elevation binaries, first existing one wins
    #[serde(default = "default_elevation_candidates")]
    pub elevation_candidates: Vec<PathBuf>,

    /// Fall back to looking up `su` in `$PATH`
    #[serde(default)]
    pub search_path: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            elevation_candidates: default_elevation_candidates(),
            search_path: false,
        }
    }
}

fn default_shell() -> PathBuf {
    PathBuf::from("/system/bin/sh")
}

fn default_elevation_candidates() -> Vec<PathBuf> {
    DEFAULT_ELEVATION_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Privilege probe tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeSettings {
    /// Upper bound on no-op elevated commands; `None` probes until approved
    #[serde(default)]
    pub max_probe_attempts: Option<u32>,

    /// Pause between probe attempts in milliseconds
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
}

impl PrivilegeSettings {
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

impl Default for PrivilegeSettings {
    fn default() -> Self {
        Self {
            max_probe_attempts: None,
            probe_interval_ms: default_probe_interval_ms(),
        }
    }
}

fn default_probe_interval_ms() -> u64 {
    500
}

/// The data directory layout
///
/// All daemon files are resolved relative to one base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn wpa_supplicant_conf(&self) -> PathBuf {
        self.root.join("conf").join("wpa_supplicant.conf")
    }

    pub fn tiwlan_ini(&self) -> PathBuf {
        self.root.join("conf").join("tiwlan.ini")
    }

    pub fn adhoc_conf(&self) -> PathBuf {
        self.root.join("conf").join("adhoc.conf")
    }

    pub fn dnsmasq_conf(&self) -> PathBuf {
        self.root.join("conf").join("dnsmasq.conf")
    }

    pub fn blue_up_script(&self) -> PathBuf {
        self.root.join("bin").join("blue-up.sh")
    }

    pub fn pkill(&self) -> PathBuf {
        self.root.join("bin").join("pkill")
    }

    pub fn dnsmasq_leases(&self) -> PathBuf {
        self.root.join("var").join("dnsmasq.leases")
    }

    pub fn dnsmasq_pid(&self) -> PathBuf {
        self.root.join("var").join("dnsmasq.pid")
    }

    /// Single-use script for elevated commands
    pub fn elevated_script(&self) -> PathBuf {
        self.root.join("sucmd")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_zero_probe_interval_rejected() {
        let mut settings = Settings::default();
        settings.privilege.probe_interval_ms = 0;
        assert_eq!(
            settings.validate().unwrap_err(),
            "Probe interval cannot be zero"
        );
    }

    #[test]
    fn test_data_paths_layout() {
        let paths = DataPaths::new("/data/x");
        assert_eq!(
            paths.wpa_supplicant_conf(),
            PathBuf::from("/data/x/conf/wpa_supplicant.conf")
        );
        assert_eq!(paths.blue_up_script(), PathBuf::from("/data/x/bin/blue-up.sh"));
        assert_eq!(paths.elevated_script(), PathBuf::from("/data/x/sucmd"));
        assert_eq!(
            paths.dnsmasq_leases(),
            PathBuf::from("/data/x/var/dnsmasq.leases")
        );
    }
}
