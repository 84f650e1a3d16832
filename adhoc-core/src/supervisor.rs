//! Supervisor: the single owner of runner, registry, gate and file handles
//!
//! Callers go through this type rather than the components directly. It
//! serializes read-modify-write cycles per config file and funnels elevated
//! commands through the runner's script lock.

use crate::command::{CommandRunner, PrivilegeGate, PrivilegeVerdict};
use crate::config::{DataPaths, Settings};
use crate::error::CommandError;
use crate::patch::{
    AdhocConf, BluetoothScript, DnsmasqConf, LanAddress, TiWlanConf, WpaSupplicantConf,
};
use crate::process::ProcessRegistry;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// One mutex per config file path
#[derive(Debug, Default)]
struct FileLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FileLocks {
    fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }
}

/// Controls and configures the daemon file set under one data directory
#[derive(Debug)]
pub struct Supervisor {
    paths: DataPaths,
    runner: Arc<CommandRunner>,
    registry: ProcessRegistry,
    gate: PrivilegeGate<Arc<CommandRunner>>,
    file_locks: FileLocks,
}

impl Supervisor {
    /// Supervisor sharing the process-wide privilege verdict
    pub fn new(settings: &Settings) -> Self {
        let runner = Arc::new(CommandRunner::from_settings(settings));
        Self::assemble(settings, PrivilegeGate::process_wide(Arc::clone(&runner)), runner)
    }

    /// Supervisor with a verdict of its own, independent of other instances
    pub fn with_private_verdict(settings: &Settings) -> Self {
        let runner = Arc::new(CommandRunner::from_settings(settings));
        Self::assemble(settings, PrivilegeGate::new(Arc::clone(&runner)), runner)
    }

    fn assemble(
        settings: &Settings,
        gate: PrivilegeGate<Arc<CommandRunner>>,
        runner: Arc<CommandRunner>,
    ) -> Self {
        let gate = gate
            .with_max_attempts(settings.privilege.max_probe_attempts)
            .with_probe_interval(settings.privilege.probe_interval());

        Self {
            paths: DataPaths::new(&settings.paths.data_dir),
            runner,
            registry: ProcessRegistry::new(&settings.paths.proc_root),
            gate,
            file_locks: FileLocks::default(),
        }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    // -- processes and commands -------------------------------------------

    /// Whether a process whose command line contains `name` is alive
    pub fn is_running(&self, name: &str) -> bool {
        self.registry.is_running(name)
    }

    /// Whether elevated commands work, probing once per verdict lifetime
    pub fn has_privilege(&self) -> bool {
        self.gate.has_privilege()
    }

    pub fn privilege_verdict(&self) -> PrivilegeVerdict {
        self.gate.verdict()
    }

    /// Run an unprivileged command and wait for it
    pub fn run_command(&self, command: &str) -> Result<i32, CommandError> {
        self.runner.run(command, false, true)
    }

    /// Run a command, elevated ones through the script file
    pub fn run(&self, command: &str, elevated: bool, wait: bool) -> Result<i32, CommandError> {
        if elevated {
            self.runner.run_elevated(command, wait)
        } else {
            self.runner.run(command, false, wait)
        }
    }

    pub fn run_elevated(&self, command: &str, wait: bool) -> Result<i32, CommandError> {
        self.runner.run_elevated(command, wait)
    }

    /// `chmod <mode> <path>` through the shell; `false` on any failure
    pub fn chmod(&self, path: &Path, mode: &str) -> bool {
        let command = format!("chmod {} {}", mode, shell_quote(&path.to_string_lossy()));
        matches!(self.run_command(&command), Ok(0))
    }

    /// Stop every process whose command line contains `name`
    ///
    /// Elevated: runs the bundled `pkill` as root. Otherwise sends SIGTERM to
    /// each matching pid found by the registry. Returns whether anything was
    /// signalled.
    pub fn kill_process(&self, name: &str, elevated: bool) -> Result<bool, CommandError> {
        if elevated {
            let command = format!(
                "{} {}",
                shell_quote(&self.paths.pkill().to_string_lossy()),
                shell_quote(name)
            );
            return Ok(self.runner.run_elevated(&command, true)? == 0);
        }

        let pids = self.registry.matching_pids(name);
        if pids.is_empty() {
            debug!("No {} processes to stop", name);
            return Ok(false);
        }

        let mut signalled = 0;
        for pid in &pids {
            let Ok(raw) = i32::try_from(*pid) else {
                continue;
            };
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => {
                    debug!("SIGTERM sent to process {}", pid);
                    signalled += 1;
                }
                Err(Errno::ESRCH) => debug!("Process {} already terminated", pid),
                Err(Errno::EPERM) => warn!(
                    "Permission denied to terminate process {} (owned by different user)",
                    pid
                ),
                Err(e) => warn!("Failed to send SIGTERM to process {}: {}", pid, e),
            }
        }

        info!("Signalled {}/{} {} process(es)", signalled, pids.len(), name);
        Ok(signalled > 0)
    }

    // -- config files ----------------------------------------------------

    pub fn supplicant_settings(&self) -> Option<BTreeMap<String, String>> {
        let conf = WpaSupplicantConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.get())
    }

    pub fn update_supplicant(&self, updates: &HashMap<String, String>) -> bool {
        let conf = WpaSupplicantConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.write(updates))
    }

    pub fn remove_supplicant(&self) -> bool {
        let conf = WpaSupplicantConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.remove())
    }

    /// Keys present in `conf/wpa_supplicant.conf`, empty values included
    pub fn supplicant_keys(&self) -> BTreeSet<String> {
        let conf = WpaSupplicantConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.keys())
    }

    /// Keys present in `conf/tiwlan.ini`, empty values included
    pub fn tiwlan_keys(&self) -> BTreeSet<String> {
        let conf = TiWlanConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.keys())
    }

    pub fn tiwlan_settings(&self) -> BTreeMap<String, String> {
        let conf = TiWlanConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.get())
    }

    pub fn update_tiwlan(&self, updates: &HashMap<String, String>) -> bool {
        let conf = TiWlanConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.write(updates))
    }

    pub fn adhoc_settings(&self) -> BTreeMap<String, String> {
        let conf = AdhocConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.read())
    }

    /// Merge `values` into `conf/adhoc.conf`
    pub fn save_adhoc_settings(&self, values: &BTreeMap<String, String>) -> bool {
        let conf = AdhocConf::new(&self.paths);
        self.file_locks.with_lock(conf.path(), || conf.write(values))
    }

    /// Apply a LAN address to dnsmasq's DHCP range and the bnep0 gateway
    ///
    /// Both files are attempted; the result is `true` only if both were
    /// rewritten.
    pub fn set_lan(&self, lan: &LanAddress) -> bool {
        let dnsmasq = DnsmasqConf::new(&self.paths);
        let bluetooth = BluetoothScript::new(&self.paths);

        let dnsmasq_ok = self.file_locks.with_lock(dnsmasq.path(), || dnsmasq.set_lan(lan));
        let bluetooth_ok = self
            .file_locks
            .with_lock(bluetooth.path(), || bluetooth.set_lan(lan));

        info!(
            "LAN set to {}: dnsmasq={}, bluetooth={}",
            lan, dnsmasq_ok, bluetooth_ok
        );
        dnsmasq_ok && bluetooth_ok
    }

    /// Keep dnsmasq's lease and pid files inside the data directory
    pub fn update_dnsmasq_paths(&self) -> bool {
        let conf = DnsmasqConf::new(&self.paths);
        self.file_locks
            .with_lock(conf.path(), || conf.update_file_paths(&self.paths))
    }
}

/// Single-quote `text` for `sh`
fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}
