//! Process liveness via process-table scans
//!
//! Every query rescans the numeric entries of the process directory and
//! replaces the previous snapshot wholesale, so exited processes never linger.
//! The previous snapshot is only a read cache for command lines.
//!
//! A pid can be recycled by an unrelated process between two scans. Cached
//! command lines are reused only when the entry's identity stamp (the
//! modification time of `/proc/<pid>`, which is fixed when the entry is
//! created) is unchanged. That narrows the pid-reuse window to processes
//! created within the timestamp granularity; it does not close it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, trace};

/// A cached process entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProcessEntry {
    cmdline: String,
    stamp: Option<SystemTime>,
}

/// Result of one process-table scan: pid → first command-line token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    entries: HashMap<String, ProcessEntry>,
}

impl ProcessSnapshot {
    /// Number of processes observed
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Command line recorded for `pid`, if it was seen in the scan
    pub fn cmdline(&self, pid: &str) -> Option<&str> {
        self.entries.get(pid).map(|entry| entry.cmdline.as_str())
    }

    /// Pids whose command line contains `name`
    pub fn matching(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.cmdline.contains(name))
            .map(|(pid, _)| pid.as_str())
            .collect()
    }
}

/// Tracks known pid → command-line mappings
#[derive(Debug)]
pub struct ProcessRegistry {
    proc_root: PathBuf,
    snapshot: Mutex<ProcessSnapshot>,
}

impl ProcessRegistry {
    /// Create a registry scanning `proc_root` (normally `/proc`)
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            snapshot: Mutex::new(ProcessSnapshot::default()),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Check whether any process command line contains `name`
    ///
    /// This is a substring match, so daemons sharing a name fragment will
    /// match each other.
    pub fn is_running(&self, name: &str) -> bool {
        let running = !self.rescan().matching(name).is_empty();
        debug!("Process matching {:?} running: {}", name, running);
        running
    }

    /// Pids of every process whose command line contains `name`
    pub fn matching_pids(&self, name: &str) -> Vec<u32> {
        let snapshot = self.rescan();
        let mut pids: Vec<u32> = snapshot
            .matching(name)
            .into_iter()
            .filter_map(|pid| pid.parse().ok())
            .collect();
        pids.sort_unstable();
        pids
    }

    /// Copy of the most recent snapshot
    pub fn snapshot(&self) -> ProcessSnapshot {
        self.lock_snapshot().clone()
    }

    /// Scan the process directory and replace the cached snapshot
    pub fn rescan(&self) -> ProcessSnapshot {
        let mut cached = self.lock_snapshot();
        let fresh = self.scan(&cached);
        *cached = fresh.clone();
        fresh
    }

    fn scan(&self, previous: &ProcessSnapshot) -> ProcessSnapshot {
        let dir = match fs::read_dir(&self.proc_root) {
            Ok(dir) => dir,
            Err(e) => {
                debug!("Cannot list {:?}: {}", self.proc_root, e);
                return ProcessSnapshot::default();
            }
        };

        let mut entries = HashMap::new();
        for dirent in dir.flatten() {
            let Some(pid) = dirent.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !is_pid(&pid) {
                continue;
            }

            let stamp = dirent.metadata().and_then(|m| m.modified()).ok();
            let cmdline = match previous.entries.get(&pid) {
                Some(known) if stamp.is_some() && known.stamp == stamp => known.cmdline.clone(),
                _ => read_cmdline(&dirent.path()),
            };
            trace!("pid {} -> {:?}", pid, cmdline);

            entries.insert(pid, ProcessEntry { cmdline, stamp });
        }

        ProcessSnapshot { entries }
    }

    fn lock_snapshot(&self) -> std::sync::MutexGuard<'_, ProcessSnapshot> {
        // A panic while holding the lock leaves at worst a stale cache, and
        // the next scan replaces it anyway.
        self.snapshot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new("/proc")
    }
}

fn is_pid(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// First NUL-separated token of `<process dir>/cmdline`, or "" if unreadable
fn read_cmdline(process_dir: &Path) -> String {
    match fs::read(process_dir.join("cmdline")) {
        Ok(bytes) => {
            let first = bytes.split(|b| *b == 0).next().unwrap_or_default();
            String::from_utf8_lossy(first).trim().to_string()
        }
        Err(_) => String::new(),
    }
}
