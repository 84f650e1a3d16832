//! Integration tests for the privilege gate
//!
//! The verdict must be computed once and reused: the probe double counts how
//! often it is asked.

use adhoc_core::command::{
    CommandRunner, ElevationProbe, PrivilegeGate, PrivilegeVerdict,
};
use adhoc_core::error::CommandError;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

#[derive(Default)]
struct CountingProbe {
    calls: AtomicUsize,
}

impl ElevationProbe for CountingProbe {
    fn elevation_available(&self) -> bool {
        true
    }

    fn probe(&self) -> Result<i32, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

struct FailingSpawnProbe;

impl ElevationProbe for FailingSpawnProbe {
    fn elevation_available(&self) -> bool {
        true
    }

    fn probe(&self) -> Result<i32, CommandError> {
        Err(CommandError::Spawn {
            program: "/system/bin/su".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }
}

#[test]
fn test_second_call_does_not_probe_again() {
    let gate = PrivilegeGate::new(CountingProbe::default());

    assert!(gate.has_privilege());
    assert!(gate.has_privilege());
    assert_eq!(gate.probe().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_spawn_failure_is_a_cached_denial() {
    let gate = PrivilegeGate::new(FailingSpawnProbe);

    assert!(!gate.has_privilege());
    assert_eq!(gate.verdict(), PrivilegeVerdict::Denied);
    assert!(!gate.has_privilege());
}

#[test]
fn test_concurrent_first_callers_probe_once() {
    let gate = Arc::new(PrivilegeGate::new(CountingProbe::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || gate.has_privilege())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(gate.probe().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_process_wide_verdict_is_shared() {
    let first = PrivilegeGate::process_wide(CountingProbe::default());
    assert!(first.has_privilege());

    let second = PrivilegeGate::process_wide(CountingProbe::default());
    assert_eq!(second.verdict(), PrivilegeVerdict::Granted);
    assert!(second.has_privilege());
    assert_eq!(second.probe().calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_runner_probe_retries_until_su_succeeds() {
    let dir = tempdir().unwrap();
    let counter = dir.path().join("attempts");
    let su = dir.path().join("su");
    // Fails twice, as if the user had not yet answered the prompt
    fs::write(
        &su,
        format!(
            "#!/bin/sh\necho x >> '{0}'\n[ $(wc -l < '{0}') -ge 3 ] || exit 1\nshift\nexec /bin/sh -c \"$1\"\n",
            counter.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&su, fs::Permissions::from_mode(0o755)).unwrap();

    let runner = CommandRunner::new("/bin/sh", vec![su], dir.path().join("sucmd"));
    let gate = PrivilegeGate::new(runner).with_probe_interval(Duration::from_millis(10));

    assert!(gate.has_privilege());
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 3);

    assert!(gate.has_privilege());
    assert_eq!(fs::read_to_string(&counter).unwrap().lines().count(), 3);
}
