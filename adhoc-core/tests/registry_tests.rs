//! Integration tests for process liveness checks
//!
//! Uses synthetic process tables laid out like /proc in a temp directory,
//! plus one check against the real process table.

use adhoc_core::process::ProcessRegistry;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn add_process(root: &Path, pid: u32, argv: &[&str]) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    let mut cmdline = Vec::new();
    for arg in argv {
        cmdline.extend_from_slice(arg.as_bytes());
        cmdline.push(0);
    }
    fs::write(dir.join("cmdline"), cmdline).unwrap();
}

fn remove_process(root: &Path, pid: u32) {
    fs::remove_dir_all(root.join(pid.to_string())).unwrap();
}

#[test]
fn test_detects_matching_process() {
    let root = tempdir().unwrap();
    add_process(root.path(), 1, &["/init"]);
    add_process(root.path(), 812, &["/data/bin/dnsmasq", "-C", "/data/conf/dnsmasq.conf"]);

    let registry = ProcessRegistry::new(root.path());
    assert!(registry.is_running("dnsmasq"));
    assert!(!registry.is_running("wpa_supplicant"));
}

#[test]
fn test_only_first_token_is_matched() {
    let root = tempdir().unwrap();
    add_process(root.path(), 40, &["/system/bin/logwrapper", "dnsmasq"]);

    let registry = ProcessRegistry::new(root.path());
    assert!(!registry.is_running("dnsmasq"));
    assert!(registry.is_running("logwrapper"));
}

#[test]
fn test_exited_process_is_not_reported() {
    let root = tempdir().unwrap();
    add_process(root.path(), 1, &["/init"]);
    add_process(root.path(), 2200, &["dnsmasq"]);

    let registry = ProcessRegistry::new(root.path());
    assert!(registry.is_running("dnsmasq"));
    assert_eq!(registry.snapshot().len(), 2);

    remove_process(root.path(), 2200);

    assert!(!registry.is_running("dnsmasq"));
    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.cmdline("2200"), None);
}

#[test]
fn test_new_process_is_picked_up() {
    let root = tempdir().unwrap();
    add_process(root.path(), 1, &["/init"]);

    let registry = ProcessRegistry::new(root.path());
    assert!(!registry.is_running("wpa_supplicant"));

    add_process(root.path(), 3001, &["wpa_supplicant", "-iwlan0"]);
    assert!(registry.is_running("wpa_supplicant"));
    assert_eq!(registry.matching_pids("wpa_supplicant"), vec![3001]);
}

#[test]
fn test_substring_match_reports_shared_names() {
    let root = tempdir().unwrap();
    add_process(root.path(), 10, &["/data/bin/iwconfig"]);

    let registry = ProcessRegistry::new(root.path());
    // "iw" is a fragment of another daemon's name; substring matching accepts it
    assert!(registry.is_running("iw"));
}

#[test]
fn test_unlistable_process_directory() {
    let root = tempdir().unwrap();
    let registry = ProcessRegistry::new(root.path().join("does-not-exist"));

    assert!(!registry.is_running("dnsmasq"));
    assert!(registry.matching_pids("dnsmasq").is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn test_real_process_table_contains_this_test() {
    let registry = ProcessRegistry::default();
    let me = std::process::id().to_string();

    assert!(registry.rescan().cmdline(&me).is_some());
    assert!(!registry.is_running("no-such-daemon-name-7f3a"));
}
