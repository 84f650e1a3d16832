//! Integration tests for the supervisor over a complete data directory
//!
//! Lays out conf/, bin/ and a synthetic process table in a temp directory
//! and drives the config files and process checks end to end.

use adhoc_core::config::Settings;
use adhoc_core::patch::LanAddress;
use adhoc_core::Supervisor;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

fn data_dir() -> (TempDir, Settings) {
    let dir = tempdir().unwrap();
    for sub in ["conf", "bin", "var", "proc"] {
        fs::create_dir_all(dir.path().join(sub)).unwrap();
    }

    let mut settings = Settings::default();
    settings.paths.data_dir = dir.path().to_path_buf();
    settings.paths.proc_root = dir.path().join("proc");
    settings.shell.shell = PathBuf::from("/bin/sh");
    settings.shell.elevation_candidates = vec![dir.path().join("no-su")];
    (dir, settings)
}

fn write(root: &Path, relative: &str, content: &str) {
    fs::write(root.join(relative), content).unwrap();
}

fn read(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}

#[test]
fn test_set_lan_rewrites_dnsmasq_and_bluetooth() {
    let (dir, settings) = data_dir();
    write(
        dir.path(),
        "conf/dnsmasq.conf",
        "domain-needed\ndhcp-range=192.168.2.100,192.168.2.105,12h\n",
    );
    write(
        dir.path(),
        "bin/blue-up.sh",
        "#!/system/bin/sh\nifconfig bnep0 192.168.2.254 netmask 255.255.255.0 up >> $adhoclog 2>> $adhoclog\n",
    );

    let supervisor = Supervisor::with_private_verdict(&settings);
    let lan: LanAddress = "10.130.1.1".parse().unwrap();
    assert!(supervisor.set_lan(&lan));

    assert_eq!(
        read(dir.path(), "conf/dnsmasq.conf"),
        "domain-needed\ndhcp-range=10.130.1.100,10.130.1.105,12h\n"
    );
    assert_eq!(
        read(dir.path(), "bin/blue-up.sh"),
        "#!/system/bin/sh\nifconfig bnep0 10.130.1.1 netmask 255.255.255.0 up >> $adhoclog 2>> $adhoclog\n"
    );
}

#[test]
fn test_set_lan_reports_partial_failure() {
    let (dir, settings) = data_dir();
    write(dir.path(), "conf/dnsmasq.conf", "dhcp-range=x\n");
    fs::remove_dir_all(dir.path().join("bin")).unwrap();

    let supervisor = Supervisor::with_private_verdict(&settings);
    assert!(!supervisor.set_lan(&"10.0.0.1".parse().unwrap()));
    // dnsmasq was still rewritten
    assert_eq!(
        read(dir.path(), "conf/dnsmasq.conf"),
        "dhcp-range=10.0.0.100,10.0.0.105,12h\n"
    );
}

#[test]
fn test_supplicant_settings() {
    let (dir, settings) = data_dir();
    let supervisor = Supervisor::with_private_verdict(&settings);
    assert!(supervisor.supplicant_settings().is_none());

    write(
        dir.path(),
        "conf/wpa_supplicant.conf",
        "ctrl_interface=/data/wpa\nnetwork={\n\tssid=\"mesh\"\n\tpsk=\n}\n",
    );

    let mut updates = HashMap::new();
    updates.insert("ssid".to_string(), "\"serval\"".to_string());
    assert!(supervisor.update_supplicant(&updates));

    let current = supervisor.supplicant_settings().unwrap();
    assert_eq!(current.get("ssid").map(String::as_str), Some("\"serval\""));
    assert_eq!(current.get("network").map(String::as_str), Some("{"));
    assert!(!current.contains_key("psk"));

    assert!(supervisor.remove_supplicant());
    assert!(supervisor.supplicant_settings().is_none());
}

#[test]
fn test_concurrent_updates_to_one_file_are_not_lost() {
    let (dir, settings) = data_dir();
    let keys: Vec<String> = (0..16).map(|i| format!("key{}", i)).collect();
    let initial: String = keys.iter().map(|k| format!("{}=old\n", k)).collect();
    write(dir.path(), "conf/adhoc.conf", &initial);

    let supervisor = Arc::new(Supervisor::with_private_verdict(&settings));
    let handles: Vec<_> = keys
        .iter()
        .cloned()
        .map(|key| {
            let supervisor = Arc::clone(&supervisor);
            std::thread::spawn(move || {
                let mut values = BTreeMap::new();
                values.insert(key, "new".to_string());
                supervisor.save_adhoc_settings(&values)
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let saved = supervisor.adhoc_settings();
    assert_eq!(saved.len(), keys.len());
    assert!(saved.values().all(|v| v == "new"));
}

#[test]
fn test_tiwlan_through_supervisor() {
    let (dir, settings) = data_dir();
    write(dir.path(), "conf/tiwlan.ini", "WiFiAdhoc = 0\nTxPower = 12\n");

    let supervisor = Supervisor::with_private_verdict(&settings);
    let mut updates = HashMap::new();
    updates.insert("WiFiAdhoc".to_string(), "1".to_string());
    assert!(supervisor.update_tiwlan(&updates));

    let current = supervisor.tiwlan_settings();
    assert_eq!(current.get("WiFiAdhoc").map(String::as_str), Some("1"));
    assert_eq!(current.get("TxPower").map(String::as_str), Some("12"));
}

#[test]
fn test_dnsmasq_paths_follow_data_dir() {
    let (dir, settings) = data_dir();
    write(
        dir.path(),
        "conf/dnsmasq.conf",
        "dhcp-leasefile=/data/data/old/var/dnsmasq.leases\n",
    );

    let supervisor = Supervisor::with_private_verdict(&settings);
    assert!(supervisor.update_dnsmasq_paths());
    assert_eq!(
        read(dir.path(), "conf/dnsmasq.conf"),
        format!("dhcp-leasefile={}/var/dnsmasq.leases\n", dir.path().display())
    );
}

#[test]
fn test_liveness_through_supervisor() {
    let (dir, settings) = data_dir();
    let pid_dir = dir.path().join("proc").join("4242");
    fs::create_dir_all(&pid_dir).unwrap();
    fs::write(pid_dir.join("cmdline"), b"/data/bin/dnsmasq\0-k\0").unwrap();

    let supervisor = Supervisor::with_private_verdict(&settings);
    assert!(supervisor.is_running("dnsmasq"));

    fs::remove_dir_all(&pid_dir).unwrap();
    assert!(!supervisor.is_running("dnsmasq"));
}

#[test]
fn test_kill_signals_matching_process() {
    let (dir, settings) = data_dir();
    let mut child = std::process::Command::new("sleep")
        .arg("30")
        .spawn()
        .unwrap();

    // Register the child under a daemon-like name in the synthetic table
    let pid_dir = dir.path().join("proc").join(child.id().to_string());
    fs::create_dir_all(&pid_dir).unwrap();
    fs::write(pid_dir.join("cmdline"), b"fake-dnsmasq\0").unwrap();

    let supervisor = Supervisor::with_private_verdict(&settings);
    assert!(supervisor.kill_process("fake-dnsmasq", false).unwrap());

    let status = child.wait().unwrap();
    assert!(!status.success());
}

#[test]
fn test_run_command_exit_codes() {
    let (_dir, settings) = data_dir();
    let supervisor = Supervisor::with_private_verdict(&settings);

    assert_eq!(supervisor.run_command("exit 0").unwrap(), 0);
    assert_eq!(supervisor.run("exit 7", false, true).unwrap(), 7);
    assert!(supervisor.run("true", true, true).is_err());
}
