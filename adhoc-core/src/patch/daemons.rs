//! Per-daemon config files
//!
//! Thin handles binding each daemon's file to its dialect and patch strategy.
//! None of them serialize access; the [`crate::Supervisor`] holds a per-file
//! lock around every read-modify-write.

use crate::config::DataPaths;
use crate::files::line_file;
use crate::patch::strategy::{
    patch_key_values, patch_marker_line, patch_token_after, LanAddress, LineSignature,
};
use crate::patch::table::{ConfigTable, Dialect};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Marker of the dnsmasq DHCP range line
pub const DHCP_RANGE_MARKER: &str = "dhcp-range";

/// The bnep0 address line in `bin/blue-up.sh`
pub const BNEP_SIGNATURE: LineSignature<'static> = LineSignature {
    contains: "ifconfig bnep0",
    suffix: "netmask 255.255.255.0 up >> $adhoclog 2>> $adhoclog",
};

/// Interface token the gateway address follows
pub const BNEP_INTERFACE: &str = "bnep0";

fn read_table(path: &Path, dialect: &Dialect) -> ConfigTable {
    ConfigTable::parse(&line_file::read_lines(path), dialect)
}

/// `conf/wpa_supplicant.conf`
#[derive(Debug, Clone)]
pub struct WpaSupplicantConf {
    path: PathBuf,
}

impl WpaSupplicantConf {
    pub fn new(paths: &DataPaths) -> Self {
        Self {
            path: paths.wpa_supplicant_conf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists and can be read
    pub fn exists(&self) -> bool {
        self.path.is_file() && fs::File::open(&self.path).is_ok()
    }

    /// Delete the file; `false` if it did not exist or could not be removed
    pub fn remove(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot remove {:?}: {}", self.path, e);
                false
            }
        }
    }

    /// Entries with a non-empty key and value; `None` if the file is absent
    pub fn get(&self) -> Option<BTreeMap<String, String>> {
        if !self.path.exists() {
            return None;
        }
        let mut entries = read_table(&self.path, &Dialect::WPA_SUPPLICANT).to_map();
        entries.retain(|_, value| !value.is_empty());
        Some(entries)
    }

    /// Every key in the file, including those with empty values
    pub fn keys(&self) -> BTreeSet<String> {
        read_table(&self.path, &Dialect::WPA_SUPPLICANT).keys()
    }

    /// Update existing keys, then make the file world-readable
    pub fn write(&self, updates: &HashMap<String, String>) -> bool {
        if !patch_key_values(&self.path, &Dialect::WPA_SUPPLICANT, updates) {
            return false;
        }
        if !line_file::set_permissions(&self.path, 0o644) {
            warn!("Could not chmod 0644 {:?}", self.path);
        }
        true
    }
}

/// `conf/tiwlan.ini`
#[derive(Debug, Clone)]
pub struct TiWlanConf {
    path: PathBuf,
}

impl TiWlanConf {
    pub fn new(paths: &DataPaths) -> Self {
        Self {
            path: paths.tiwlan_ini(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> BTreeMap<String, String> {
        let mut entries = read_table(&self.path, &Dialect::TIWLAN).to_map();
        entries.retain(|_, value| !value.is_empty());
        entries
    }

    /// Every key in the file, including those with empty values
    pub fn keys(&self) -> BTreeSet<String> {
        read_table(&self.path, &Dialect::TIWLAN).keys()
    }

    pub fn write(&self, updates: &HashMap<String, String>) -> bool {
        patch_key_values(&self.path, &Dialect::TIWLAN, updates)
    }

    pub fn write_one(&self, name: &str, value: &str) -> bool {
        let mut updates = HashMap::new();
        updates.insert(name.to_string(), value.to_string());
        self.write(&updates)
    }
}

/// `conf/adhoc.conf`, the application's own settings
///
/// Unlike the daemon configs, new keys are appended on write.
#[derive(Debug, Clone)]
pub struct AdhocConf {
    path: PathBuf,
}

impl AdhocConf {
    pub fn new(paths: &DataPaths) -> Self {
        Self {
            path: paths.adhoc_conf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All settings; comment lines are skipped and empty values kept
    pub fn read(&self) -> BTreeMap<String, String> {
        read_table(&self.path, &Dialect::ADHOC).to_map()
    }

    /// Update existing keys in place and append the rest
    pub fn write(&self, values: &BTreeMap<String, String>) -> bool {
        let mut table = read_table(&self.path, &Dialect::ADHOC);
        let updates: HashMap<&str, &str> = values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        table.set_existing(&updates);

        for (key, value) in values {
            if !table.contains_key(key) {
                debug!("Appending {} to {:?}", key, self.path);
                table.push(key, value, &Dialect::ADHOC);
            }
        }

        line_file::write_lines(&self.path, &table.render())
    }
}

/// `conf/dnsmasq.conf`
#[derive(Debug, Clone)]
pub struct DnsmasqConf {
    path: PathBuf,
}

impl DnsmasqConf {
    pub fn new(paths: &DataPaths) -> Self {
        Self {
            path: paths.dnsmasq_conf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the DHCP range at `.100`–`.105` of the LAN's /24
    pub fn set_lan(&self, lan: &LanAddress) -> bool {
        let written = patch_marker_line(
            &self.path,
            &Dialect::DNSMASQ,
            DHCP_RANGE_MARKER,
            &lan.dhcp_range_line(),
        );
        if !written {
            warn!("Unable to update {:?} with new lan-configuration", self.path);
        }
        written
    }

    /// Move the lease and pid files into `paths` if they point elsewhere
    ///
    /// The file is only rewritten when something changed.
    pub fn update_file_paths(&self, paths: &DataPaths) -> bool {
        let root = paths.root().to_string_lossy().to_string();
        let mut table = read_table(&self.path, &Dialect::DNSMASQ);

        let wanted = [
            ("dhcp-leasefile", paths.dnsmasq_leases()),
            ("pid-file", paths.dnsmasq_pid()),
        ];

        let mut changed = 0;
        for (key, target) in &wanted {
            changed += table.set_unless(key, &target.to_string_lossy(), |current| {
                current.contains(root.as_str())
            });
        }

        if changed == 0 {
            return true;
        }
        debug!("Rewriting {} dnsmasq path line(s) in {:?}", changed, self.path);
        line_file::write_lines(&self.path, &table.render())
    }
}

/// `bin/blue-up.sh`, the Bluetooth PAN bring-up script
#[derive(Debug, Clone)]
pub struct BluetoothScript {
    path: PathBuf,
}

impl BluetoothScript {
    pub fn new(paths: &DataPaths) -> Self {
        Self {
            path: paths.blue_up_script(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the bnep0 interface address to the LAN gateway
    pub fn set_lan(&self, lan: &LanAddress) -> bool {
        let written = patch_token_after(&self.path, &BNEP_SIGNATURE, BNEP_INTERFACE, &lan.gateway());
        if !written {
            warn!("Unable to update {:?} with new lan-configuration", self.path);
        }
        written
    }
}
