//! Config file commands: get/set for the key=value files, lan, dnsmasq-paths

use std::collections::{BTreeMap, HashMap};

use adhoc_core::error::{AdhocError, PatchError};
use adhoc_core::patch::LanAddress;
use adhoc_core::Supervisor;
use colored::Colorize;

/// The key=value files exposed through `get` and `set`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfFile {
    Supplicant,
    TiWlan,
    Adhoc,
}

impl ConfFile {
    fn label(self) -> &'static str {
        match self {
            ConfFile::Supplicant => "wpa_supplicant.conf",
            ConfFile::TiWlan => "tiwlan.ini",
            ConfFile::Adhoc => "adhoc.conf",
        }
    }

    fn read(self, supervisor: &Supervisor) -> Option<BTreeMap<String, String>> {
        match self {
            ConfFile::Supplicant => supervisor.supplicant_settings(),
            ConfFile::TiWlan => Some(supervisor.tiwlan_settings()),
            ConfFile::Adhoc => Some(supervisor.adhoc_settings()),
        }
    }
}

/// Split `KEY=VALUE` at the first `=`; the key must be non-empty
pub fn parse_assignment(input: &str) -> Result<(String, String), PatchError> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(PatchError::InvalidAssignment {
            input: input.to_string(),
        }),
    }
}

pub fn run_get(supervisor: &Supervisor, file: ConfFile, json: bool) -> Result<i32, AdhocError> {
    let Some(values) = file.read(supervisor) else {
        eprintln!("{} {} does not exist", "✗".red(), file.label());
        return Ok(1);
    };

    if json {
        let rendered = serde_json::to_string_pretty(&values).map_err(std::io::Error::other)?;
        println!("{}", rendered);
    } else {
        for (key, value) in &values {
            println!("{} = {}", key.cyan(), value);
        }
    }
    Ok(0)
}

pub fn run_set(
    supervisor: &Supervisor,
    file: ConfFile,
    assignments: &[String],
) -> Result<i32, AdhocError> {
    let parsed = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>, _>>()?;

    let written = match file {
        ConfFile::Adhoc => {
            let values: BTreeMap<String, String> = parsed.into_iter().collect();
            supervisor.save_adhoc_settings(&values)
        }
        ConfFile::Supplicant | ConfFile::TiWlan => {
            // These files are patched in place; keys they lack are dropped
            let existing = if file == ConfFile::Supplicant {
                supervisor.supplicant_keys()
            } else {
                supervisor.tiwlan_keys()
            };
            for (key, _) in parsed.iter().filter(|(k, _)| !existing.contains(k)) {
                println!("{} {} not in {}, ignored", "⚠".yellow(), key, file.label());
            }

            let updates: HashMap<String, String> = parsed.into_iter().collect();
            if file == ConfFile::Supplicant {
                supervisor.update_supplicant(&updates)
            } else {
                supervisor.update_tiwlan(&updates)
            }
        }
    };

    if written {
        println!("{} Updated {}", "✓".green(), file.label());
        Ok(0)
    } else {
        eprintln!("{} Could not write {}", "✗".red(), file.label());
        Ok(1)
    }
}

pub fn run_lan(supervisor: &Supervisor, address: &str) -> Result<i32, AdhocError> {
    let lan: LanAddress = address.parse()?;

    if supervisor.set_lan(&lan) {
        println!("{} DHCP range {}", "✓".green(), lan.dhcp_range());
        println!("{} Bluetooth gateway {}", "✓".green(), lan.gateway());
        Ok(0)
    } else {
        eprintln!(
            "{} LAN address {} was not applied to every file",
            "✗".red(),
            lan
        );
        Ok(1)
    }
}

pub fn run_dnsmasq_paths(supervisor: &Supervisor) -> Result<i32, AdhocError> {
    if supervisor.update_dnsmasq_paths() {
        println!(
            "{} dnsmasq files under {}",
            "✓".green(),
            supervisor.paths().root().display()
        );
        Ok(0)
    } else {
        eprintln!("{} Could not update dnsmasq.conf", "✗".red());
        Ok(1)
    }
}
