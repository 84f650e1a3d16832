//! The three rewrite strategies
//!
//! Each strategy reads the whole file, edits the parsed lines in memory and
//! writes the whole file back. The boolean result is the result of that final
//! write: `true` means the complete file was rewritten, `false` means nothing
//! was persisted.

use crate::error::PatchError;
use crate::files::line_file;
use crate::patch::table::{ConfigLine, ConfigTable, Dialect};
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Replace the values of existing keys
///
/// Keys missing from the file are dropped, never appended.
pub fn patch_key_values<P: AsRef<Path>>(
    path: P,
    dialect: &Dialect,
    updates: &HashMap<String, String>,
) -> bool {
    let path = path.as_ref();
    let mut table = ConfigTable::parse(&line_file::read_lines(path), dialect);
    let changed = table.set_existing(updates);
    debug!(
        "Patching {:?}: {} of {} requested key(s) changed a line",
        path,
        changed,
        updates.len()
    );
    line_file::write_lines(path, &table.render())
}

/// Replace the first non-comment line containing `marker` with `replacement`
pub fn patch_marker_line<P: AsRef<Path>>(
    path: P,
    dialect: &Dialect,
    marker: &str,
    replacement: &str,
) -> bool {
    let path = path.as_ref();
    let lines = line_file::read_lines(path);
    let mut table = ConfigTable::parse(&lines, dialect);

    let position = lines
        .iter()
        .position(|line| !dialect.is_comment(line) && line.contains(marker));
    match position {
        Some(index) => {
            table.replace_line(index, ConfigLine::parse(replacement, dialect));
            info!("Replaced {:?} line {} of {:?}", marker, index + 1, path);
        }
        None => debug!("No {:?} line in {:?}", marker, path),
    }

    line_file::write_lines(path, &table.render())
}

/// Identifies the line a positional patch applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSignature<'a> {
    /// Text the line must contain
    pub contains: &'a str,

    /// Text the line must end with
    pub suffix: &'a str,
}

impl LineSignature<'_> {
    pub fn matches(&self, line: &str) -> bool {
        line.contains(self.contains) && line.ends_with(self.suffix)
    }
}

/// Replace the whitespace-separated token following the first `marker` token
///
/// Tokens are re-joined with single spaces. Returns `None` when `marker` does
/// not occur as a token or is the last token.
pub fn replace_token_after(line: &str, marker: &str, value: &str) -> Option<String> {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    let at = tokens.iter().position(|token| *token == marker)?;
    let slot = tokens.get_mut(at + 1)?;
    *slot = value;
    Some(tokens.join(" "))
}

/// Replace the token after `marker` on the first line matching `signature`
pub fn patch_token_after<P: AsRef<Path>>(
    path: P,
    signature: &LineSignature<'_>,
    marker: &str,
    value: &str,
) -> bool {
    let path = path.as_ref();
    let mut lines = line_file::read_lines(path);

    match lines.iter().position(|line| signature.matches(line)) {
        Some(index) => match replace_token_after(&lines[index], marker, value) {
            Some(rewritten) => {
                info!("Set token after {:?} to {:?} in {:?}", marker, value, path);
                lines[index] = rewritten;
            }
            None => debug!("Line {} of {:?} has no token after {:?}", index + 1, path, marker),
        },
        None => debug!("No line matching {:?} in {:?}", signature, path),
    }

    line_file::write_lines(path, &lines)
}

/// A LAN address such as `192.168.1.1` or `192.168.1.0/24`
///
/// Any prefix length is accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanAddress {
    octets: [u8; 4],
}

impl LanAddress {
    pub fn octets(&self) -> [u8; 4] {
        self.octets
    }

    fn network_prefix(&self) -> String {
        let [a, b, c, _] = self.octets;
        format!("{}.{}.{}", a, b, c)
    }

    /// dnsmasq range value: `.100` to `.105` of the /24, 12 hour leases
    pub fn dhcp_range(&self) -> String {
        let prefix = self.network_prefix();
        format!("{0}.100,{0}.105,12h", prefix)
    }

    /// Complete `dhcp-range=` line
    pub fn dhcp_range_line(&self) -> String {
        format!("dhcp-range={}", self.dhcp_range())
    }

    /// Gateway address: the address itself
    pub fn gateway(&self) -> String {
        Ipv4Addr::from(self.octets).to_string()
    }
}

impl FromStr for LanAddress {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let address = match trimmed.split_once('/') {
            Some((address, prefix_len)) => {
                if prefix_len.parse::<u8>().map_or(true, |len| len > 32) {
                    return Err(PatchError::InvalidLanAddress {
                        address: s.to_string(),
                    });
                }
                address
            }
            None => trimmed,
        };

        let parsed = Ipv4Addr::from_str(address).map_err(|_| PatchError::InvalidLanAddress {
            address: s.to_string(),
        })?;
        Ok(Self {
            octets: parsed.octets(),
        })
    }
}

impl fmt::Display for LanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv4Addr::from(self.octets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lan_address_parse() {
        let lan: LanAddress = "192.168.1.1".parse().unwrap();
        assert_eq!(lan.octets(), [192, 168, 1, 1]);

        let lan: LanAddress = "10.130.1.0/24".parse().unwrap();
        assert_eq!(lan.gateway(), "10.130.1.0");

        for bad in ["", "192.168.1", "192.168.1.300", "a.b.c.d", "10.0.0.1/33", "10.0.0.1/"] {
            assert!(bad.parse::<LanAddress>().is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_dhcp_range() {
        let lan: LanAddress = "192.168.1.1".parse().unwrap();
        assert_eq!(
            lan.dhcp_range_line(),
            "dhcp-range=192.168.1.100,192.168.1.105,12h"
        );
    }

    #[test]
    fn test_replace_token_after() {
        assert_eq!(
            replace_token_after(
                "ifconfig bnep0 192.168.2.254 netmask 255.255.255.0 up",
                "bnep0",
                "10.0.0.1"
            ),
            Some("ifconfig bnep0 10.0.0.1 netmask 255.255.255.0 up".to_string())
        );
        assert_eq!(
            replace_token_after("a  bnep0   x  bnep0 y", "bnep0", "z"),
            Some("a bnep0 z bnep0 y".to_string())
        );
        assert_eq!(replace_token_after("ifconfig bnep0", "bnep0", "z"), None);
        assert_eq!(replace_token_after("ifconfig eth0 up", "bnep0", "z"), None);
    }

    #[test]
    fn test_signature() {
        let signature = LineSignature {
            contains: "ifconfig bnep0",
            suffix: "up",
        };
        assert!(signature.matches("ifconfig bnep0 1.2.3.4 up"));
        assert!(!signature.matches("ifconfig bnep0 1.2.3.4 down"));
        assert!(!signature.matches("ifconfig eth0 up"));
    }
}
