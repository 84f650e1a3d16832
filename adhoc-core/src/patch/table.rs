//! Structured view of a line-oriented config file
//!
//! A file is a sequence of [`ConfigLine`]s. Lines that look like `key=value`
//! (with any whitespace around the `=`) become [`ConfigLine::KeyValue`] and
//! remember their exact separator; everything else, including comments, is
//! [`ConfigLine::Raw`]. Rendering an untouched table gives back the input
//! lines exactly.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-format quirks of a key-value config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Lines starting with one of these are never parsed as entries
    pub comment_prefixes: &'static [&'static str],

    /// Separator used when a new entry is appended
    pub separator: &'static str,
}

impl Dialect {
    /// `conf/wpa_supplicant.conf`
    pub const WPA_SUPPLICANT: Dialect = Dialect {
        comment_prefixes: &["#"],
        separator: "=",
    };

    /// `conf/tiwlan.ini`
    pub const TIWLAN: Dialect = Dialect {
        comment_prefixes: &["#", ";"],
        separator: " = ",
    };

    /// `conf/dnsmasq.conf`
    pub const DNSMASQ: Dialect = Dialect {
        comment_prefixes: &["#"],
        separator: "=",
    };

    /// `conf/adhoc.conf`
    pub const ADHOC: Dialect = Dialect {
        comment_prefixes: &["#"],
        separator: "=",
    };

    pub fn is_comment(&self, line: &str) -> bool {
        self.comment_prefixes
            .iter()
            .any(|prefix| line.starts_with(*prefix))
    }
}

/// One line of a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLine {
    /// Comment, blank or otherwise unstructured line, kept verbatim
    Raw(String),

    /// `key<separator>value`, where `separator` is the original text
    /// between the two (e.g. `=` or ` = `)
    KeyValue {
        key: String,
        separator: String,
        value: String,
    },
}

impl ConfigLine {
    /// Parse a single trimmed line
    pub fn parse(line: &str, dialect: &Dialect) -> Self {
        if dialect.is_comment(line) {
            return ConfigLine::Raw(line.to_string());
        }

        let Some(eq) = line.find('=') else {
            return ConfigLine::Raw(line.to_string());
        };

        let key = line[..eq].trim_end();
        if key.is_empty() {
            return ConfigLine::Raw(line.to_string());
        }

        let value = line[eq + 1..].trim_start();
        let separator = &line[key.len()..line.len() - value.len()];

        ConfigLine::KeyValue {
            key: key.to_string(),
            separator: separator.to_string(),
            value: value.to_string(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigLine::KeyValue { key, .. } => Some(key),
            ConfigLine::Raw(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            ConfigLine::Raw(text) => text.clone(),
            ConfigLine::KeyValue {
                key,
                separator,
                value,
            } => format!("{}{}{}", key, separator, value),
        }
    }
}

/// Ordered lines of one config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTable {
    lines: Vec<ConfigLine>,
}

impl ConfigTable {
    pub fn parse<S: AsRef<str>>(lines: &[S], dialect: &Dialect) -> Self {
        Self {
            lines: lines
                .iter()
                .map(|line| ConfigLine::parse(line.as_ref(), dialect))
                .collect(),
        }
    }

    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Value of the first entry named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            ConfigLine::KeyValue { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// All entries in file order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            ConfigLine::KeyValue { key, value, .. } => Some((key.as_str(), value.as_str())),
            ConfigLine::Raw(_) => None,
        })
    }

    /// Entries as a map; later duplicates win, as when reading top to bottom
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lines.iter().any(|line| line.key() == Some(key))
    }

    /// Replace the value of every entry whose key is in `updates`
    ///
    /// Keys that do not occur in the table are ignored. Returns the number
    /// of lines whose text changed.
    pub fn set_existing<K, V>(&mut self, updates: &HashMap<K, V>) -> usize
    where
        K: std::borrow::Borrow<str> + std::hash::Hash + Eq,
        V: AsRef<str>,
    {
        let mut changed = 0;
        for line in &mut self.lines {
            if let ConfigLine::KeyValue { key, value, .. } = line {
                if let Some(new_value) = updates.get(key.as_str()) {
                    if value.as_str() != new_value.as_ref() {
                        *value = new_value.as_ref().to_string();
                        changed += 1;
                    }
                }
            }
        }
        changed
    }

    /// Set every entry named `key` whose current value fails `keep`
    ///
    /// Each line is judged on its own value. Returns lines changed.
    pub fn set_unless(&mut self, key: &str, new_value: &str, keep: impl Fn(&str) -> bool) -> usize {
        let mut changed = 0;
        for line in &mut self.lines {
            if let ConfigLine::KeyValue { key: k, value, .. } = line {
                if k.as_str() == key && !keep(value.as_str()) && value.as_str() != new_value {
                    *value = new_value.to_string();
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Keys of every entry, including those with empty values
    pub fn keys(&self) -> BTreeSet<String> {
        self.lines
            .iter()
            .filter_map(ConfigLine::key)
            .map(str::to_string)
            .collect()
    }

    /// Append a new entry using the dialect's separator
    pub fn push(&mut self, key: &str, value: &str, dialect: &Dialect) {
        self.lines.push(ConfigLine::KeyValue {
            key: key.to_string(),
            separator: dialect.separator.to_string(),
            value: value.to_string(),
        });
    }

    /// Replace a whole line
    pub fn replace_line(&mut self, index: usize, line: ConfigLine) {
        if let Some(slot) = self.lines.get_mut(index) {
            *slot = line;
        }
    }

    pub fn render(&self) -> Vec<String> {
        self.lines.iter().map(ConfigLine::render).collect()
    }
}
