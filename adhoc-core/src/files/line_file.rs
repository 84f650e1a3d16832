//! Line-oriented file reads and writes
//!
//! Every I/O failure here is logged and folded into an empty result or a
//! `false` return: callers treat an unreadable config exactly like an absent
//! one and carry on.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

/// Read all lines of a file, each trimmed of surrounding whitespace
///
/// Returns an empty vector if the file is absent or unreadable.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open {:?} for reading: {}", path, e);
            return Vec::new();
        }
    };

    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        match line {
            Ok(line) => lines.push(line.trim().to_string()),
            Err(e) => {
                debug!("Read of {:?} stopped early: {}", path, e);
                break;
            }
        }
    }
    lines
}

/// Overwrite a file in place with `content`
///
/// This is a destructive full overwrite; the caller must already hold the
/// complete desired content.
pub fn write<P: AsRef<Path>>(path: P, content: &str) -> bool {
    let path = path.as_ref();
    debug!("Writing {} bytes to file: {:?}", content.len(), path);

    let result = fs::File::create(path).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.flush()
    });

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Write to {:?} failed: {}", path, e);
            false
        }
    }
}

/// Overwrite a file with `lines`, each terminated by a newline
pub fn write_lines<P, S>(path: P, lines: &[S]) -> bool
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    write(path, &content)
}

/// Set the permission bits of a file, `chmod`-style
pub fn set_permissions<P: AsRef<Path>>(path: P, mode: u32) -> bool {
    let path = path.as_ref();
    match fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        Ok(()) => true,
        Err(e) => {
            debug!("chmod {:o} {:?} failed: {}", mode, path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_lines(dir.path().join("nope.conf")).is_empty());
    }

    #[test]
    fn test_read_trims_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.conf");
        fs::write(&path, "  ssid=mesh  \n\tchannel = 6\n\n").unwrap();

        assert_eq!(read_lines(&path), vec!["ssid=mesh", "channel = 6", ""]);
    }

    #[test]
    fn test_write_lines_terminates_each_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("b.conf");

        assert!(write_lines(&path, &["one", "two"]));
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        assert!(!write(dir.path().join("missing").join("c.conf"), "x"));
    }

    #[test]
    fn test_set_permissions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("script.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();

        assert!(set_permissions(&path, 0o755));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        assert!(!set_permissions(dir.path().join("absent"), 0o644));
    }
}
