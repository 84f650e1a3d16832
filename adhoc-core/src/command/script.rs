//! The elevated-command script file
//!
//! Elevation binaries mangle long or heavily quoted `-c` arguments, so
//! elevated commands are written to a script and the script path is run
//! instead. There is one shared script file per data directory. Holding a
//! [`ScriptGuard`] is the only way to stage it, which serializes waited
//! elevated invocations within the process.
//!
//! A command that is not waited on gets a script of its own
//! ([`ElevatedScript::stage_detached`]), since the elevation binary may open
//! its script long after the caller has moved on.

use crate::error::CommandError;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Lock-guarded script location
#[derive(Debug)]
pub struct ElevatedScript {
    path: PathBuf,
    lock: Mutex<()>,
    detached: AtomicU64,
}

impl ElevatedScript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            detached: AtomicU64::new(0),
        }
    }

    /// Write `command` to a script named `<script>.<pid>.<n>` used by no
    /// other invocation
    ///
    /// The caller owns the returned file and removes it once the child has
    /// exited.
    pub fn stage_detached(&self, interpreter: &Path, command: &str) -> Result<PathBuf, CommandError> {
        let n = self.detached.fetch_add(1, Ordering::Relaxed);
        let target = suffixed(&self.path, &format!(".{}.{}", std::process::id(), n));
        write_script(&target, interpreter, command)?;
        Ok(target)
    }

    /// Acquire exclusive use of the script until the guard is dropped
    pub fn lock(&self) -> ScriptGuard<'_> {
        ScriptGuard {
            path: &self.path,
            _lock: self
                .lock
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        }
    }
}

/// Exclusive access to the script file
pub struct ScriptGuard<'a> {
    path: &'a Path,
    _lock: MutexGuard<'a, ()>,
}

impl<'a> ScriptGuard<'a> {
    pub fn path(&self) -> &Path {
        self.path
    }

    /// Write `command` behind a shebang for `interpreter` and mark it 0755
    ///
    /// The script is written beside its final location and renamed over it,
    /// so a shell still reading an earlier script keeps its own copy.
    pub fn stage(&self, interpreter: &Path, command: &str) -> Result<&'a Path, CommandError> {
        write_script(self.path, interpreter, command)?;
        Ok(self.path)
    }
}

fn write_script(target: &Path, interpreter: &Path, command: &str) -> Result<(), CommandError> {
    let staging = suffixed(target, ".new");
    let script = render_script(interpreter, command);

    let result = fs::File::create(&staging)
        .and_then(|mut file| {
            file.write_all(script.as_bytes())?;
            file.flush()
        })
        .and_then(|()| fs::set_permissions(&staging, fs::Permissions::from_mode(0o755)))
        .and_then(|()| fs::rename(&staging, target));

    if let Err(source) = result {
        let _ = fs::remove_file(&staging);
        return Err(CommandError::Script {
            path: target.to_string_lossy().to_string(),
            source,
        });
    }

    debug!("Staged elevated script {:?} ({} bytes)", target, script.len());
    Ok(())
}

fn suffixed(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    target.with_file_name(name)
}

fn render_script(interpreter: &Path, command: &str) -> String {
    format!("#!{}\n{}\n", interpreter.display(), command)
}
