//! Shell command runner
//!
//! Runs `<shell> -c <command>` or `<su> -c <command>` with stderr merged into
//! stdout. A waited command has its output drained line by line into the log
//! and its exit code returned; a non-waited command is fire-and-forget.

use crate::command::script::ElevatedScript;
use crate::config::{DataPaths, Settings};
use crate::error::CommandError;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use tracing::{debug, warn};

/// Outcome of one command invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code of the child, or 0 for a command that was not waited on
    pub exit_code: i32,

    /// Whether the child's output was read (only for waited commands)
    pub output_captured: bool,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes shell commands, optionally through the elevation binary
#[derive(Debug)]
pub struct CommandRunner {
    shell: PathBuf,
    elevation_candidates: Vec<PathBuf>,
    search_path: bool,
    script: ElevatedScript,
}

impl CommandRunner {
    /// Create a runner using `shell` and the given elevation binary candidates
    pub fn new(
        shell: impl Into<PathBuf>,
        elevation_candidates: Vec<PathBuf>,
        script_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            shell: shell.into(),
            elevation_candidates,
            search_path: false,
            script: ElevatedScript::new(script_path),
        }
    }

    /// Build a runner from supervisor settings
    pub fn from_settings(settings: &Settings) -> Self {
        let paths = DataPaths::new(&settings.paths.data_dir);
        Self::new(
            &settings.shell.shell,
            settings.shell.elevation_candidates.clone(),
            paths.elevated_script(),
        )
        .with_search_path(settings.shell.search_path)
    }

    /// Also look for `su` in `$PATH` when no candidate exists
    pub fn with_search_path(mut self, search_path: bool) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn shell(&self) -> &Path {
        &self.shell
    }

    /// First available elevation binary
    pub fn elevation_binary(&self) -> Option<PathBuf> {
        if let Some(found) = self.elevation_candidates.iter().find(|p| p.exists()) {
            return Some(found.clone());
        }
        if self.search_path {
            return which::which("su").ok();
        }
        None
    }

    /// Run a command and return its exit code
    ///
    /// With `wait == false` this returns 0 as soon as the child has been
    /// spawned; the eventual outcome is only logged.
    pub fn run(&self, command: &str, elevated: bool, wait: bool) -> Result<i32, CommandError> {
        self.execute(command, elevated, wait).map(|r| r.exit_code)
    }

    /// Run a command and return the full [`CommandResult`]
    pub fn execute(
        &self,
        command: &str,
        elevated: bool,
        wait: bool,
    ) -> Result<CommandResult, CommandError> {
        self.execute_owning(command, elevated, wait, None)
    }

    /// As [`execute`](Self::execute); `owned_script` is removed once the
    /// child has exited, or right away if it never started
    fn execute_owning(
        &self,
        command: &str,
        elevated: bool,
        wait: bool,
        owned_script: Option<PathBuf>,
    ) -> Result<CommandResult, CommandError> {
        let result = self.spawn_and_collect(command, elevated, wait, owned_script.clone());
        if let (Err(_), Some(script)) = (&result, owned_script) {
            remove_script(&script);
        }
        result
    }

    fn spawn_and_collect(
        &self,
        command: &str,
        elevated: bool,
        wait: bool,
        owned_script: Option<PathBuf>,
    ) -> Result<CommandResult, CommandError> {
        let program = if elevated {
            self.elevation_binary()
                .ok_or_else(|| CommandError::ElevationUnavailable {
                    searched: self.searched(),
                })?
        } else {
            self.shell.clone()
        };

        debug!("Command ==> {}", command);

        let mut cmd = Command::new(&program);
        cmd.arg("-c").arg(command);

        if !wait {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
            let child = cmd.spawn().map_err(|e| spawn_error(&program, e))?;
            reap_in_background(child, command, owned_script);
            return Ok(CommandResult {
                exit_code: 0,
                output_captured: false,
            });
        }

        let (reader, writer) = std::io::pipe().map_err(|e| spawn_error(&program, e))?;
        let stderr_writer = writer.try_clone().map_err(|e| spawn_error(&program, e))?;
        cmd.stdout(writer).stderr(stderr_writer);

        let mut child = cmd.spawn().map_err(|e| spawn_error(&program, e))?;
        // The command still owns the parent's copies of the write end; they
        // must be closed or the reader never sees EOF.
        drop(cmd);

        drain_output(reader);

        let status = child.wait().map_err(|e| spawn_error(&program, e))?;
        let exit_code = exit_code(status);
        if exit_code != 0 {
            warn!("Command error, return code: {}", exit_code);
        }
        if let Some(script) = owned_script {
            remove_script(&script);
        }

        Ok(CommandResult {
            exit_code,
            output_captured: true,
        })
    }

    /// Run `command` elevated through a script file
    ///
    /// A waited command uses the shared script and holds its lock until the
    /// child has exited. A command that is not waited on gets a script of its
    /// own, removed by the reaper once the child is done.
    pub fn run_elevated(&self, command: &str, wait: bool) -> Result<i32, CommandError> {
        if !wait {
            let script = self.script.stage_detached(&self.shell, command)?;
            let invocation = script.to_string_lossy().into_owned();
            return self
                .execute_owning(&invocation, true, false, Some(script))
                .map(|r| r.exit_code);
        }

        let guard = self.script.lock();
        let script = guard.stage(&self.shell, command)?;
        self.run(&script.to_string_lossy(), true, wait)
    }

    fn searched(&self) -> String {
        let mut searched: Vec<String> = self
            .elevation_candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if self.search_path {
            searched.push("$PATH".to_string());
        }
        searched.join(", ")
    }
}

fn spawn_error(program: &Path, source: std::io::Error) -> CommandError {
    CommandError::Spawn {
        program: program.display().to_string(),
        source,
    }
}

/// Forward each output line to the log until the child closes its end
fn drain_output(reader: impl Read) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                debug!(target: "adhoc::child", "{}", line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                debug!("Reading command output failed: {}", e);
                break;
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

fn remove_script(script: &Path) {
    if let Err(e) = std::fs::remove_file(script) {
        debug!("Could not remove script {:?}: {}", script, e);
    }
}

/// Collect a fire-and-forget child so it does not linger as a zombie
fn reap_in_background(mut child: Child, command: &str, owned_script: Option<PathBuf>) {
    let pid = child.id();
    let command = command.to_string();
    let spawned = std::thread::Builder::new()
        .name(format!("reap-{}", pid))
        .spawn(move || {
            match child.wait() {
                Ok(status) => debug!(
                    "Background command {:?} (pid {}) exited with {}",
                    command,
                    pid,
                    exit_code(status)
                ),
                Err(e) => debug!("Waiting for background pid {} failed: {}", pid, e),
            }
            if let Some(script) = owned_script {
                remove_script(&script);
            }
        });

    if let Err(e) = spawned {
        warn!("Could not start reaper for pid {}: {}", pid, e);
    }
}
