//! Process commands: status, kill, run and privilege

use adhoc_core::command::PrivilegeVerdict;
use adhoc_core::error::AdhocError;
use adhoc_core::Supervisor;
use colored::Colorize;
use nix::unistd::geteuid;
use tracing::info;

/// Report whether a daemon is running; exit 1 when it is not
pub fn run_status(supervisor: &Supervisor, name: &str) -> Result<i32, AdhocError> {
    let pids = supervisor.registry().matching_pids(name);
    if pids.is_empty() {
        println!("{} {} is not running", "●".red(), name.bold());
        return Ok(1);
    }

    let pid_list: Vec<String> = pids.iter().map(u32::to_string).collect();
    println!(
        "{} {} is running (pid {})",
        "●".green(),
        name.bold(),
        pid_list.join(", ")
    );
    Ok(0)
}

/// Stop every process matching `name`
pub fn run_kill(supervisor: &Supervisor, name: &str, elevated: bool) -> Result<i32, AdhocError> {
    if !supervisor.is_running(name) {
        println!("{} is not running", name.bold());
        return Ok(0);
    }

    if supervisor.kill_process(name, elevated)? {
        println!("{} Stopped {}", "✓".green(), name.bold());
        Ok(0)
    } else {
        eprintln!("{} Could not stop {}", "✗".red(), name.bold());
        Ok(1)
    }
}

/// Run a shell command and pass its exit code through
pub fn run_command(
    supervisor: &Supervisor,
    words: &[String],
    elevated: bool,
    wait: bool,
) -> Result<i32, AdhocError> {
    let command = words.join(" ");
    info!(elevated, wait, "Running `{}`", command);

    if elevated && !supervisor.has_privilege() {
        eprintln!("{} Root access was not granted", "✗".red());
        return Ok(1);
    }

    Ok(supervisor.run(&command, elevated, wait)?)
}

/// Probe for root access and print the verdict
pub fn run_privilege(supervisor: &Supervisor) -> Result<i32, AdhocError> {
    if geteuid().is_root() {
        println!("{} Already running as root", "ℹ".blue());
    }

    let granted = supervisor.has_privilege();
    let verdict = supervisor.privilege_verdict();
    match verdict {
        PrivilegeVerdict::Granted => println!("{} Root access: {}", "✓".green(), verdict),
        _ => println!("{} Root access: {}", "✗".red(), verdict),
    }

    Ok(if granted { 0 } else { 1 })
}
