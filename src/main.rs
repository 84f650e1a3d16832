//! adhoc - mesh daemon supervisor
//!
//! Command-line front end for checking, starting and stopping the mesh
//! network daemons and for patching their configuration files.

use std::path::PathBuf;

use adhoc_core::config::toml_config::{load_settings, load_settings_from_path};
use adhoc_core::{error::AdhocError, init_logging, Supervisor};
use clap::{ArgAction, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

mod cli;

use cli::conf::ConfFile;

#[derive(Parser)]
#[command(name = "adhoc")]
#[command(about = "Supervisor and config patcher for mesh network daemons")]
struct Cli {
    /// Settings file (default: ~/.config/adhoc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a daemon is running
    Status {
        /// Substring of the daemon's command name
        name: String,
    },
    /// Stop every process matching a name
    Kill {
        name: String,
        /// Use the bundled pkill as root
        #[arg(long)]
        elevated: bool,
    },
    /// Run a shell command
    Run {
        /// Run through the elevation binary
        #[arg(long)]
        elevated: bool,
        /// Return immediately without waiting for the command
        #[arg(long)]
        no_wait: bool,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Probe for root access
    Privilege,
    /// Inspect or patch conf/wpa_supplicant.conf
    Supplicant {
        #[command(subcommand)]
        action: ConfCommands,
    },
    /// Inspect or patch conf/tiwlan.ini
    Tiwlan {
        #[command(subcommand)]
        action: ConfCommands,
    },
    /// Inspect or update conf/adhoc.conf
    AdhocConf {
        #[command(subcommand)]
        action: ConfCommands,
    },
    /// Apply a LAN address to the DHCP range and the Bluetooth gateway
    Lan {
        /// Address such as 192.168.1.1 or 192.168.1.0/24
        address: String,
    },
    /// Point dnsmasq's lease and pid files into the data directory
    DnsmasqPaths,
}

#[derive(Subcommand)]
enum ConfCommands {
    /// Print current values
    Get {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set values (KEY=VALUE ...)
    Set {
        #[arg(required = true)]
        assignments: Vec<String>,
    },
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn run(cli: Cli) -> Result<i32, AdhocError> {
    let settings = match &cli.config {
        Some(path) => load_settings_from_path(path)?,
        None => load_settings()?,
    };
    let supervisor = Supervisor::new(&settings);

    match cli.command {
        Commands::Status { name } => cli::process::run_status(&supervisor, &name),
        Commands::Kill { name, elevated } => cli::process::run_kill(&supervisor, &name, elevated),
        Commands::Run {
            elevated,
            no_wait,
            command,
        } => cli::process::run_command(&supervisor, &command, elevated, !no_wait),
        Commands::Privilege => cli::process::run_privilege(&supervisor),
        Commands::Supplicant { action } => run_conf(&supervisor, ConfFile::Supplicant, action),
        Commands::Tiwlan { action } => run_conf(&supervisor, ConfFile::TiWlan, action),
        Commands::AdhocConf { action } => run_conf(&supervisor, ConfFile::Adhoc, action),
        Commands::Lan { address } => cli::conf::run_lan(&supervisor, &address),
        Commands::DnsmasqPaths => cli::conf::run_dnsmasq_paths(&supervisor),
    }
}

fn run_conf(supervisor: &Supervisor, file: ConfFile, action: ConfCommands) -> Result<i32, AdhocError> {
    match action {
        ConfCommands::Get { json } => cli::conf::run_get(supervisor, file, json),
        ConfCommands::Set { assignments } => cli::conf::run_set(supervisor, file, &assignments),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(level_for(cli.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let exit_code = match e {
                // Configuration and input errors (exit code 2)
                AdhocError::Config(_) | AdhocError::Toml(_) | AdhocError::TomlSerialize(_) => 2,
                AdhocError::Patch(_) => 2,
                // Runtime errors (exit code 1)
                AdhocError::Command(_) | AdhocError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
