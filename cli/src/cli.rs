//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, OutputFlags, PathFlags};
use crate::commands;

/// Bare-metal device lifecycle and remote command execution
#[derive(Parser)]
#[command(
    name = "metalctl",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file [default: $METALCTL_CONFIG or ~/.metalctl/config.yaml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Device state file [default: ~/.metalctl/state.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the provisioned device
    #[command(subcommand)]
    Device(commands::device::DeviceCommand),

    /// Run a command batch on the device over SSH
    Exec(commands::exec::ExecArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
            state,
            command,
        } = self;

        if let Command::Version = command {
            commands::version::run(json);
            return Ok(ExitCode::SUCCESS);
        }

        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            paths: PathFlags { config, state },
        })?;

        match command {
            Command::Device(cmd) => commands::device::run(&app, cmd).await,
            Command::Exec(args) => commands::exec::run(&app, args).await,
            Command::Version => Ok(ExitCode::SUCCESS),
        }
    }
}
