//! Command-line arguments
//!
//! Global flags cover configuration and logging; the `serve` subcommand
//! carries the settings that can override the config file.

use crate::core::validation::validate_positive_int;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "waitline")]
#[command(about = "Virtual waiting-line service for walk-in venues")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Force colored log output
    #[arg(short = 'g', long = "color", conflicts_with = "no_color", global = true)]
    pub color: bool,

    /// Disable colored log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", global = true, value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", global = true, value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the waiting-line daemon
    Serve(ServeArgs),
    /// Validate the configuration and print the effective settings
    CheckConfig(ServeArgs),
}

impl Command {
    pub fn serve_args(&self) -> &ServeArgs {
        match self {
            Command::Serve(args) | Command::CheckConfig(args) => args,
        }
    }
}

/// Settings that override the configuration file
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Listen address (host:port)
    #[arg(short = 'b', long = "bind", value_name = "ADDR")]
    pub bind: Option<String>,

    /// Seconds a called customer has to arrive before the call lapses
    #[arg(long = "grace-secs", value_name = "SECONDS", value_parser = validate_positive_int)]
    pub grace_secs: Option<u64>,

    /// Largest party accepted by join
    #[arg(long = "max-party-size", value_name = "COUNT")]
    pub max_party_size: Option<u32>,

    /// Minutes per party used for wait estimates
    #[arg(long = "minutes-per-party", value_name = "MINUTES")]
    pub minutes_per_party: Option<u64>,
}

impl Args {
    /// Parse from the process arguments, exiting with usage on error
    pub fn parse_from_env() -> Self {
        Self::parse()
    }

    /// Resolve color: explicit flags win, otherwise color when stdout is a terminal
    pub fn use_color(&self) -> bool {
        use std::io::IsTerminal;

        if self.no_color {
            false
        } else {
            self.color || std::io::stdout().is_terminal()
        }
    }

    /// `--log-file none` or `-` disables file logging even if configured
    pub fn log_file_disabled(&self) -> bool {
        self.log_file
            .as_deref()
            .and_then(|p| p.to_str())
            .is_some_and(|p| p.eq_ignore_ascii_case("none") || p == "-")
    }
}
