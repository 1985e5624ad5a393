//! CLI module containing argument parsing and configuration loading

pub mod args;
pub mod config;

pub use args::{Args, Command, ServeArgs};
pub use config::{default_config_path, LoggingConfig, ServiceConfig};
