//! Shell over a tar archive mounted as an in-memory filesystem

pub mod action_log;
pub mod command;
pub mod config;
pub mod shell;

use std::path::PathBuf;

pub use action_log::ActionLog;
pub use command::{Command, CommandError};
pub use config::{load_config, ShellConfig};
pub use shell::{Flow, Shell};

// Re-export CLI types for testing
pub use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tarsh")]
#[command(about = "Browse a tar archive through a small shell")]
#[command(version, author, long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Tar archive to mount (overrides the config file)
    #[arg(short, long)]
    pub archive: Option<PathBuf>,

    /// User name shown in the prompt and the action log
    #[arg(long)]
    pub user: Option<String>,

    /// Host name shown in the prompt
    #[arg(long)]
    pub host: Option<String>,

    /// Startup script executed before the interactive session
    #[arg(short, long)]
    pub script: Option<PathBuf>,

    /// CSV file receiving one row per typed command
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not write the action log
    #[arg(long, conflicts_with = "log_file")]
    pub no_log: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line values on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut ShellConfig) {
        if let Some(archive) = &self.archive {
            config.archive = archive.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(script) = &self.script {
            config.startup_script = Some(script.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if self.no_log {
            config.log_file = None;
        }
    }

    pub fn level(&self) -> tracing::Level {
        match self.log_level.as_str() {
            "error" => tracing::Level::ERROR,
            "warn" => tracing::Level::WARN,
            "info" => tracing::Level::INFO,
            "debug" => tracing::Level::DEBUG,
            "trace" => tracing::Level::TRACE,
            _ => tracing::Level::WARN,
        }
    }
}
