//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

/// Used when neither an argument nor `DOMAIN_WATCH_CONFIG` names a file
pub const DEFAULT_CONFIG_PATH: &str = "domain-watch.toml";

#[derive(Debug, Parser)]
#[command(name = "domain-watch", version)]
#[command(about = "Watches registered domains and reports when they become available", long_about = None)]
pub struct Cli {
    /// TOML configuration file [default: domain-watch.toml]
    #[arg(env = "DOMAIN_WATCH_CONFIG", value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Send a test notification and exit
    #[arg(long, conflicts_with = "sweep_now")]
    pub test_webhook: bool,

    /// Run one sweep immediately after start
    #[arg(long)]
    pub sweep_now: bool,
}

impl Cli {
    #[must_use]
    pub fn config_source(&self) -> ConfigSource {
        match &self.config {
            Some(path) => ConfigSource::Explicit(path.clone()),
            None => ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Named on the command line or in the environment; must exist
    Explicit(PathBuf),
    /// Fallback path; defaults apply when the file is absent
    Default(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Default(path) => path,
        }
    }
}
