//! Command-line arguments.
//!
//! - `snapshot_monitor`               # one fetch-compare-maybe-save cycle
//! - `snapshot_monitor history`       # list archived dates
//! - `snapshot_monitor show <date>`   # print the diff archived for a date
//! - `snapshot_monitor config`        # print the effective configuration

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::{Overrides, DEFAULT_CONFIG_FILE};
use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(name = "snapshot_monitor")]
#[command(about = "Fetch a web page, archive a dated snapshot and diff when it changes")]
#[command(version)]
pub struct Cli {
    /// Path to the RON configuration file (missing file means defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Page to monitor
    #[arg(long, env = "SNAPSHOT_MONITOR_URL")]
    pub url: Option<String>,

    /// Directory holding the snapshot archive and fingerprint record
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Network timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Where log output goes
    #[arg(long, value_enum, default_value = "terminal")]
    pub log: LogDestination,

    /// Log at debug level
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the dates present in the snapshot archive
    History,
    /// Print the diff archived for a date (YYYY-MM-DD)
    Show {
        date: NaiveDate,
        /// Print the raw snapshot instead of the diff
        #[arg(long)]
        raw: bool,
    },
    /// Print the effective configuration as RON
    Config,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            root: self.root.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}
