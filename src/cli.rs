use crate::sweep::{DEFAULT_PACE_MS, Inputs};
use clap::Parser;
use gdrive::backend::google::DEFAULT_API_BASE;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "drive-sweep")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Move what fits from a Drive folder into another, purge marked files, report quota",
    long_about = None
)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,

    /// Base64-encoded service account key (JSON)
    #[arg(default_value = "", hide_default_value = true)]
    pub credentials: String,

    /// Folder whose files are copied
    #[arg(default_value = "", hide_default_value = true)]
    pub source_id: String,

    /// Folder receiving the copies
    #[arg(default_value = "", hide_default_value = true)]
    pub destination_id: String,

    /// Folder the copied originals are moved to
    #[arg(default_value = "", hide_default_value = true)]
    pub trash_id: String,

    /// Label printed with the quota report
    #[arg(default_value = "", hide_default_value = true)]
    pub label: String,

    /// Delay in milliseconds before each quota check and deletion
    #[arg(long, env = "DRIVE_SWEEP_PACE_MS", default_value_t = DEFAULT_PACE_MS)]
    pub pace_ms: u64,

    /// Drive API root
    #[arg(long, env = "DRIVE_SWEEP_API_BASE", default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,
}

impl Cli {
    /// Positional inputs for the sweep.
    pub fn inputs(&self) -> Inputs {
        Inputs {
            credentials: self.credentials.clone(),
            source_id: self.source_id.clone(),
            destination_id: self.destination_id.clone(),
            trash_id: self.trash_id.clone(),
            label: self.label.clone(),
        }
    }

    /// Pacing interval between paced remote calls.
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }

    /// Log level implied by `--verbose` and `--quiet`.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
