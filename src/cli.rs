use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "nodefix", version, about = "Auto-remediate failed node health probes")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress progress output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: /etc/nodefix/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which failed probes can be fixed automatically
    Classify {
        /// Probe file (JSON, or YAML by extension); "-" reads JSON from stdin
        #[arg(long)]
        probes: PathBuf,

        /// Print the classification as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remediate failed probes (kernel modules first, then sysctl parameters)
    Fix {
        /// Probe file (JSON, or YAML by extension); "-" reads JSON from stdin
        #[arg(long)]
        probes: PathBuf,

        /// Print the fix report as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Also write the JSON fix report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Hand every probe to the remediation pass, not only fixable ones
        #[arg(long)]
        all: bool,

        /// Per-command timeout in seconds (overrides actions.timeout_secs)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_secs: Option<u64>,

        /// Persist applied fixes so they survive a reboot (overrides persist.enabled)
        #[arg(long)]
        persist: bool,
    },

    /// Check that the tools remediation relies on are available
    Check,
}
