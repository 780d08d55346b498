//! Exodus: publish content trees and flush CDN caches through the gateway.
//!
//! # Usage
//!
//! ```text
//! exodus [--env <name>] [--gw-url <url>] [--cert <pem> --key <pem>] sync <src> <dest> [--dry-run] [--no-wait]
//! exodus flush <path>...
//! exodus task <link>
//! exodus whoami
//! ```
//!
//! Exit status is 0 on success, 41 when a commit or flush task ends in
//! `FAILED`, and 1 on any other error.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use commands::{flush::FlushArgs, sync::SyncArgs, task::TaskArgs, whoami::WhoamiArgs};
use exodus_core::{config, Overrides, Settings};

/// Exit status for a task that reached `FAILED`.
pub const EXIT_TASK_FAILED: u8 = 41;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "exodus",
    version,
    about = "Publish content and flush CDN caches through exodus-gw",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a directory tree and publish it atomically under a destination path.
    Sync(SyncArgs),

    /// Invalidate published paths in the CDN cache.
    Flush(FlushArgs),

    /// Wait for an existing commit or flush task to finish.
    Task(TaskArgs),

    /// Show the caller's authentication context.
    Whoami(WhoamiArgs),
}

// ---------------------------------------------------------------------------
// Global connection arguments
// ---------------------------------------------------------------------------

/// Connection settings shared by every command; override `~/.exodus/config.yaml`.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Target environment (e.g. live, pre).
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Base URL of the gateway.
    #[arg(long, global = true, value_name = "URL")]
    pub gw_url: Option<String>,

    /// Base URL for blob uploads (default: <gw-url>/upload).
    #[arg(long, global = true, value_name = "URL")]
    pub upload_url: Option<String>,

    /// PEM client certificate for mutual TLS.
    #[arg(long, global = true, value_name = "PEM", requires = "key")]
    pub cert: Option<PathBuf>,

    /// PEM private key matching --cert.
    #[arg(long, global = true, value_name = "PEM", requires = "cert")]
    pub key: Option<PathBuf>,

    /// Extra PEM CA certificate to trust.
    #[arg(long, global = true, value_name = "PEM")]
    pub ca_bundle: Option<PathBuf>,

    /// Seconds between task status checks.
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Merge flags with the config file into explicit settings.
    pub fn settings(&self) -> Result<Settings> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let file = config::load_at(&home).context("failed to load config")?;
        let overrides = Overrides {
            env: self.env.clone(),
            gw_url: self.gw_url.clone(),
            upload_url: self.upload_url.clone(),
            cert: self.cert.clone(),
            key: self.key.clone(),
            ca_bundle: self.ca_bundle.clone(),
            poll_interval_secs: self.poll_interval,
        };
        let user = std::env::var("USER").ok();
        file.resolve(&overrides, &home, user.as_deref())
            .context("incomplete connection settings")
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let result = match cli.command {
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Flush(args) => args.run(&cli.global),
        Commands::Task(args) => args.run(&cli.global),
        Commands::Whoami(args) => args.run(&cli.global),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            let chain = format!("{err:#}");
            tracing::error!(error = %chain, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
