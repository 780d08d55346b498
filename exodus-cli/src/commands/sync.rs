//! `exodus sync <src> <dest>`: upload a tree and publish it atomically.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Args;
use colored::Colorize;

use exodus_core::{types::parse_content_type, Item, ItemTarget};
use exodus_sync::{pipeline, Orchestrator, SyncOptions, SyncOutcome};

use super::report_task;
use crate::GlobalArgs;

/// Arguments for `exodus sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Local directory (or single file) to publish.
    pub src: PathBuf,

    /// Destination path prefix on the CDN (e.g. /content/dist/rhel8).
    pub dest: String,

    /// Hash and list what would be published without contacting the gateway.
    #[arg(long)]
    pub dry_run: bool,

    /// Return once commit is requested instead of waiting for the task.
    #[arg(long)]
    pub no_wait: bool,

    /// Publish symlinks as links instead of following them.
    #[arg(long, short = 'l')]
    pub links: bool,

    /// Skip uploading blobs the store already has.
    #[arg(long)]
    pub check_existing: bool,

    /// Abandon the commit if not done by this UTC time (YYYY-MM-DDTHH:MM:SSZ).
    #[arg(long, value_name = "TIMESTAMP", value_parser = parse_deadline)]
    pub commit_deadline: Option<String>,

    /// MIME type to record for every published file.
    #[arg(long, value_name = "MIME", value_parser = parse_mime)]
    pub content_type: Option<String>,

    /// Unpublish this destination path in the same publish (repeatable).
    #[arg(long = "remove", value_name = "PATH")]
    pub remove: Vec<String>,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let src = self
            .src
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.src.display()))?;

        let options = SyncOptions {
            dry_run: self.dry_run,
            wait: !self.no_wait,
            links: self.links,
            check_existing: self.check_existing,
            commit_deadline: self.commit_deadline.clone(),
            from_date: None,
            content_type: self.content_type.clone(),
            remove: self.remove.clone(),
        };

        if self.dry_run {
            // Hashing only; no settings or network needed.
            let report = pipeline::plan_sync(&src, &self.dest, &options)
                .with_context(|| format!("failed to plan sync of '{}'", src.display()))?;
            print_items(&report.items);
            return Ok(ExitCode::SUCCESS);
        }

        let settings = global.settings()?;
        let mut orchestrator =
            Orchestrator::from_settings(&settings).context("failed to set up gateway client")?;

        let report = orchestrator
            .sync_tree(&src, &self.dest, &options)
            .with_context(|| format!("sync of '{}' to '{}' failed", src.display(), self.dest))?;

        let what = format!(
            "publish of {} item(s) to {} ({} uploaded, {} already present)",
            report.items.len(),
            self.dest,
            report.uploaded,
            report.already_present
        );
        match (report.outcome(), &report.task) {
            (SyncOutcome::NothingToDo, _) => {
                println!("{} nothing to publish under '{}'", "✓".green(), src.display());
                Ok(ExitCode::SUCCESS)
            }
            (SyncOutcome::Committing, Some(task)) => {
                println!("{} {what} committing (task {})", "~".yellow(), task.id);
                Ok(ExitCode::SUCCESS)
            }
            (outcome, Some(task)) => Ok(report_task(&what, task, outcome == SyncOutcome::Complete)),
            (_, None) => Ok(ExitCode::SUCCESS),
        }
    }
}

fn print_items(items: &[Item]) {
    println!("[dry-run] {} item(s) would be published", items.len());
    for item in items {
        match &item.target {
            ItemTarget::Object(key) => println!("  ~  {}  {key}", item.dest_path),
            ItemTarget::Link(to) => println!("  →  {} -> {to}", item.dest_path),
            ItemTarget::Absent => println!("  ✗  {}", item.dest_path),
        }
    }
}

fn parse_mime(s: &str) -> Result<String, String> {
    parse_content_type(s).map_err(|e| e.to_string())
}

fn parse_deadline(s: &str) -> Result<String, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%SZ")
        .map(|_| s.to_string())
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SSZ: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_format() {
        assert!(parse_deadline("2022-07-25T15:47:47Z").is_ok());
        assert!(parse_deadline("2022-07-25 15:47").is_err());
        assert!(parse_deadline("tomorrow").is_err());
    }

    #[test]
    fn mime_format() {
        assert!(parse_mime("application/x-iso9660-image").is_ok());
        assert!(parse_mime("iso").is_err());
    }
}
