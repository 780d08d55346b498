//! `exodus flush <path>...`: invalidate published paths at the edge.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use exodus_sync::Orchestrator;

use super::report_task;
use crate::GlobalArgs;

/// Arguments for `exodus flush`.
#[derive(Args, Debug)]
pub struct FlushArgs {
    /// Published paths to invalidate (e.g. /content/dist/repodata/repomd.xml).
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,
}

impl FlushArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let settings = global.settings()?;
        let mut orchestrator =
            Orchestrator::from_settings(&settings).context("failed to set up gateway client")?;

        let report = orchestrator
            .flush_paths(&self.paths)
            .with_context(|| format!("flush failed in '{}'", settings.env))?;

        let what = format!("flush of {} path(s)", self.paths.len());
        Ok(report_task(&what, &report.task, report.succeeded()))
    }
}
