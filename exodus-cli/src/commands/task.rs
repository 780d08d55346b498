//! `exodus task <link>`: watch an existing task to completion.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use exodus_sync::Orchestrator;

use super::report_task;
use crate::GlobalArgs;

/// Arguments for `exodus task`.
#[derive(Args, Debug)]
pub struct TaskArgs {
    /// The task's `self` link as printed by `sync --no-wait` (e.g. /task/<id>).
    pub link: String,
}

impl TaskArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let settings = global.settings()?;
        let mut orchestrator =
            Orchestrator::from_settings(&settings).context("failed to set up gateway client")?;

        let report = orchestrator
            .watch_task(&self.link)
            .with_context(|| format!("could not follow task '{}'", self.link))?;
        Ok(report_task("task", &report.task, report.succeeded()))
    }
}
