//! `exodus whoami`: print the caller's auth context as reported by the gateway.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use exodus_sync::Orchestrator;

use crate::GlobalArgs;

/// Arguments for `exodus whoami`.
#[derive(Args, Debug)]
pub struct WhoamiArgs {}

impl WhoamiArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<ExitCode> {
        let settings = global.settings()?;
        let orchestrator =
            Orchestrator::from_settings(&settings).context("failed to set up gateway client")?;
        let context = orchestrator.whoami().context("whoami request failed")?;
        println!("{}", serde_json::to_string_pretty(&context)?);
        Ok(ExitCode::SUCCESS)
    }
}
