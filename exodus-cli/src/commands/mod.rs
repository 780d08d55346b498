pub mod flush;
pub mod sync;
pub mod task;
pub mod whoami;

use std::process::ExitCode;

use colored::Colorize;
use exodus_core::Task;

use crate::EXIT_TASK_FAILED;

/// Print the terminal line for a task and pick the exit status.
pub(crate) fn report_task(what: &str, task: &Task, succeeded: bool) -> ExitCode {
    let updated = task.updated.as_deref().unwrap_or("unknown time");
    if succeeded {
        println!("{} {what} complete (task {}, {updated})", "✓".green(), task.id);
        ExitCode::SUCCESS
    } else {
        println!("{} {what} failed (task {}, {updated})", "✗".red(), task.id);
        ExitCode::from(EXIT_TASK_FAILED)
    }
}
