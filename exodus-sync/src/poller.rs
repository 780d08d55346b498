//! Task poller: waits for a commit or flush task to reach a terminal state.
//!
//! ## Algorithm
//!
//! 1. If the task is terminal, return it (no fetch, no sleep).
//! 2. Sleep for the fixed interval.
//! 3. Re-fetch the task through its `self` link.
//! 4. Go to 1.
//!
//! A transport failure on step 3 is retried on the next round, up to
//! `fetch_retries` consecutive failures; after that, or on any other error,
//! the error is returned. A failed fetch is never reported as a `FAILED` task.

use std::time::Duration;

use exodus_core::{Task, TaskState};

use crate::error::SyncError;
use crate::gateway::{require_link, Gateway};

/// The only suspension point in the client.
pub trait Sleeper {
    fn sleep(&mut self, interval: Duration);
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Fixed-interval poller shared by the commit and flush flows.
#[derive(Debug, Clone)]
pub struct TaskPoller<S = ThreadSleeper> {
    interval: Duration,
    fetch_retries: u32,
    sleeper: S,
}

impl TaskPoller<ThreadSleeper> {
    pub fn new(interval: Duration, fetch_retries: u32) -> Self {
        Self::with_sleeper(interval, fetch_retries, ThreadSleeper)
    }
}

impl<S: Sleeper> TaskPoller<S> {
    pub fn with_sleeper(interval: Duration, fetch_retries: u32, sleeper: S) -> Self {
        Self {
            interval,
            fetch_retries,
            sleeper,
        }
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Poll `task` with `fetch` until it is terminal.
    pub fn await_terminal<F>(&mut self, task: Task, mut fetch: F) -> Result<Task, SyncError>
    where
        F: FnMut(&Task) -> Result<Task, SyncError>,
    {
        let mut current = task;
        let mut failures = 0u32;
        loop {
            if current.state.is_terminal() {
                return Ok(current);
            }

            self.sleeper.sleep(self.interval);
            match fetch(&current) {
                Ok(next) => {
                    failures = 0;
                    if next.state != current.state {
                        tracing::info!(
                            task = %next.id,
                            from = %current.state,
                            to = %next.state,
                            "task state changed"
                        );
                    } else {
                        tracing::debug!(task = %next.id, state = %next.state, "task unchanged");
                    }
                    current = next;
                }
                Err(err) if err.is_transient() && failures < self.fetch_retries => {
                    failures += 1;
                    tracing::warn!(
                        task = %current.id,
                        attempt = failures,
                        retries = self.fetch_retries,
                        error = %err,
                        "task status fetch failed"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Poll `task` through `gateway` using its server-provided `self` link.
    pub fn await_task<G: Gateway>(&mut self, gateway: &G, task: Task) -> Result<Task, SyncError> {
        let task = self.await_terminal(task, |t| {
            let link = require_link(&t.links, "task", &t.id.0, "self")?;
            gateway.get_task(link)
        })?;
        match task.state {
            TaskState::Complete => tracing::info!(task = %task.id, "task complete"),
            _ => tracing::error!(task = %task.id, "task failed"),
        }
        Ok(task)
    }
}
