//! Cache flush session: invalidate published paths at the edge.
//!
//! A flush is one request carrying every path; the returned task is polled
//! with the same [`crate::poller::TaskPoller`] as a commit.

use exodus_core::{paths::normalize_dest, EnvName, FlushRecord, Task};

use crate::error::SyncError;
use crate::gateway::Gateway;

/// Issues flush requests for one environment.
#[derive(Debug)]
pub struct CacheFlushSession<G> {
    gateway: G,
    env: EnvName,
}

impl<G: Gateway> CacheFlushSession<G> {
    pub fn new(gateway: G, env: EnvName) -> Self {
        Self { gateway, env }
    }

    /// Request invalidation of `paths`; returns the flush task.
    pub fn flush<S: AsRef<str>>(&self, paths: &[S]) -> Result<Task, SyncError> {
        if paths.is_empty() {
            return Err(SyncError::NothingToFlush);
        }
        let records = paths
            .iter()
            .map(|p| {
                normalize_dest(p.as_ref()).map(|web_uri| FlushRecord { web_uri })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let task = self.gateway.flush_cache(&self.env, &records)?;
        tracing::info!(
            env = %self.env,
            paths = records.len(),
            task = %task.id,
            state = %task.state,
            "requested cache flush"
        );
        Ok(task)
    }
}
