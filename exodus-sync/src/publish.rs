//! Publish session: one atomic unit of path registrations.
//!
//! ```text
//! Open --add_item*--> Open --commit--> CommitRequested --finish--> Done | Failed
//!   \--add_item fails--> Abandoned
//! ```
//!
//! A session is created with the number of items it is meant to carry and
//! refuses to commit until exactly that many have been added. An abandoned
//! publish stays uncommitted on the server, where it is inert.

use exodus_core::{EnvName, Item, Publish, Task, TaskState};

use crate::error::SyncError;
use crate::gateway::Gateway;

/// Client-side lifecycle of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    CommitRequested,
    Done,
    Failed,
    Abandoned,
}

impl SessionState {
    fn label(self) -> &'static str {
        match self {
            SessionState::Open => "open",
            SessionState::CommitRequested => "committing",
            SessionState::Done => "committed",
            SessionState::Failed => "failed",
            SessionState::Abandoned => "abandoned",
        }
    }
}

/// One open publish and its bookkeeping.
#[derive(Debug)]
pub struct PublishSession<G> {
    gateway: G,
    publish: Publish,
    state: SessionState,
    intended: usize,
    added: usize,
}

impl<G: Gateway> PublishSession<G> {
    /// Create a publish on the server for `intended` items.
    ///
    /// The server's `id` and `links` are kept verbatim.
    pub fn create(gateway: G, env: &EnvName, intended: usize) -> Result<Self, SyncError> {
        let publish = gateway.create_publish(env)?;
        tracing::info!(publish = %publish.id, env = %env, "created publish");
        Ok(Self {
            gateway,
            publish,
            state: SessionState::Open,
            intended,
            added: 0,
        })
    }

    pub fn publish(&self) -> &Publish {
        &self.publish
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn added(&self) -> usize {
        self.added
    }

    /// Register one destination path. The first failure abandons the session.
    pub fn add_item(&mut self, item: &Item, from_date: &str) -> Result<(), SyncError> {
        self.expect_state(SessionState::Open, "add items")?;
        if let Err(err) = self.gateway.add_item(&self.publish, &item.to_record(from_date)) {
            self.state = SessionState::Abandoned;
            tracing::error!(
                publish = %self.publish.id,
                dest = %item.dest_path,
                error = %err,
                "publish abandoned"
            );
            return Err(SyncError::PartialPublish {
                publish: Box::new(self.publish.clone()),
                added: self.added,
                intended: self.intended,
                source: Box::new(err),
            });
        }
        self.added += 1;
        tracing::debug!(publish = %self.publish.id, dest = %item.dest_path, "added item");
        Ok(())
    }

    /// Register every item in order, stopping at the first failure.
    pub fn add_items<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a Item>,
        from_date: &str,
    ) -> Result<(), SyncError> {
        for item in items {
            self.add_item(item, from_date)?;
        }
        Ok(())
    }

    /// Request commit; returns the commit task for polling.
    pub fn commit(&mut self, deadline: Option<&str>) -> Result<Task, SyncError> {
        self.expect_state(SessionState::Open, "commit")?;
        if self.added != self.intended {
            return Err(SyncError::IncompletePublish {
                id: self.publish.id.to_string(),
                added: self.added,
                intended: self.intended,
            });
        }
        let task = self.gateway.commit_publish(&self.publish, deadline)?;
        self.state = SessionState::CommitRequested;
        tracing::info!(
            publish = %self.publish.id,
            items = self.added,
            task = %task.id,
            "committing publish"
        );
        Ok(task)
    }

    /// Record the terminal state of the commit task.
    pub fn finish(&mut self, task: &Task) -> Result<SessionState, SyncError> {
        self.expect_state(SessionState::CommitRequested, "finish")?;
        self.state = match task.state {
            TaskState::Complete => SessionState::Done,
            TaskState::Failed => SessionState::Failed,
            _ => {
                return Err(SyncError::InvalidState {
                    id: task.id.to_string(),
                    state: "still running",
                    action: "finish",
                })
            }
        };
        Ok(self.state)
    }

    fn expect_state(&self, expected: SessionState, action: &'static str) -> Result<(), SyncError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SyncError::InvalidState {
                id: self.publish.id.to_string(),
                state: self.state.label(),
                action,
            })
        }
    }
}
