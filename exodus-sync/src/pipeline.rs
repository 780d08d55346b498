//! End-to-end workflows used by the CLI.
//!
//! ## `sync_tree`
//!
//! 1. Walk the source tree.
//! 2. Hash every regular file and append `absent` markers for removals.
//! 3. Upload every distinct content key. All uploads finish before step 4.
//! 4. Create a publish and add every item.
//! 5. Commit.
//! 6. Poll the commit task to a terminal state (unless told not to wait).
//!
//! ## `flush_paths`
//!
//! Submit one flush request, then poll its task to a terminal state.

use std::collections::HashSet;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use exodus_core::{
    digest::digest_file,
    walk::{self, LocalEntry, WalkOptions},
    EnvName, Item, ItemTarget, Publish, Settings, Task, TaskState,
};

use crate::blob::{BlobStore, BlobUploader, UploadOutcome};
use crate::error::SyncError;
use crate::flush::CacheFlushSession;
use crate::gateway::{require_link, Gateway, HttpGateway};
use crate::poller::{Sleeper, TaskPoller, ThreadSleeper};
use crate::publish::PublishSession;

/// Switches for one `sync_tree` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Hash and report only; no network traffic.
    pub dry_run: bool,
    /// Poll the commit task to completion.
    pub wait: bool,
    /// Publish symlinks as links instead of following them.
    pub links: bool,
    /// Check the blob store before each upload.
    pub check_existing: bool,
    /// Passed to the gateway as the commit `deadline`.
    pub commit_deadline: Option<String>,
    /// Validity marker sent with every item; defaults to the current time.
    pub from_date: Option<String>,
    /// MIME type sent with every object item.
    pub content_type: Option<String>,
    /// Destination paths to unpublish in the same publish.
    pub remove: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            wait: true,
            links: false,
            check_existing: false,
            commit_deadline: None,
            from_date: None,
            content_type: None,
            remove: Vec::new(),
        }
    }
}

/// How a sync ended, as far as the client can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The source tree was empty; no publish was created.
    NothingToDo,
    /// `dry_run` was set.
    DryRun,
    /// Commit requested but not awaited.
    Committing,
    Complete,
    Failed,
}

/// Summary of a `sync_tree` run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub items: Vec<Item>,
    pub uploaded: usize,
    pub already_present: usize,
    pub publish: Option<Publish>,
    pub task: Option<Task>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn outcome(&self) -> SyncOutcome {
        if self.dry_run {
            return SyncOutcome::DryRun;
        }
        match &self.task {
            None => SyncOutcome::NothingToDo,
            Some(task) => match task.state {
                TaskState::Complete => SyncOutcome::Complete,
                TaskState::Failed => SyncOutcome::Failed,
                _ => SyncOutcome::Committing,
            },
        }
    }
}

/// Final state of a flush (or any watched) task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: Task,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        self.task.state == TaskState::Complete
    }
}

/// Composes hashing, uploads, publish sessions, flushes and polling.
#[derive(Debug)]
pub struct Orchestrator<G, B, S = ThreadSleeper> {
    gateway: G,
    blobs: B,
    poller: TaskPoller<S>,
    env: EnvName,
}

impl Orchestrator<HttpGateway, HttpGateway, ThreadSleeper> {
    /// Production wiring: one HTTP client serves as gateway and blob store.
    pub fn from_settings(settings: &Settings) -> Result<Self, SyncError> {
        let gateway = HttpGateway::new(settings)?;
        Ok(Self::new(
            gateway.clone(),
            gateway,
            TaskPoller::new(settings.poll_interval, settings.fetch_retries),
            settings.env.clone(),
        ))
    }
}

impl<G: Gateway, B: BlobStore, S: Sleeper> Orchestrator<G, B, S> {
    pub fn new(gateway: G, blobs: B, poller: TaskPoller<S>, env: EnvName) -> Self {
        Self {
            gateway,
            blobs,
            poller,
            env,
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    pub fn poller(&self) -> &TaskPoller<S> {
        &self.poller
    }

    /// Publish the tree at `src` under `dest`.
    pub fn sync_tree(
        &mut self,
        src: &Path,
        dest: &str,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let mut report = plan_sync(src, dest, options)?;
        if options.dry_run || report.items.is_empty() {
            return Ok(report);
        }

        let uploader = BlobUploader::new(&self.blobs, options.check_existing);
        let mut seen = HashSet::new();
        for item in &report.items {
            let (Some(source), Some(key)) = (&item.source, item.content_key()) else {
                continue;
            };
            if !seen.insert(key.clone()) {
                continue;
            }
            match uploader.ensure_uploaded(&self.env, key, source)? {
                UploadOutcome::Uploaded => report.uploaded += 1,
                UploadOutcome::AlreadyPresent => report.already_present += 1,
            }
        }

        let from_date = options
            .from_date
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut session = PublishSession::create(&self.gateway, &self.env, report.items.len())?;
        session.add_items(&report.items, &from_date)?;
        let task = session.commit(options.commit_deadline.as_deref())?;
        report.publish = Some(session.publish().clone());

        let task = if options.wait {
            let task = self.poller.await_task(&self.gateway, task)?;
            session.finish(&task)?;
            task
        } else {
            let link = require_link(&task.links, "task", &task.id.0, "self")?;
            tracing::info!(task = %task.id, link, "not waiting for commit task");
            task
        };
        report.task = Some(task);
        Ok(report)
    }

    /// Invalidate `paths` at the edge and wait for the flush task.
    pub fn flush_paths<P: AsRef<str>>(&mut self, paths: &[P]) -> Result<TaskReport, SyncError> {
        let task = CacheFlushSession::new(&self.gateway, self.env.clone()).flush(paths)?;
        let task = self.poller.await_task(&self.gateway, task)?;
        Ok(TaskReport { task })
    }

    /// Resume observing a task from its captured `self` link.
    pub fn watch_task(&mut self, link: &str) -> Result<TaskReport, SyncError> {
        let task = self.gateway.get_task(link)?;
        tracing::info!(task = %task.id, state = %task.state, "watching task");
        let task = self.poller.await_task(&self.gateway, task)?;
        Ok(TaskReport { task })
    }

    /// Caller's auth context, for diagnostics.
    pub fn whoami(&self) -> Result<Value, SyncError> {
        self.gateway.whoami()
    }
}

/// Hash `src` and list everything a sync would register, without any
/// network traffic. With `dry_run` set each planned item is logged.
pub fn plan_sync(src: &Path, dest: &str, options: &SyncOptions) -> Result<SyncReport, SyncError> {
    let mut items = hash_tree(src, dest, options.links)?;
    if let Some(content_type) = &options.content_type {
        for item in items.iter_mut().filter(|i| i.content_key().is_some()) {
            item.content_type = Some(content_type.clone());
        }
    }
    for path in &options.remove {
        items.push(Item::absent(path)?);
    }

    if items.is_empty() {
        tracing::info!(src = %src.display(), "nothing to sync");
    }
    if options.dry_run {
        for item in &items {
            match &item.target {
                ItemTarget::Object(key) => {
                    tracing::info!(dest = %item.dest_path, key = %key, "[dry-run] would publish")
                }
                ItemTarget::Link(to) => {
                    tracing::info!(dest = %item.dest_path, link_to = %to, "[dry-run] would link")
                }
                ItemTarget::Absent => {
                    tracing::info!(dest = %item.dest_path, "[dry-run] would remove")
                }
            }
        }
    }

    Ok(SyncReport {
        items,
        uploaded: 0,
        already_present: 0,
        publish: None,
        task: None,
        dry_run: options.dry_run,
    })
}

/// Walk `src` and compute content keys for every file.
pub fn hash_tree(src: &Path, dest: &str, links: bool) -> Result<Vec<Item>, SyncError> {
    let entries = walk::collect(src, dest, WalkOptions { links })?;
    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            LocalEntry::File { source, dest_path } => {
                let key = digest_file(&source)?;
                tracing::debug!(path = %source.display(), key = %key, "hashed");
                items.push(Item {
                    source: Some(source),
                    dest_path,
                    target: ItemTarget::Object(key),
                    content_type: None,
                });
            }
            LocalEntry::Link { dest_path, target } => items.push(Item {
                source: None,
                dest_path,
                target: ItemTarget::Link(target),
                content_type: None,
            }),
        }
    }
    Ok(items)
}
