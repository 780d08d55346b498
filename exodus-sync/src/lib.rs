//! # exodus-sync
//!
//! Client side of the publish and cache-flush protocol.
//!
//! Call [`Orchestrator::sync_tree`] to upload a directory and publish it
//! atomically, or [`Orchestrator::flush_paths`] to invalidate published paths.
//! The building blocks ([`PublishSession`], [`CacheFlushSession`],
//! [`TaskPoller`], [`BlobUploader`]) are usable on their own against any
//! [`Gateway`] / [`BlobStore`].

pub mod blob;
pub mod error;
pub mod flush;
pub mod gateway;
pub mod pipeline;
pub mod poller;
pub mod publish;

pub use blob::{BlobStore, BlobUploader, UploadOutcome};
pub use error::SyncError;
pub use flush::CacheFlushSession;
pub use gateway::{Gateway, HttpGateway};
pub use pipeline::{Orchestrator, SyncOptions, SyncOutcome, SyncReport, TaskReport};
pub use poller::{Sleeper, TaskPoller, ThreadSleeper};
pub use publish::{PublishSession, SessionState};
