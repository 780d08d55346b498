//! Exodus core library: domain types, content addressing, config, errors.
//!
//! Public API surface:
//! - [`types`]: newtypes, items, publish and task proxies, wire records
//! - [`digest`]: streaming SHA-256 content keys
//! - [`paths`]: destination path normalization
//! - [`walk`]: local tree enumeration
//! - [`config`]: YAML config load + settings resolution
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod digest;
pub mod error;
pub mod paths;
pub mod types;
pub mod walk;

pub use config::{Config, Overrides, Settings};
pub use error::CoreError;
pub use types::{
    ContentKey, EnvName, FlushRecord, Item, ItemRecord, ItemTarget, Links, Publish, PublishId,
    Task, TaskId, TaskState,
};
