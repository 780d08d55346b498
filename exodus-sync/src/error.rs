//! Error types for exodus-sync.

use thiserror::Error;

use exodus_core::{CoreError, Publish};

/// All errors that can arise from upload, publish, flush and polling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local hashing, walking or config failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Connection, TLS handshake or timeout failure. The only transient class.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// Non-2xx response. `detail` holds the gateway's error message when the
    /// body was parseable.
    #[error("{url} returned HTTP {status}{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status {
        url: String,
        status: u16,
        detail: Option<String>,
    },

    /// A 2xx response whose body was not the expected JSON.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization of a request body.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A server-provided locator could not be resolved against the base URL.
    #[error("invalid link '{link}': {source}")]
    InvalidLink {
        link: String,
        #[source]
        source: url::ParseError,
    },

    /// The server omitted a link relation the protocol depends on.
    #[error("{object} {id} has no '{rel}' link")]
    MissingLink {
        object: &'static str,
        id: String,
        rel: &'static str,
    },

    /// Client certificate, key or CA bundle could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// An add-item request failed; the publish was abandoned uncommitted.
    #[error("publish {} abandoned after {added} of {intended} items", .publish.id)]
    PartialPublish {
        publish: Box<Publish>,
        added: usize,
        intended: usize,
        #[source]
        source: Box<SyncError>,
    },

    /// Commit was requested before every intended item was added.
    #[error("refusing to commit publish {id}: {added} of {intended} items added")]
    IncompletePublish {
        id: String,
        added: usize,
        intended: usize,
    },

    /// A publish session method was called out of order.
    #[error("publish {id} is {state}; cannot {action}")]
    InvalidState {
        id: String,
        state: &'static str,
        action: &'static str,
    },

    /// `flush` was called without any paths.
    #[error("no paths given to flush")]
    NothingToFlush,
}

impl SyncError {
    /// Whether retrying the same request might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Transport { .. })
    }
}
