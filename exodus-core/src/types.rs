//! Domain types for the publish and flush protocol.
//!
//! `Publish` and `Task` are client-side proxies of server objects. Their
//! `links` are carried verbatim from the gateway and are never rebuilt from
//! ids.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::paths::normalize_dest;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed environment name (e.g. `live`, `pre`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvName(pub String);

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server-assigned publish identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishId(pub String);

impl fmt::Display for PublishId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PublishId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Server-assigned task identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Lowercase hex SHA-256 digest of a blob; also its storage key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentKey(String);

impl ContentKey {
    /// Validate `s` as a 64-character lowercase hex digest.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let valid = s.len() == 64
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(CoreError::InvalidContentKey(s.to_owned()))
        }
    }

    /// Wrap an already-encoded digest. Only used by [`crate::digest`].
    pub(crate) fn from_digest(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for ContentKey {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ContentKey> for String {
    fn from(k: ContentKey) -> Self {
        k.0
    }
}

/// Validate a MIME type of the form `type/subtype[+suffix][;param=value]`.
pub fn parse_content_type(s: &str) -> Result<String, CoreError> {
    fn token(s: &str, extra: &[char]) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || extra.contains(&c))
    }

    let invalid = || CoreError::InvalidContentType(s.to_owned());
    let (mime, param) = match s.split_once(';') {
        Some((mime, param)) => (mime, Some(param)),
        None => (s, None),
    };
    let (kind, rest) = mime.split_once('/').ok_or_else(invalid)?;
    let (subtype, suffix) = match rest.split_once('+') {
        Some((subtype, suffix)) => (subtype, Some(suffix)),
        None => (rest, None),
    };
    let suffix_ok = suffix.map_or(true, |x| x.is_empty() || token(x, &[]));
    let param_ok = param.map_or(true, |p| {
        p.split_once('=')
            .is_some_and(|(k, v)| token(k, &[]) && token(v, &[]))
    });
    if token(kind, &[]) && token(subtype, &['.']) && suffix_ok && param_ok {
        Ok(s.to_owned())
    } else {
        Err(invalid())
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// What a destination path should expose once the publish is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemTarget {
    /// A previously uploaded blob.
    Object(ContentKey),
    /// Another published path (symlink semantics).
    Link(String),
    /// Nothing; removes the path from the CDN view.
    Absent,
}

/// One unit of work to sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Local content backing an [`ItemTarget::Object`]; `None` for links and
    /// absent markers.
    pub source: Option<PathBuf>,
    /// Normalized absolute destination path.
    pub dest_path: String,
    pub target: ItemTarget,
    /// MIME type sent with object items; the gateway guesses when unset.
    pub content_type: Option<String>,
}

impl Item {
    /// Unpublish marker for `dest_path`.
    pub fn absent(dest_path: &str) -> Result<Self, CoreError> {
        Ok(Self {
            source: None,
            dest_path: normalize_dest(dest_path)?,
            target: ItemTarget::Absent,
            content_type: None,
        })
    }

    /// Content key for object items.
    pub fn content_key(&self) -> Option<&ContentKey> {
        match &self.target {
            ItemTarget::Object(key) => Some(key),
            _ => None,
        }
    }

    /// Wire form for `PUT {publish.links.self}`.
    pub fn to_record(&self, from_date: &str) -> ItemRecord {
        let (object_key, link_to) = match &self.target {
            ItemTarget::Object(key) => (Some(key.to_string()), None),
            ItemTarget::Link(to) => (None, Some(to.clone())),
            ItemTarget::Absent => (Some("absent".to_string()), None),
        };
        ItemRecord {
            web_uri: self.dest_path.clone(),
            object_key,
            link_to,
            content_type: match self.target {
                ItemTarget::Object(_) => self.content_type.clone(),
                _ => None,
            },
            from_date: from_date.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server object proxies
// ---------------------------------------------------------------------------

/// Relation name → resource locator, exactly as the server sent it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(pub BTreeMap<String, String>);

impl Links {
    pub fn get(&self, rel: &str) -> Option<&str> {
        self.0.get(rel).map(String::as_str)
    }
}

/// Client-side proxy of a server publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publish {
    pub id: PublishId,
    #[serde(default)]
    pub links: Links,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// State of a server-side asynchronous task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    NotStarted,
    InProgress,
    Complete,
    Failed,
    /// Any state this client does not know; never terminal.
    #[serde(other)]
    Unknown,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Complete | TaskState::Failed)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::NotStarted => write!(f, "NOT_STARTED"),
            TaskState::InProgress => write!(f, "IN_PROGRESS"),
            TaskState::Complete => write!(f, "COMPLETE"),
            TaskState::Failed => write!(f, "FAILED"),
            TaskState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Client-side proxy of a server task (commit or flush).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    #[serde(default)]
    pub links: Links,
    /// Last transition timestamp; opaque, meaningful once terminal.
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// Body of one add-item request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub web_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub from_date: String,
}

/// One entry of a cache flush request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushRecord {
    pub web_uri: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
