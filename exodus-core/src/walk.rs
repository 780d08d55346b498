//! Local tree enumeration for `sync`.
//!
//! Produces one [`LocalEntry`] per regular file (and per symlink, when links
//! are preserved) under a source directory, with its destination path
//! already joined under the destination prefix. Ordering is by relative path
//! so repeated runs issue requests in the same order.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{io_err, CoreError};
use crate::paths::{join_dest, normalize_dest};

/// Traversal switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Publish symlinks as links instead of following them.
    pub links: bool,
}

/// A single local entry destined for the publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEntry {
    File { source: PathBuf, dest_path: String },
    Link { dest_path: String, target: String },
}

impl LocalEntry {
    pub fn dest_path(&self) -> &str {
        match self {
            LocalEntry::File { dest_path, .. } | LocalEntry::Link { dest_path, .. } => dest_path,
        }
    }
}

/// Enumerate `src` (a directory or a single file) under `dest_prefix`.
pub fn collect(
    src: &Path,
    dest_prefix: &str,
    options: WalkOptions,
) -> Result<Vec<LocalEntry>, CoreError> {
    let meta = std::fs::metadata(src).map_err(|e| io_err(src, e))?;
    if meta.is_file() {
        let name = src.file_name().ok_or_else(|| CoreError::InvalidPath {
            path: src.display().to_string(),
            reason: "source has no file name",
        })?;
        return Ok(vec![LocalEntry::File {
            source: src.to_path_buf(),
            dest_path: join_dest(dest_prefix, Path::new(name))?,
        }]);
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(src)
        .follow_links(!options.links)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| CoreError::InvalidPath {
                path: entry.path().display().to_string(),
                reason: "entry is outside the source tree",
            })?;
        let dest_path = join_dest(dest_prefix, relative)?;

        if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path()).map_err(|e| io_err(entry.path(), e))?;
            let target = resolve_link(src, dest_prefix, &dest_path, &target)?;
            tracing::debug!(dest = %dest_path, target = %target, "link");
            entries.push(LocalEntry::Link { dest_path, target });
        } else if file_type.is_file() {
            entries.push(LocalEntry::File {
                source: entry.into_path(),
                dest_path,
            });
        }
    }
    Ok(entries)
}

/// Map a symlink target onto the destination tree.
///
/// Relative targets are resolved against the link's own destination
/// directory. Absolute targets must point inside `src`.
fn resolve_link(
    src: &Path,
    dest_prefix: &str,
    link_dest: &str,
    target: &Path,
) -> Result<String, CoreError> {
    if target.is_absolute() {
        let inside = target.strip_prefix(src).map_err(|_| CoreError::InvalidPath {
            path: target.display().to_string(),
            reason: "symlink points outside the source tree",
        })?;
        return join_dest(dest_prefix, inside);
    }

    let mut segments: Vec<&str> = link_dest.split('/').filter(|s| !s.is_empty()).collect();
    // Drop the link's own name to get its directory.
    segments.pop();
    let target = target.to_string_lossy();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(CoreError::InvalidPath {
                        path: target.to_string(),
                        reason: "symlink escapes the destination root",
                    });
                }
            }
            p => segments.push(p),
        }
    }
    normalize_dest(&format!("/{}", segments.join("/")))
}
