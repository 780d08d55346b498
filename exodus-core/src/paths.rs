//! Destination path rules.
//!
//! A normalized destination path has exactly one leading `/`, no empty,
//! `.` or `..` segments and no trailing `/`. The root is `/`.

use std::path::{Component, Path};

use crate::error::CoreError;

/// Normalize a destination path, rejecting `..` segments.
pub fn normalize_dest(path: &str) -> Result<String, CoreError> {
    if path.trim().is_empty() {
        return Err(CoreError::InvalidPath {
            path: path.to_string(),
            reason: "path is empty",
        });
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(CoreError::InvalidPath {
                    path: path.to_string(),
                    reason: "'..' segments are not allowed",
                })
            }
            s => segments.push(s),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Join a local relative path under a destination prefix.
///
/// Local separators are translated to `/`; anything other than plain
/// components (absolute roots, `..`) is rejected.
pub fn join_dest(prefix: &str, relative: &Path) -> Result<String, CoreError> {
    let mut joined = normalize_dest(prefix)?;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !joined.ends_with('/') {
                    joined.push('/');
                }
                joined.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => {
                return Err(CoreError::InvalidPath {
                    path: relative.display().to_string(),
                    reason: "relative path escapes the destination",
                })
            }
        }
    }
    normalize_dest(&joined)
}
