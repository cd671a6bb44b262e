//! `a2outils::path` is a module containing path utilities for the a2o migration tool.

use std::{
    ffi::OsStr,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use typed_path::{UnixComponent, UnixPath};

use crate::{A2outilsError, A2outilsResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The type of a supported path.
pub enum SupportedPathType {
    /// Any path type.
    Any,

    /// An absolute path.
    Absolute,

    /// A relative path.
    Relative,
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Normalizes a path lexically, without touching the filesystem.
///
/// Rules:
/// - Resolves . and .. components where possible
/// - Prevents path traversal that would escape the root
/// - Removes redundant separators and trailing slashes
/// - Works on raw bytes, so non UTF-8 file names are kept as they are
/// - Can enforce path type requirements (absolute, relative, or any)
///
/// A relative path that normalizes to nothing (e.g. `.`) is returned as an empty path, which
/// joins onto a base as the base itself.
///
/// # Arguments
/// * `path` - The path to normalize
/// * `path_type` - The required path type (absolute, relative, or any)
///
/// # Returns
/// An error if the path is invalid, would escape root, or doesn't meet path type requirement
pub fn normalize_path(
    path: impl AsRef<Path>,
    path_type: SupportedPathType,
) -> A2outilsResult<PathBuf> {
    let raw = path.as_ref().as_os_str().as_bytes();
    if raw.is_empty() {
        return Err(A2outilsError::PathValidation(
            "Path cannot be empty".to_string(),
        ));
    }

    let mut normalized: Vec<&[u8]> = Vec::new();
    let mut is_absolute = false;

    for (idx, component) in UnixPath::new(raw).components().enumerate() {
        match component {
            UnixComponent::RootDir => {
                if idx == 0 {
                    is_absolute = true;
                } else {
                    return Err(A2outilsError::PathValidation(
                        "Invalid path: root component '/' found in middle of path".to_string(),
                    ));
                }
            }
            UnixComponent::ParentDir => {
                if normalized.pop().is_none() {
                    return Err(A2outilsError::PathValidation(format!(
                        "Invalid path: {} traverses above its root directory",
                        path.as_ref().display()
                    )));
                }
            }
            UnixComponent::CurDir => continue,
            UnixComponent::Normal(c) => {
                if !c.is_empty() {
                    normalized.push(c);
                }
            }
        }
    }

    match path_type {
        SupportedPathType::Absolute if !is_absolute => {
            return Err(A2outilsError::PathValidation(format!(
                "Path must be absolute (start with '/'): {}",
                path.as_ref().display()
            )));
        }
        SupportedPathType::Relative if is_absolute => {
            return Err(A2outilsError::PathValidation(format!(
                "Path must be relative (must not start with '/'): {}",
                path.as_ref().display()
            )));
        }
        _ => {}
    }

    let mut out = if is_absolute {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };

    for component in normalized {
        out.push(OsStr::from_bytes(component));
    }

    Ok(out)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
