//! `a2outils::fs` is a module containing filesystem probes for the a2o migration tool.

use std::{fs, io, path::Path};

use nix::sys::stat;

use crate::{A2outilsError, A2outilsResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks if a file (or, if `is_dir` is set, a directory) exists at `path`.
///
/// A path that exists but is of the other kind is reported as missing. Errors other than
/// "not found" are returned as they are.
pub fn exists(path: impl AsRef<Path>, is_dir: bool) -> A2outilsResult<bool> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_dir() == is_dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(A2outilsError::io(path, e)),
    }
}

/// Returns the owning user and group id of `path`.
pub fn ownership(path: impl AsRef<Path>) -> A2outilsResult<(u32, u32)> {
    let path = path.as_ref();
    let st = stat::stat(path).map_err(|e| A2outilsError::io(path, e.into()))?;
    Ok((st.st_uid, st.st_gid))
}

/// Lists the names of all directories directly below `root`, sorted by name.
///
/// Regular files and symlinks are skipped. This is how both layer ids and container ids are
/// discovered.
pub fn list_ids(root: impl AsRef<Path>) -> A2outilsResult<Vec<String>> {
    let root = root.as_ref();
    let mut ids = Vec::new();

    for entry in fs::read_dir(root).map_err(|e| A2outilsError::io(root, e))? {
        let entry = entry.map_err(|e| A2outilsError::io(root, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| A2outilsError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }

        let id = entry.file_name().into_string().map_err(|name| {
            A2outilsError::PathValidation(format!(
                "directory name is not valid UTF-8: {}",
                name.to_string_lossy()
            ))
        })?;
        ids.push(id);
    }

    ids.sort();
    Ok(ids)
}

/// Recursively removes the directory at `path` if it exists.
///
/// Returns whether anything was removed.
pub fn remove_dir_if_exists(path: impl AsRef<Path>) -> A2outilsResult<bool> {
    let path = path.as_ref();
    if !exists(path, true)? {
        tracing::debug!("nothing to remove at {}", path.display());
        return Ok(false);
    }

    tracing::info!("removing {}", path.display());
    fs::remove_dir_all(path).map_err(|e| A2outilsError::io(path, e))?;
    Ok(true)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::os::unix::fs::MetadataExt;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_exists() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("dir");
        let file = temp.path().join("file");
        fs::create_dir(&dir)?;
        fs::write(&file, "content")?;

        assert!(exists(&dir, true)?);
        assert!(!exists(&dir, false)?);
        assert!(exists(&file, false)?);
        assert!(!exists(&file, true)?);
        assert!(!exists(temp.path().join("missing"), true)?);
        assert!(!exists(temp.path().join("missing"), false)?);

        Ok(())
    }

    #[test]
    fn test_ownership_matches_metadata() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let file = temp.path().join("file");
        fs::write(&file, "content")?;

        let metadata = fs::metadata(&file)?;
        assert_eq!(ownership(&file)?, (metadata.uid(), metadata.gid()));

        assert!(matches!(
            ownership(temp.path().join("missing")),
            Err(A2outilsError::Io { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_list_ids_only_returns_directories_sorted() -> anyhow::Result<()> {
        let temp = tempdir()?;
        fs::create_dir(temp.path().join("cccc"))?;
        fs::create_dir(temp.path().join("aaaa"))?;
        fs::create_dir(temp.path().join("bbbb"))?;
        fs::write(temp.path().join("not-a-layer"), "")?;
        std::os::unix::fs::symlink("aaaa", temp.path().join("link"))?;

        assert_eq!(list_ids(temp.path())?, vec!["aaaa", "bbbb", "cccc"]);

        assert!(matches!(
            list_ids(temp.path().join("missing")),
            Err(A2outilsError::Io { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_remove_dir_if_exists() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let dir = temp.path().join("overlay2");
        fs::create_dir_all(dir.join("nested/deeper"))?;
        fs::write(dir.join("nested/file"), "content")?;

        assert!(remove_dir_if_exists(&dir)?);
        assert!(!dir.exists());

        // Second call is a no-op
        assert!(!remove_dir_if_exists(&dir)?);

        Ok(())
    }
}
