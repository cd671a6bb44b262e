use std::{
    fs::{self, Metadata, Permissions},
    os::unix::fs::{MetadataExt, PermissionsExt},
    path::{Path, PathBuf},
};

use getset::Getters;
use nix::unistd::{self, Gid, Uid};

use crate::{A2oError, A2oResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Tracks directories created during replication together with the ownership and permission
/// bits of the directory they mirror.
///
/// Replicated directories are created owner-only so the walk can always descend into them and
/// create children. The original attributes are put back by [`apply`](Self::apply) once the
/// walk is done, deepest directory first, so a restrictive mode never blocks later work.
///
/// # Example
/// ```no_run
/// use a2o::migration::DirAttributes;
///
/// # fn example(source: &std::fs::Metadata) -> a2o::A2oResult<()> {
/// let mut attrs = DirAttributes::new();
/// attrs.record("/target/dir", source);
///
/// // ... create the children of /target/dir ...
///
/// attrs.apply()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Getters)]
#[getset(get = "pub with_prefix")]
pub struct DirAttributes {
    /// Directories in the order they were created.
    pending: Vec<PendingDir>,
}

/// The attributes to restore on one directory.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct PendingDir {
    /// The created directory.
    path: PathBuf,

    /// The permission bits of the source directory, including setgid and sticky bits.
    mode: u32,

    /// The owning user of the source directory.
    uid: u32,

    /// The owning group of the source directory.
    gid: u32,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl DirAttributes {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers that `path` has to end up with the attributes in `source`.
    pub fn record(&mut self, path: impl AsRef<Path>, source: &Metadata) {
        self.pending.push(PendingDir {
            path: path.as_ref().to_path_buf(),
            mode: source.mode() & 0o7777,
            uid: source.uid(),
            gid: source.gid(),
        });
    }

    /// Applies the recorded attributes in reverse creation order.
    ///
    /// Ownership is changed before the mode because a chown clears setuid and setgid bits.
    pub fn apply(mut self) -> A2oResult<()> {
        while let Some(dir) = self.pending.pop() {
            let metadata = fs::symlink_metadata(&dir.path).map_err(|e| A2oError::io(&dir.path, e))?;

            if metadata.uid() != dir.uid || metadata.gid() != dir.gid {
                unistd::chown(
                    &dir.path,
                    Some(Uid::from_raw(dir.uid)),
                    Some(Gid::from_raw(dir.gid)),
                )
                .map_err(|e| A2oError::io(&dir.path, e.into()))?;
            }

            fs::set_permissions(&dir.path, Permissions::from_mode(dir.mode))
                .map_err(|e| A2oError::io(&dir.path, e))?;

            tracing::trace!(
                "restored attributes on {}: {}:{} {:#o}",
                dir.path.display(),
                dir.uid,
                dir.gid,
                dir.mode
            );
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_dir_attributes_restore_modes_after_children() -> anyhow::Result<()> {
        let temp = tempdir()?;

        let source = temp.path().join("source");
        fs::create_dir(&source)?;
        fs::set_permissions(&source, Permissions::from_mode(0o1755))?;

        let target = temp.path().join("target");
        fs::create_dir(&target)?;

        let mut attrs = DirAttributes::new();
        attrs.record(&target, &fs::metadata(&source)?);
        assert_eq!(attrs.get_pending().len(), 1);
        assert_eq!(*attrs.get_pending()[0].get_mode(), 0o1755);

        // The target stays writable until the attributes are applied
        fs::write(target.join("child"), "content")?;

        attrs.apply()?;
        assert_eq!(fs::metadata(&target)?.mode() & 0o7777, 0o1755);

        Ok(())
    }
}
