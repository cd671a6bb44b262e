use std::{
    fs::{self, DirBuilder},
    os::unix::fs::DirBuilderExt,
    path::Path,
};

use walkdir::WalkDir;

use crate::{A2oError, A2oResult};

use super::{scan::walk_error, DirAttributes};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The mode directories are created with while a tree is being built.
pub const BUILD_DIR_MODE: u32 = 0o700;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Mirrors `source_dir` into `target_dir` using hardlinks.
///
/// Directories are created before anything inside them. Every other entry (regular files,
/// symlinks, device nodes, fifos) is hardlinked, so the content is shared with the source
/// instead of copied. Both trees must live on the same filesystem.
///
/// Created directories get the ownership and mode of their source once the whole tree is in
/// place; [`BUILD_DIR_MODE`] only applies while the tree is being built. Nothing is rolled back
/// on failure.
pub fn replicate(source_dir: &Path, target_dir: &Path) -> A2oResult<()> {
    let mut attrs = DirAttributes::new();

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(source_dir, e))?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(A2oError::custom)?;
        let target_path = if relative.as_os_str().is_empty() {
            target_dir.to_path_buf()
        } else {
            target_dir.join(relative)
        };

        if entry.file_type().is_dir() {
            tracing::trace!(path = %target_path.display(), "creating directory");
            create_dir(&target_path)?;

            let metadata = entry.metadata().map_err(|e| walk_error(source_dir, e))?;
            attrs.record(&target_path, &metadata);
        } else {
            tracing::trace!(path = %target_path.display(), "creating hardlink");
            fs::hard_link(entry.path(), &target_path)
                .map_err(|e| A2oError::io(&target_path, e))?;
        }
    }

    attrs.apply()
}

/// Creates a directory and any missing parents with [`BUILD_DIR_MODE`].
pub fn create_dir(path: &Path) -> A2oResult<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(BUILD_DIR_MODE)
        .create(path)
        .map_err(|e| A2oError::io(path, e))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    use tempfile::tempdir;

    use crate::ErrorKind;

    use super::*;

    #[test_log::test]
    fn test_replicate_hardlinks_files() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let source = temp.path().join("source");
        let target = temp.path().join("target");

        fs::create_dir_all(source.join("usr/bin"))?;
        fs::create_dir_all(source.join("empty"))?;
        fs::write(source.join("usr/bin/tool"), "binary")?;
        fs::write(source.join("README"), "hello")?;
        std::os::unix::fs::symlink("usr/bin/tool", source.join("tool"))?;

        replicate(&source, &target)?;

        for file in ["usr/bin/tool", "README"] {
            let src = fs::metadata(source.join(file))?;
            let dst = fs::metadata(target.join(file))?;
            assert_eq!(src.ino(), dst.ino(), "{file} should share the inode");
            assert_eq!(src.dev(), dst.dev());
            assert_eq!(dst.nlink(), 2);
        }

        assert!(target.join("empty").is_dir());
        assert_eq!(fs::read_link(target.join("tool"))?, Path::new("usr/bin/tool"));
        assert_eq!(fs::read_to_string(target.join("README"))?, "hello");

        Ok(())
    }

    #[test]
    fn test_replicate_keeps_directory_modes() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let source = temp.path().join("source");
        let target = temp.path().join("target");

        fs::create_dir_all(source.join("tmp"))?;
        fs::create_dir_all(source.join("etc"))?;
        fs::write(source.join("etc/hostname"), "box")?;
        fs::set_permissions(source.join("tmp"), fs::Permissions::from_mode(0o1777))?;
        fs::set_permissions(source.join("etc"), fs::Permissions::from_mode(0o755))?;

        replicate(&source, &target)?;

        assert_eq!(fs::metadata(target.join("tmp"))?.mode() & 0o7777, 0o1777);
        assert_eq!(fs::metadata(target.join("etc"))?.mode() & 0o7777, 0o755);

        Ok(())
    }

    #[test]
    fn test_replicate_fails_on_existing_target_file() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let source = temp.path().join("source");
        let target = temp.path().join("target");

        fs::create_dir_all(&source)?;
        fs::create_dir_all(&target)?;
        fs::write(source.join("file"), "new")?;
        fs::write(target.join("file"), "old")?;

        let err = replicate(&source, &target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(err, A2oError::Io { ref path, .. } if path == &target.join("file")));

        Ok(())
    }

    #[test]
    fn test_replicate_missing_source() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let err = replicate(&temp.path().join("missing"), &temp.path().join("target"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        Ok(())
    }
}
