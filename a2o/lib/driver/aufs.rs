//! The parts of the aufs on-disk format the migration reads.
//!
//! aufs keeps every layer's content under `aufs/diff/<id>` and its ancestry in a plain text
//! file `aufs/layers/<id>`, one parent id per line, closest parent first. Deleted files and
//! opaque directories are recorded as sentinel files:
//!
//! ```text
//! .wh.<name>      <name> is deleted in this layer
//! .wh..wh..opq    the containing directory hides everything from lower layers
//! .wh..wh.<any>   other aufs bookkeeping (hardlink dirs, plink), meaningless elsewhere
//! ```

use std::{
    ffi::{OsStr, OsString},
    fs,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use crate::{
    config::{StorageRoot, AUFS_DRIVER},
    A2oError, A2oResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The prefix of every aufs whiteout file.
pub const WHITEOUT_PREFIX: &str = ".wh.";

/// The prefix of aufs whiteout files that carry metadata instead of a deletion.
pub const WHITEOUT_META_PREFIX: &str = ".wh..wh.";

/// The marker that makes its directory opaque.
pub const WHITEOUT_OPAQUE_DIR: &str = ".wh..wh..opq";

/// The sub directory holding layer content.
pub const DIFF_SUBDIR: &str = "diff";

/// The sub directory holding the parent id files.
pub const LAYERS_SUBDIR: &str = "layers";

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Fails with [`A2oError::RootNotFound`] unless the aufs tree exists.
pub fn check_root_exists(root: &StorageRoot) -> A2oResult<()> {
    let aufs_root = root.aufs();
    if !a2outils::exists(&aufs_root, true)? {
        return Err(A2oError::RootNotFound {
            driver: AUFS_DRIVER,
            path: aufs_root,
        });
    }

    Ok(())
}

/// The directory holding the content of every layer.
pub fn diff_dir(aufs_root: &Path) -> PathBuf {
    aufs_root.join(DIFF_SUBDIR)
}

/// Reads the parent ids of a layer, closest parent first.
///
/// Surrounding whitespace is trimmed and blank lines are skipped.
pub fn parent_ids(aufs_root: &Path, layer_id: &str) -> A2oResult<Vec<String>> {
    let path = aufs_root.join(LAYERS_SUBDIR).join(layer_id);
    let content = fs::read_to_string(&path).map_err(|e| A2oError::io(&path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Whether `name` is any kind of aufs whiteout file.
pub fn is_whiteout(name: &OsStr) -> bool {
    name.as_bytes().starts_with(WHITEOUT_PREFIX.as_bytes())
}

/// Whether `name` is an aufs whiteout file carrying metadata.
pub fn is_whiteout_meta(name: &OsStr) -> bool {
    name.as_bytes().starts_with(WHITEOUT_META_PREFIX.as_bytes())
}

/// Whether `name` is the opaque directory marker.
pub fn is_opaque_dir_marker(name: &OsStr) -> bool {
    name == WHITEOUT_OPAQUE_DIR
}

/// Returns the name of the file a whiteout deletes.
pub fn strip_whiteout_prefix(name: &OsStr) -> &OsStr {
    match name.as_bytes().strip_prefix(WHITEOUT_PREFIX.as_bytes()) {
        Some(stripped) => OsStr::from_bytes(stripped),
        None => name,
    }
}

/// Returns the name of the whiteout file that deletes `name`.
pub fn whiteout_name(name: &OsStr) -> OsString {
    let mut whiteout = OsString::from(WHITEOUT_PREFIX);
    whiteout.push(name);
    whiteout
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_whiteout_name_classification() {
        let name = OsStr::new;

        assert!(is_whiteout(name(".wh.foo")));
        assert!(is_whiteout(name(".wh..wh..opq")));
        assert!(!is_whiteout(name("foo")));
        assert!(!is_whiteout(name("foo.wh.bar")));

        assert!(is_whiteout_meta(name(".wh..wh..opq")));
        assert!(is_whiteout_meta(name(".wh..wh.plnk")));
        assert!(!is_whiteout_meta(name(".wh.foo")));

        assert!(is_opaque_dir_marker(name(".wh..wh..opq")));
        assert!(!is_opaque_dir_marker(name(".wh..wh.plnk")));

        assert_eq!(strip_whiteout_prefix(name(".wh.foo")), "foo");
        assert_eq!(strip_whiteout_prefix(name(".wh..hidden")), ".hidden");
        assert_eq!(strip_whiteout_prefix(name("foo")), "foo");
    }

    #[test]
    fn test_whiteout_name_round_trips_non_utf8() {
        let original = OsStr::from_bytes(b"caf\xe9");
        let whiteout = whiteout_name(original);

        assert_eq!(whiteout.as_bytes(), b".wh.caf\xe9");
        assert!(is_whiteout(&whiteout));
        assert_eq!(strip_whiteout_prefix(&whiteout), original);
    }

    #[test]
    fn test_parent_ids_keeps_order_and_skips_blank_lines() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let layers = temp.path().join(LAYERS_SUBDIR);
        fs::create_dir_all(&layers)?;
        fs::write(layers.join("child"), "parent\n  grandparent \n\n")?;
        fs::write(layers.join("base"), "")?;

        assert_eq!(
            parent_ids(temp.path(), "child")?,
            vec!["parent", "grandparent"]
        );
        assert!(parent_ids(temp.path(), "base")?.is_empty());
        assert!(matches!(
            parent_ids(temp.path(), "missing"),
            Err(A2oError::Io { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_check_root_exists() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let root = StorageRoot::new(temp.path());

        assert!(matches!(
            check_root_exists(&root),
            Err(A2oError::RootNotFound { driver: "aufs", .. })
        ));

        fs::create_dir(root.aufs())?;
        check_root_exists(&root)?;

        Ok(())
    }
}
