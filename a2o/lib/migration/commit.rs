use crate::{config::{StorageRoot, AUFS_DRIVER}, A2oResult};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Deletes the aufs tree and the aufs image metadata after a successful migration.
///
/// Missing directories are not an error, so a commit can be repeated. Nothing checks that a
/// migration actually finished; running this before one has means losing all layer data.
pub fn commit(root: &StorageRoot) -> A2oResult<()> {
    tracing::info!("committing aufs -> overlay2 migration");

    let aufs_root = root.aufs();
    if a2outils::remove_dir_if_exists(&aufs_root)? {
        tracing::info!("removed aufs root {}", aufs_root.display());
    }

    let aufs_images = root.image(AUFS_DRIVER);
    if a2outils::remove_dir_if_exists(&aufs_images)? {
        tracing::info!("removed aufs image metadata {}", aufs_images.display());
    }

    tracing::info!("finished commit");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
