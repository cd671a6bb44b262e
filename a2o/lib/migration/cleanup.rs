use crate::{
    config::{StorageRoot, AUFS_DRIVER, OVERLAY2_DRIVER},
    A2oResult,
};

use super::container;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Reverts a failed or unwanted migration.
///
/// Deletes everything a migration creates (the staging root, the overlay2 root and the overlay2
/// image metadata) and points every container back at aufs. The aufs tree is never touched, so
/// after this the storage root is back to its pre-migration state.
pub fn fail_cleanup(root: &StorageRoot) -> A2oResult<()> {
    tracing::info!("cleaning up after failed migration");

    for dir in [
        root.overlay2_staging(),
        root.overlay2(),
        root.image(OVERLAY2_DRIVER),
    ] {
        a2outils::remove_dir_if_exists(&dir)?;
    }

    container::switch_all_containers_storage_driver(root, AUFS_DRIVER)?;

    tracing::info!("finished cleanup");
    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
