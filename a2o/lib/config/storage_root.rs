use std::path::{Path, PathBuf};

use getset::Getters;

use super::{
    AUFS_DRIVER, CONTAINERS_SUBDIR, CONTAINER_CONFIG_FILENAME, DEFAULT_STORAGE_ROOT,
    IMAGE_SUBDIR, OVERLAY2_DRIVER, OVERLAY2_STAGING_SUBDIR,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The engine's storage root and the locations derived from it.
///
/// It is constructed once at startup and handed by reference to every operation.
///
/// ## Examples
///
/// ```
/// use a2o::config::StorageRoot;
/// use std::path::Path;
///
/// let root = StorageRoot::new("/var/lib/balena-engine");
///
/// assert_eq!(root.aufs(), Path::new("/var/lib/balena-engine/aufs"));
/// assert_eq!(root.overlay2_staging(), Path::new("/var/lib/balena-engine/overlay2.temp"));
/// assert_eq!(root.image("overlay2"), Path::new("/var/lib/balena-engine/image/overlay2"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct StorageRoot {
    /// The storage root itself.
    path: PathBuf,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl StorageRoot {
    /// Creates a new `StorageRoot` at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The aufs layer tree.
    pub fn aufs(&self) -> PathBuf {
        self.path.join(AUFS_DRIVER)
    }

    /// The final overlay2 layer tree.
    pub fn overlay2(&self) -> PathBuf {
        self.path.join(OVERLAY2_DRIVER)
    }

    /// The overlay2 layer tree while it is being built.
    pub fn overlay2_staging(&self) -> PathBuf {
        self.path.join(OVERLAY2_STAGING_SUBDIR)
    }

    /// The image metadata directory of a storage driver.
    pub fn image(&self, driver: &str) -> PathBuf {
        self.path.join(IMAGE_SUBDIR).join(driver)
    }

    /// The directory holding all containers.
    pub fn containers(&self) -> PathBuf {
        self.path.join(CONTAINERS_SUBDIR)
    }

    /// The persisted configuration of a container.
    pub fn container_config(&self, container_id: &str) -> PathBuf {
        self.containers()
            .join(container_id)
            .join(CONTAINER_CONFIG_FILENAME)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for StorageRoot {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_ROOT)
    }
}

impl AsRef<Path> for StorageRoot {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
