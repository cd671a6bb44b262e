//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The storage root used by the engine when nothing else is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "/var/lib/balena-engine";

/// The environment variable that overrides the storage root.
pub const STORAGE_ROOT_ENV_VAR: &str = "BALENA_A2O_STORAGE_ROOT";

/// The name of the aufs storage driver.
pub const AUFS_DRIVER: &str = "aufs";

/// The name of the overlay2 storage driver.
pub const OVERLAY2_DRIVER: &str = "overlay2";

/// The sub directory the overlay2 tree is built in before it is renamed into place.
pub const OVERLAY2_STAGING_SUBDIR: &str = "overlay2.temp";

/// The sub directory holding per-driver image metadata.
pub const IMAGE_SUBDIR: &str = "image";

/// The sub directory holding per-container state.
pub const CONTAINERS_SUBDIR: &str = "containers";

/// The file name of a container's persisted configuration.
pub const CONTAINER_CONFIG_FILENAME: &str = "config.v2.json";
