use std::{
    fs::OpenOptions,
    io::{BufReader, Seek, SeekFrom, Write},
};

use getset::Getters;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{config::StorageRoot, A2oError, A2oResult};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The persisted configuration of a container (`config.v2.json`).
///
/// Only the storage driver is interpreted. Every other field is kept as it was read and
/// written back unchanged, in its original order. `Driver` itself is always written as the
/// first key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
#[getset(get = "pub with_prefix")]
pub struct ContainerConfig {
    /// The storage driver the container's filesystem lives on.
    #[serde(rename = "Driver", default)]
    driver: String,

    /// All other fields.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ContainerConfig {
    /// Sets the storage driver.
    pub fn set_driver(&mut self, driver: impl Into<String>) {
        self.driver = driver.into();
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Points every container under the storage root at `driver`.
///
/// Stops at the first container that fails. Containers rewritten before that keep the new
/// driver. A storage root without a containers directory has nothing to rewrite.
pub fn switch_all_containers_storage_driver(root: &StorageRoot, driver: &str) -> A2oResult<()> {
    let containers_dir = root.containers();
    if !a2outils::exists(&containers_dir, true)? {
        tracing::info!("no containers found at {}", containers_dir.display());
        return Ok(());
    }

    let container_ids = a2outils::list_ids(&containers_dir)?;
    tracing::info!("migrating {} container(s) to {driver}", container_ids.len());

    for container_id in container_ids {
        switch_container_storage_driver(root, &container_id, driver)
            .map_err(|e| e.in_container(&container_id))?;
        tracing::debug!(container_id, "reconfigured storage-driver to {driver}");
    }

    Ok(())
}

/// Rewrites a single container's configuration in place to use `driver`.
///
/// The file is decoded, truncated and re-encoded through the same handle and synced to disk
/// before returning.
pub fn switch_container_storage_driver(
    root: &StorageRoot,
    container_id: &str,
    driver: &str,
) -> A2oResult<()> {
    let path = root.container_config(container_id);
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| A2oError::io(&path, e))?;

    let mut config: ContainerConfig =
        serde_json::from_reader(BufReader::new(&file)).map_err(|source| {
            A2oError::ContainerConfig {
                path: path.clone(),
                source,
            }
        })?;
    config.set_driver(driver);

    let mut data = serde_json::to_vec(&config).map_err(|source| A2oError::ContainerConfig {
        path: path.clone(),
        source,
    })?;
    data.push(b'\n');

    file.set_len(0).map_err(|e| A2oError::io(&path, e))?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| A2oError::io(&path, e))?;
    file.write_all(&data).map_err(|e| A2oError::io(&path, e))?;
    file.sync_all().map_err(|e| A2oError::io(&path, e))?;

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
