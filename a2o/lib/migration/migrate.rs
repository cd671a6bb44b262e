use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

use getset::Getters;
use nix::unistd::{self, Gid, Uid};

use crate::{
    config::{StorageRoot, AUFS_DRIVER, OVERLAY2_DRIVER},
    driver::{aufs, overlay2, MarkerWriter, Overlay2Markers},
    A2oError, A2oResult,
};

use super::{container, replicate, scan, Layer, MetaKind, State};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The phases a migration moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Nothing has happened yet.
    NotStarted,

    /// Checking the aufs tree exists and clearing leftovers of earlier attempts.
    Verifying,

    /// Building the [`State`] from the aufs tree.
    Scanning,

    /// Building a layer's overlay2 skeleton and hardlinking its content.
    Replicating,

    /// Turning a layer's aufs markers into overlay2 markers.
    TranslatingMetadata,

    /// Hardlinking the image metadata.
    PublishingImages,

    /// Moving the staging tree into place.
    Renaming,

    /// Pointing containers at overlay2.
    RewritingConfigs,

    /// The migration completed.
    Done,

    /// The migration stopped with an error. Run a fail-cleanup to recover.
    Failed,
}

/// Drives an aufs to overlay2 migration.
///
/// All overlay2 layer data is built below the staging root and only becomes visible under the
/// real overlay2 root through a single rename. The aufs tree is only read.
///
/// ## Examples
///
/// ```no_run
/// use a2o::{config::StorageRoot, migration::{Migrator, MigrationPhase}};
///
/// # fn example() -> a2o::A2oResult<()> {
/// let root = StorageRoot::default();
/// let mut migrator = Migrator::new(&root);
/// migrator.migrate()?;
/// assert_eq!(*migrator.get_phase(), MigrationPhase::Done);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Migrator<'a, M = Overlay2Markers> {
    /// The storage root being migrated.
    root: &'a StorageRoot,

    /// Writes the overlay2 whiteouts and opaque markers.
    markers: M,

    /// The phase the migration is in, or ended in.
    phase: MigrationPhase,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<'a> Migrator<'a> {
    /// Creates a new `Migrator` that writes real overlay2 markers.
    pub fn new(root: &'a StorageRoot) -> Self {
        Self::with_markers(root, Overlay2Markers)
    }
}

impl<'a, M: MarkerWriter> Migrator<'a, M> {
    /// Creates a new `Migrator` with a custom marker writer.
    pub fn with_markers(root: &'a StorageRoot, markers: M) -> Self {
        Self {
            root,
            markers,
            phase: MigrationPhase::NotStarted,
        }
    }

    /// Runs the migration to completion or to the first error.
    ///
    /// There is no rollback. A failed migration leaves the aufs tree intact and can be retried
    /// or reverted with [`fail_cleanup`](super::fail_cleanup). The aufs tree is kept after
    /// success as well; [`commit`](super::commit) deletes it.
    pub fn migrate(&mut self) -> A2oResult<()> {
        tracing::info!("starting aufs -> overlay2 migration");

        let result = self.run_phases();
        if result.is_err() {
            self.phase = MigrationPhase::Failed;
        }

        result
    }

    fn run_phases(&mut self) -> A2oResult<()> {
        self.step(MigrationPhase::Verifying, |m| m.verify())?;
        let state = self.step(MigrationPhase::Scanning, |m| scan(m.root))?;

        tracing::info!("moving {} layer(s) to overlay", state.get_layers().len());
        self.migrate_layers(&state)?;

        self.step(MigrationPhase::PublishingImages, |m| {
            tracing::info!("moving aufs images to overlay");
            replicate(
                &m.root.image(AUFS_DRIVER),
                &m.root.image(OVERLAY2_DRIVER),
            )
        })?;

        self.step(MigrationPhase::Renaming, |m| {
            tracing::info!("moving layer data from temporary location to overlay2 root");
            let staging = m.root.overlay2_staging();
            fs::rename(&staging, m.root.overlay2()).map_err(|e| A2oError::io(&staging, e))
        })?;

        self.step(MigrationPhase::RewritingConfigs, |m| {
            container::switch_all_containers_storage_driver(m.root, OVERLAY2_DRIVER)
        })?;

        self.phase = MigrationPhase::Done;
        tracing::info!("finished migration");

        Ok(())
    }

    fn step<T>(
        &mut self,
        phase: MigrationPhase,
        f: impl FnOnce(&Self) -> A2oResult<T>,
    ) -> A2oResult<T> {
        if self.phase != phase {
            tracing::info!("migration phase: {} -> {phase}", self.phase);
            self.phase = phase;
        }

        f(self).map_err(|e| e.in_phase(phase))
    }

    fn verify(&self) -> A2oResult<()> {
        aufs::check_root_exists(self.root)?;

        for overlay_root in [self.root.overlay2(), self.root.overlay2_staging()] {
            if overlay2::root_exists(&overlay_root)? {
                tracing::warn!("overlay root found at {}, cleaning up...", overlay_root.display());
                a2outils::remove_dir_if_exists(&overlay_root)?;
            }
        }

        let images = self.root.image(OVERLAY2_DRIVER);
        if a2outils::exists(&images, true)? {
            tracing::warn!("overlay image metadata found at {}, cleaning up...", images.display());
            a2outils::remove_dir_if_exists(&images)?;
        }

        Ok(())
    }

    fn migrate_layers(&mut self, state: &State) -> A2oResult<()> {
        for layer in state.get_layers() {
            let span = tracing::info_span!("layer", layer_id = %layer.get_id());
            let _enter = span.enter();

            let diff_dir = self.step(MigrationPhase::Replicating, |m| {
                m.replicate_layer(layer).map_err(|e| e.in_layer(layer.get_id()))
            })?;

            self.step(MigrationPhase::TranslatingMetadata, |m| {
                m.translate_meta(layer, &diff_dir)
                    .map_err(|e| e.in_layer(layer.get_id()))
            })?;

            tracing::debug!("done");
        }

        Ok(())
    }

    /// Builds the overlay2 skeleton of a layer and hardlinks its content. Returns the layer's
    /// overlay2 `diff` directory.
    fn replicate_layer(&self, layer: &Layer) -> A2oResult<PathBuf> {
        let staging = self.root.overlay2_staging();
        let layer_dir = overlay2::layer_dir(&staging, layer.get_id());

        tracing::debug!("creating base dir {}", layer_dir.display());
        replicate::create_dir(&layer_dir)?;

        tracing::debug!("creating layer link");
        overlay2::create_layer_link(&staging, layer.get_id())?;

        let mut lower = String::new();
        for parent_id in layer.get_parent_ids() {
            let parent_dir = overlay2::layer_dir(&staging, parent_id);
            if !a2outils::exists(&parent_dir, true)? {
                // Parents are materialized when first referenced and filled in once the walk
                // reaches them.
                tracing::debug!(
                    parent_layer_id = %parent_id,
                    "creating parent layer base dir {}",
                    parent_dir.display()
                );
                replicate::create_dir(&parent_dir)?;
            }

            let token = overlay2::create_layer_link(&staging, parent_id)?;
            lower = overlay2::append_lower(&lower, &token);
        }

        if !lower.is_empty() {
            let lower_file = layer_dir.join(overlay2::LOWER_FILENAME);
            tracing::debug!("creating lower at {}", lower_file.display());
            fs::write(&lower_file, &lower).map_err(|e| A2oError::io(&lower_file, e))?;

            let work_dir = layer_dir.join(overlay2::WORK_SUBDIR);
            tracing::debug!("creating work dir at {}", work_dir.display());
            replicate::create_dir(&work_dir)?;
        }

        tracing::debug!("hardlinking aufs data to overlay");
        let diff_dir = layer_dir.join(overlay2::DIFF_SUBDIR);
        let aufs_layer_dir = aufs::diff_dir(&self.root.aufs()).join(layer.get_id());
        replicate(&aufs_layer_dir, &diff_dir)?;

        Ok(diff_dir)
    }

    /// Replaces the aufs markers in a replicated layer with their overlay2 counterparts.
    fn translate_meta(&self, layer: &Layer, diff_dir: &Path) -> A2oResult<()> {
        tracing::debug!("processing {} metadata file(s)", layer.get_meta().len());

        for meta in layer.get_meta() {
            let kind = *meta.get_kind();
            let meta_path = diff_dir.join(meta.get_path());
            tracing::debug!(meta_type = %kind, "translating {} to overlay", meta.get_path().display());

            match kind {
                MetaKind::Opaque => {
                    self.markers.set_opaque(&meta_path)?;

                    let marker = meta_path.join(aufs::WHITEOUT_OPAQUE_DIR);
                    fs::remove_file(&marker).map_err(|e| A2oError::io(&marker, e))?;
                }
                MetaKind::Whiteout => {
                    let marker = whiteout_marker(&meta_path)?;
                    self.markers.set_whiteout(&meta_path)?;

                    let (uid, gid) = a2outils::ownership(&marker)?;
                    unistd::chown(&meta_path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid)))
                        .map_err(|e| A2oError::io(&meta_path, e.into()))?;

                    fs::remove_file(&marker).map_err(|e| A2oError::io(&marker, e))?;
                }
                MetaKind::Other => {
                    remove_marker(&meta_path)?;
                }
            }
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Migrates the storage root from aufs to overlay2.
///
/// See [`Migrator`] for the details.
pub fn migrate(root: &StorageRoot) -> A2oResult<()> {
    Migrator::new(root).migrate()
}

/// The aufs whiteout file that marks `path` as deleted.
fn whiteout_marker(path: &Path) -> A2oResult<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        A2oError::custom(anyhow::anyhow!(
            "whiteout path has no file name: {}",
            path.display()
        ))
    })?;

    Ok(path.with_file_name(aufs::whiteout_name(name)))
}

/// Removes an aufs bookkeeping entry. Some of them (`.wh..wh.plnk`, `.wh..wh.orph`) are
/// directories.
fn remove_marker(path: &Path) -> A2oResult<()> {
    let metadata = fs::symlink_metadata(path).map_err(|e| A2oError::io(path, e))?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .map_err(|e| A2oError::io(path, e))
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            MigrationPhase::NotStarted => "not started",
            MigrationPhase::Verifying => "verifying",
            MigrationPhase::Scanning => "scanning",
            MigrationPhase::Replicating => "replicating",
            MigrationPhase::TranslatingMetadata => "translating metadata",
            MigrationPhase::PublishingImages => "publishing images",
            MigrationPhase::Renaming => "renaming",
            MigrationPhase::RewritingConfigs => "rewriting configs",
            MigrationPhase::Done => "done",
            MigrationPhase::Failed => "failed",
        };
        write!(f, "{phase}")
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::ErrorKind;

    use super::*;

    #[test]
    fn test_whiteout_marker() -> anyhow::Result<()> {
        assert_eq!(
            whiteout_marker(Path::new("/diff/etc/motd"))?,
            Path::new("/diff/etc/.wh.motd")
        );
        assert!(whiteout_marker(Path::new("/")).is_err());
        Ok(())
    }

    #[test]
    fn test_migrate_without_aufs_root() -> anyhow::Result<()> {
        let temp = tempdir()?;
        let root = StorageRoot::new(temp.path());

        let mut migrator = Migrator::new(&root);
        let err = migrator.migrate().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.phase(), Some(MigrationPhase::Verifying));
        assert_eq!(*migrator.get_phase(), MigrationPhase::Failed);
        assert!(!root.overlay2_staging().exists());

        Ok(())
    }
}
