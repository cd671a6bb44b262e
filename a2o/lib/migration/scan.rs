use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
};

use a2outils::SupportedPathType;
use walkdir::WalkDir;

use crate::{config::StorageRoot, driver::aufs, A2oError, A2oResult};

use super::{Layer, Meta, MetaKind, State};

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Scans the aufs tree and builds the [`State`] a migration works from.
///
/// Every directory below `aufs/diff` becomes one layer. Its parents are read from
/// `aufs/layers/<id>` and its content is walked for whiteout files, which are classified as:
///
/// - `.wh..wh..opq`: [`MetaKind::Opaque`] on the directory containing the marker
/// - any other `.wh..wh.*`: [`MetaKind::Other`] on the marker itself
/// - `.wh.<name>`: [`MetaKind::Whiteout`] on the sibling `<name>`
///
/// Ordinary content is not recorded. Parent references are checked once all layers are known:
/// a layer naming itself or a layer that is not in the aufs tree fails the scan.
///
/// This does not modify the filesystem.
pub fn scan(root: &StorageRoot) -> A2oResult<State> {
    let aufs_root = root.aufs();
    let diff_dir = aufs::diff_dir(&aufs_root);

    let layer_ids = a2outils::list_ids(&diff_dir)?;
    tracing::debug!("layer ids in {}: {layer_ids:?}", diff_dir.display());

    let mut layers = Vec::with_capacity(layer_ids.len());
    for layer_id in layer_ids {
        let layer = scan_layer(&aufs_root, &layer_id).map_err(|e| e.in_layer(&layer_id))?;
        layers.push(layer);
    }

    check_parents(&layers)?;

    Ok(State::new(layers))
}

fn scan_layer(aufs_root: &Path, layer_id: &str) -> A2oResult<Layer> {
    tracing::debug!(layer_id, "parsing layer");

    let parent_ids = aufs::parent_ids(aufs_root, layer_id)?;
    let layer_dir = aufs::diff_dir(aufs_root).join(layer_id);
    let meta = scan_meta(&layer_dir)?;

    Ok(Layer::new(layer_id, parent_ids, meta))
}

fn scan_meta(layer_dir: &Path) -> A2oResult<Vec<Meta>> {
    let mut meta = Vec::new();

    for entry in WalkDir::new(layer_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(layer_dir, e))?;
        if entry.depth() == 0 {
            continue;
        }

        let name = entry.file_name();
        if !aufs::is_whiteout(name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(layer_dir)
            .map_err(A2oError::custom)?;
        let parent = relative
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let (kind, path) = if aufs::is_whiteout_meta(name) {
            if aufs::is_opaque_dir_marker(name) {
                (MetaKind::Opaque, parent.to_path_buf())
            } else {
                (MetaKind::Other, relative.to_path_buf())
            }
        } else {
            (
                MetaKind::Whiteout,
                parent.join(aufs::strip_whiteout_prefix(name)),
            )
        };

        let path = a2outils::normalize_path(&path, SupportedPathType::Relative)
            .map_err(A2oError::InvalidMetaPath)?;

        tracing::debug!(path = %relative.display(), "discovered {kind} marker");
        meta.push(Meta::new(kind, path));
    }

    Ok(meta)
}

fn check_parents(layers: &[Layer]) -> A2oResult<()> {
    let known: HashSet<&str> = layers.iter().map(|l| l.get_id().as_str()).collect();

    for layer in layers {
        for parent_id in layer.get_parent_ids() {
            if parent_id == layer.get_id() {
                return Err(A2oError::SelfParentLayer(layer.get_id().clone()));
            }

            if !known.contains(parent_id.as_str()) {
                return Err(A2oError::MissingParentLayer {
                    layer_id: layer.get_id().clone(),
                    parent_id: parent_id.clone(),
                });
            }
        }
    }

    Ok(())
}

pub(super) fn walk_error(root: &Path, error: walkdir::Error) -> A2oError {
    let path = error
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(root));
    A2oError::io(path, io::Error::from(error))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
