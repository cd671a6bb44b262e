//! The parts of the overlay2 on-disk format the migration writes.
//!
//! Every layer lives in `overlay2/<id>` and looks like this:
//!
//! ```text
//! overlay2/
//! ├── l/
//! │   └── <token> → ../<id>/diff   short name used in mount options
//! └── <id>/
//!     ├── diff/                    layer content
//!     ├── link                     contains <token>
//!     ├── lower                    l/<parent token>:l/<grandparent token>... (only with parents)
//!     └── work/                    overlayfs work dir (only with parents)
//! ```
//!
//! Deleted files are 0/0 character devices and opaque directories carry the
//! `trusted.overlay.opaque=y` extended attribute.

use std::{
    fs,
    io::{self, ErrorKind},
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};

use nix::sys::stat::{self, Mode, SFlag};
use rand::Rng;

use crate::{A2oError, A2oResult};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// The directory holding the short link names of all layers.
pub const LINK_DIR: &str = "l";

/// The file holding a layer's short link name.
pub const LINK_FILENAME: &str = "link";

/// The file listing a layer's lower directories.
pub const LOWER_FILENAME: &str = "lower";

/// The sub directory holding layer content.
pub const DIFF_SUBDIR: &str = "diff";

/// The overlayfs work directory of a layer.
pub const WORK_SUBDIR: &str = "work";

/// The length of a generated short link name.
pub const LINK_ID_LENGTH: usize = 26;

/// The separator between entries of a `lower` file.
pub const LOWER_SEPARATOR: &str = ":";

/// The extended attribute that makes a directory opaque.
pub const OPAQUE_XATTR: &str = "trusted.overlay.opaque";

/// The value of [`OPAQUE_XATTR`] on an opaque directory.
pub const OPAQUE_XATTR_VALUE: &[u8] = b"y";

const LINK_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Writes the overlay2 representation of whiteouts and opaque directories.
pub trait MarkerWriter {
    /// Marks the directory at `path` as opaque.
    fn set_opaque(&self, path: &Path) -> A2oResult<()>;

    /// Creates a whiteout at `path`.
    fn set_whiteout(&self, path: &Path) -> A2oResult<()>;
}

/// Writes markers the way the kernel's overlayfs expects them.
///
/// Needs `CAP_SYS_ADMIN` for the `trusted.*` attribute and `CAP_MKNOD` for the device node.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overlay2Markers;

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Whether an overlay2 tree exists at `overlay_root`.
pub fn root_exists(overlay_root: &Path) -> A2oResult<bool> {
    Ok(a2outils::exists(overlay_root, true)?)
}

/// The directory of a layer.
pub fn layer_dir(overlay_root: &Path, layer_id: &str) -> PathBuf {
    overlay_root.join(layer_id)
}

/// Returns the short link name of a layer, creating it first if the layer has none.
///
/// Creates `l/<token>` pointing at the layer's `diff` directory and records the token in the
/// layer's `link` file. The layer directory itself must already exist.
pub fn create_layer_link(overlay_root: &Path, layer_id: &str) -> A2oResult<String> {
    let link_file = layer_dir(overlay_root, layer_id).join(LINK_FILENAME);
    match fs::read_to_string(&link_file) {
        Ok(token) => {
            tracing::debug!("reusing layer link {} for {layer_id}", token.trim());
            return Ok(token.trim().to_string());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(A2oError::io(&link_file, e)),
    }

    let link_dir = overlay_root.join(LINK_DIR);
    fs::create_dir_all(&link_dir).map_err(|e| A2oError::io(&link_dir, e))?;

    let token = loop {
        let token = generate_link_id();
        let link_path = link_dir.join(&token);
        match symlink(Path::new("..").join(layer_id).join(DIFF_SUBDIR), &link_path) {
            Ok(()) => break token,
            // Collisions are astronomically rare, pick another name
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(A2oError::io(&link_path, e)),
        }
    };

    fs::write(&link_file, &token).map_err(|e| A2oError::io(&link_file, e))?;
    tracing::debug!("created layer link {token} for {layer_id}");

    Ok(token)
}

/// Appends a layer's short link name to a `lower` string.
///
/// Entries keep the order they were appended in, and the first one takes precedence.
pub fn append_lower(lower: &str, token: &str) -> String {
    let entry = format!("{LINK_DIR}/{token}");
    if lower.is_empty() {
        entry
    } else {
        format!("{lower}{LOWER_SEPARATOR}{entry}")
    }
}

fn generate_link_id() -> String {
    let mut rng = rand::rng();
    (0..LINK_ID_LENGTH)
        .map(|_| LINK_ID_ALPHABET[rng.random_range(0..LINK_ID_ALPHABET.len())] as char)
        .collect()
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl MarkerWriter for Overlay2Markers {
    fn set_opaque(&self, path: &Path) -> A2oResult<()> {
        xattr::set(path, OPAQUE_XATTR, OPAQUE_XATTR_VALUE).map_err(|e| A2oError::io(path, e))
    }

    fn set_whiteout(&self, path: &Path) -> A2oResult<()> {
        stat::mknod(path, SFlag::S_IFCHR, Mode::empty(), stat::makedev(0, 0))
            .map_err(|e| A2oError::io(path, io::Error::from(e)))
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
