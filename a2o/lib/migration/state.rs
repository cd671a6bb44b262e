use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use getset::Getters;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Everything a migration needs to know about the aufs tree.
///
/// Built fresh by [`scan`](super::scan) for every migration and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct State {
    /// The layers in discovery order.
    layers: Vec<Layer>,
}

/// A single layer of an image.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Layer {
    /// The layer id, shared by the aufs and the overlay2 tree.
    id: String,

    /// The ancestors of the layer, closest parent first.
    parent_ids: Vec<String>,

    /// The markers found in the layer's own content, in discovery order.
    meta: Vec<Meta>,
}

/// A marker that has to be expressed differently in overlay2.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub with_prefix")]
pub struct Meta {
    /// What the marker means.
    kind: MetaKind,

    /// The affected path, relative to the layer's content root.
    path: PathBuf,
}

/// The meaning of a [`Meta`] marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// The directory hides everything below it in lower layers.
    Opaque,

    /// The path is deleted relative to lower layers.
    Whiteout,

    /// aufs bookkeeping with no overlay2 counterpart. Dropped.
    Other,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl State {
    /// Creates a new `State` from layers in discovery order.
    pub fn new(layers: Vec<Layer>) -> Self {
        Self { layers }
    }
}

impl Layer {
    /// Creates a new `Layer`.
    pub fn new(id: impl Into<String>, parent_ids: Vec<String>, meta: Vec<Meta>) -> Self {
        Self {
            id: id.into(),
            parent_ids,
            meta,
        }
    }
}

impl Meta {
    /// Creates a new `Meta`.
    pub fn new(kind: MetaKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Display for MetaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaKind::Opaque => write!(f, "opaque"),
            MetaKind::Whiteout => write!(f, "whiteout"),
            MetaKind::Other => write!(f, "whiteout-meta"),
        }
    }
}
