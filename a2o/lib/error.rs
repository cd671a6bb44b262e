use std::{
    error::Error,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use a2outils::A2outilsError;
use thiserror::Error;

use crate::migration::MigrationPhase;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an a2o-related operation.
pub type A2oResult<T> = Result<T, A2oError>;

/// An error that occurred during a migration, commit or cleanup.
#[derive(pretty_error_debug::Debug, Error)]
pub enum A2oError {
    /// A storage driver root that must be present is missing.
    #[error("{driver} root not found at {}", path.display())]
    RootNotFound {
        /// The storage driver the root belongs to.
        driver: &'static str,

        /// The path that was expected to exist.
        path: PathBuf,
    },

    /// A layer names a parent that does not exist in the aufs tree.
    #[error("layer {layer_id} references missing parent layer {parent_id}")]
    MissingParentLayer {
        /// The layer holding the reference.
        layer_id: String,

        /// The parent that could not be found.
        parent_id: String,
    },

    /// A layer lists itself as one of its parents.
    #[error("layer {0} lists itself as a parent")]
    SelfParentLayer(String),

    /// An I/O error on a specific path.
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// The path the operation was performed on.
        path: PathBuf,

        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A metadata marker resolved to a path outside of its layer.
    #[error("invalid metadata path: {0}")]
    InvalidMetaPath(#[source] A2outilsError),

    /// A container configuration could not be decoded or encoded.
    #[error("invalid container config at {}: {source}", path.display())]
    ContainerConfig {
        /// The path of the config file.
        path: PathBuf,

        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// An error that occurred while processing a specific layer.
    #[error("layer {layer_id}: {source}")]
    Layer {
        /// The id of the layer being processed.
        layer_id: String,

        /// The underlying error.
        #[source]
        source: Box<A2oError>,
    },

    /// An error that occurred while rewriting a specific container.
    #[error("container {container_id}: {source}")]
    Container {
        /// The id of the container being rewritten.
        container_id: String,

        /// The underlying error.
        #[source]
        source: Box<A2oError>,
    },

    /// An error that ended a migration in a specific phase.
    #[error("migration failed while {phase}: {source}")]
    Phase {
        /// The phase the migration was in.
        phase: MigrationPhase,

        /// The underlying error.
        #[source]
        source: Box<A2oError>,
    },

    /// An error from the filesystem utilities.
    #[error(transparent)]
    Utils(#[from] A2outilsError),

    /// An error that can represent any error.
    #[error(transparent)]
    Custom(#[from] AnyError),
}

/// The broad class of an [`A2oError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The expected source tree is missing or the source tree is inconsistent. Nothing was
    /// mutated.
    Precondition,

    /// A filesystem call failed.
    Io,

    /// A container configuration is malformed.
    Decode,
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl A2oError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> A2oError {
        A2oError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Wraps an IO error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> A2oError {
        A2oError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Attaches the id of the layer being processed.
    pub fn in_layer(self, layer_id: impl Into<String>) -> A2oError {
        A2oError::Layer {
            layer_id: layer_id.into(),
            source: Box::new(self),
        }
    }

    /// Attaches the id of the container being rewritten.
    pub fn in_container(self, container_id: impl Into<String>) -> A2oError {
        A2oError::Container {
            container_id: container_id.into(),
            source: Box::new(self),
        }
    }

    /// Attaches the migration phase the error ended.
    pub fn in_phase(self, phase: MigrationPhase) -> A2oError {
        A2oError::Phase {
            phase,
            source: Box::new(self),
        }
    }

    /// Classifies the error, looking through the contextual wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            A2oError::RootNotFound { .. }
            | A2oError::MissingParentLayer { .. }
            | A2oError::SelfParentLayer(_)
            | A2oError::InvalidMetaPath(_) => ErrorKind::Precondition,
            A2oError::ContainerConfig { .. } => ErrorKind::Decode,
            A2oError::Layer { source, .. }
            | A2oError::Container { source, .. }
            | A2oError::Phase { source, .. } => source.kind(),
            A2oError::Utils(A2outilsError::PathValidation(_)) => ErrorKind::Precondition,
            A2oError::Io { .. } | A2oError::Utils(_) | A2oError::Custom(_) => ErrorKind::Io,
        }
    }

    /// Returns the phase a migration failed in, if the error came out of one.
    pub fn phase(&self) -> Option<MigrationPhase> {
        match self {
            A2oError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

impl AnyError {
    /// Downcasts the error to a `T`.
    pub fn downcast<T>(&self) -> Option<&T>
    where
        T: Display + fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<T>()
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Creates an `Ok` `A2oResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> A2oResult<T> {
    Result::Ok(value)
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl PartialEq for AnyError {
    fn eq(&self, other: &Self) -> bool {
        self.error.to_string() == other.error.to_string()
    }
}

impl Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl Error for AnyError {}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_looks_through_context() {
        let err = A2oError::MissingParentLayer {
            layer_id: "child".to_string(),
            parent_id: "parent".to_string(),
        }
        .in_layer("child")
        .in_phase(MigrationPhase::Scanning);

        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.phase(), Some(MigrationPhase::Scanning));

        let err = A2oError::io("/var/lib/x", std::io::Error::other("boom")).in_container("abc");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("container abc"));
        assert!(err.to_string().contains("/var/lib/x"));

        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = A2oError::ContainerConfig {
            path: PathBuf::from("config.v2.json"),
            source: decode,
        };
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
