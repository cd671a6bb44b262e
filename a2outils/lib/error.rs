//! `a2outils::error` is a module containing error utilities for the a2o migration tool.

use std::{
    error::Error,
    fmt::{self, Display},
    path::{Path, PathBuf},
};

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an a2outils-related operation.
pub type A2outilsResult<T> = Result<T, A2outilsError>;

/// An error that occurred during a file system or path operation.
#[derive(pretty_error_debug::Debug, Error)]
pub enum A2outilsError {
    /// An error that occurred when validating paths
    #[error("path validation error: {0}")]
    PathValidation(String),

    /// An error that occurred when performing an IO operation on a path
    #[error("io error at {}: {source}", path.display())]
    Io {
        /// The path the operation was performed on.
        path: PathBuf,

        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Custom error.
    #[error("Custom error: {0}")]
    Custom(#[from] AnyError),
}

/// An error that can represent any error.
#[derive(Debug)]
pub struct AnyError {
    error: anyhow::Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl A2outilsError {
    /// Creates a new `Err` result.
    pub fn custom(error: impl Into<anyhow::Error>) -> A2outilsError {
        A2outilsError::Custom(AnyError {
            error: error.into(),
        })
    }

    /// Wraps an IO error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> A2outilsError {
        A2outilsError::Io {
            path: path.as_ref().to_path_buf(),
            source,
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

/// Creates an `Ok` `A2outilsResult`.
#[allow(non_snake_case)]
pub fn Ok<T>(value: T) -> A2outilsResult<T> {
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
