//! `a2outils` is a library containing filesystem and path utilities for the a2o migration tool.

#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod error;
pub mod fs;
pub mod path;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use error::*;
pub use fs::*;
pub use path::*;
