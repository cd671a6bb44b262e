//! On-disk formats of the two storage drivers involved in the migration.

pub mod aufs;
pub mod overlay2;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use overlay2::{MarkerWriter, Overlay2Markers};
