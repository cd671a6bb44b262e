//! Configuration types and defaults.

mod defaults;
mod storage_root;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use storage_root::*;
