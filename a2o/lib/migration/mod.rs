//! The aufs to overlay2 migration and its two follow-up operations.
//!
//! A storage root goes through these steps:
//!
//! 1. [`migrate`] builds an overlay2 tree next to the aufs tree, sharing all file content
//!    through hardlinks, and switches the containers over.
//! 2. Either [`commit`] deletes the aufs tree once the engine runs fine on overlay2, or
//!    [`fail_cleanup`] deletes the overlay2 tree and switches the containers back.

mod cleanup;
mod commit;
mod container;
mod dir_attrs;
mod migrate;
mod replicate;
mod scan;
mod state;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use cleanup::*;
pub use commit::*;
pub use container::*;
pub use dir_attrs::*;
pub use migrate::*;
pub use replicate::*;
pub use scan::scan;
pub use state::*;
