//! `a2o` migrates a balena-engine storage root from the aufs storage driver to overlay2.
//!
//! # Overview
//!
//! Layer content is never copied. Every file of every aufs layer is hardlinked into an overlay2
//! layer next to it, so a migration needs barely any extra disk space and takes time in the
//! order of the number of files rather than their size. What differs between the two drivers is
//! translated along the way:
//!
//! - aufs `.wh.<name>` whiteouts become 0/0 character devices
//! - aufs `.wh..wh..opq` markers become the `trusted.overlay.opaque` extended attribute
//! - the aufs parent list of a layer becomes overlay2 `link` and `lower` files
//!
//! A migration is split in three operations that are run at different times:
//!
//! - [`migration::migrate`] builds the overlay2 tree below a staging directory, moves it into
//!   place with a single rename and switches the containers to overlay2
//! - [`migration::commit`] deletes the aufs tree once the engine is known to work on overlay2
//! - [`migration::fail_cleanup`] deletes the overlay2 tree and switches the containers back
//!
//! The aufs tree is read only until a commit, so a migration can be retried or reverted at any
//! point before that.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use a2o::{config::StorageRoot, migration};
//!
//! fn main() -> a2o::A2oResult<()> {
//!     let root = StorageRoot::new("/var/lib/balena-engine");
//!
//!     if let Err(e) = migration::migrate(&root) {
//!         tracing::error!("migration failed: {e}");
//!         migration::fail_cleanup(&root)?;
//!         return Err(e);
//!     }
//!
//!     // ... restart the engine on overlay2 and check it works ...
//!
//!     migration::commit(&root)
//! }
//! ```
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument parsing
//! - [`config`] - The storage root layout and defaults
//! - [`driver`] - The aufs and overlay2 on-disk formats
//! - [`migration`] - Migrate, commit and fail-cleanup

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod cli;
pub mod config;
pub mod driver;
pub mod migration;

pub use error::*;
