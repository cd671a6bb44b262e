use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_STORAGE_ROOT, STORAGE_ROOT_ENV_VAR};

use super::styles;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// a2o-migrate - Moves a balena-engine storage root from aufs to overlay2
#[derive(Debug, Parser)]
#[command(name = "a2o-migrate", author, about, version, styles=styles::styles())]
pub struct A2oArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<A2oSubcommand>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// The engine's storage root
    #[arg(
        long,
        value_name = "PATH",
        env = STORAGE_ROOT_ENV_VAR,
        default_value = DEFAULT_STORAGE_ROOT
    )]
    pub storage_root: PathBuf,
}

/// Available subcommands
#[derive(Debug, Parser)]
pub enum A2oSubcommand {
    /// Build the overlay2 tree from the aufs tree and switch containers to overlay2
    #[command(name = "migrate")]
    Migrate,

    /// Delete the aufs tree after a successful migration
    #[command(name = "commit")]
    Commit,

    /// Delete the overlay2 tree and switch containers back to aufs
    #[command(name = "fail-cleanup")]
    FailCleanup,
}

//-------------------------------------------------------------------------------------------------
// Tests
//-------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_args_are_consistent() {
        A2oArgs::command().debug_assert();
    }

    #[test]
    fn test_args_parse_subcommands() {
        let args = A2oArgs::parse_from(["a2o-migrate", "--debug", "--storage-root", "/tmp/x", "commit"]);
        assert!(args.debug);
        assert_eq!(args.storage_root, PathBuf::from("/tmp/x"));
        assert!(matches!(args.subcommand, Some(A2oSubcommand::Commit)));

        let args = A2oArgs::parse_from(["a2o-migrate", "fail-cleanup"]);
        assert!(matches!(args.subcommand, Some(A2oSubcommand::FailCleanup)));

        let args = A2oArgs::parse_from(["a2o-migrate"]);
        assert!(args.subcommand.is_none());
    }

    #[test]
    fn test_args_reject_unknown_subcommand() {
        assert!(A2oArgs::try_parse_from(["a2o-migrate", "rollback"]).is_err());
    }
}
