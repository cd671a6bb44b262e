use std::process::ExitCode;

use a2o::{
    cli::{A2oArgs, A2oSubcommand},
    config::StorageRoot,
    migration, A2oError, A2oResult,
};
use clap::{CommandFactory, Parser};
use tracing_subscriber::{fmt, EnvFilter};

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

fn main() -> ExitCode {
    let args = A2oArgs::parse();

    // RUST_LOG takes precedence over --debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.debug { "debug" } else { "info" })
    });
    fmt()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions: *
//--------------------------------------------------------------------------------------------------

fn run(args: A2oArgs) -> A2oResult<()> {
    let root = StorageRoot::new(args.storage_root);
    tracing::warn!("storage root: {}", root.get_path().display());

    match args.subcommand {
        Some(A2oSubcommand::Migrate) => {
            tracing::trace!("running migrate");
            migration::migrate(&root)?;
        }
        Some(A2oSubcommand::Commit) => {
            tracing::trace!("running commit");
            migration::commit(&root)?;
        }
        Some(A2oSubcommand::FailCleanup) => {
            tracing::trace!("running fail-cleanup");
            migration::fail_cleanup(&root)?;
        }
        None => {
            A2oArgs::command().print_help().map_err(A2oError::custom)?;
        }
    }

    Ok(())
}
