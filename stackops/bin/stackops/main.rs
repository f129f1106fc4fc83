#[path = "mod.rs"]
mod internal;

use clap::{CommandFactory, Parser};
use internal::handlers;
use stackops::{
    cli::{StackopsArgs, StackopsSubcommand},
    config::StackopsConfig,
    models::Operation,
    orchestration::StackManager,
    StackopsResult,
};
use tracing_subscriber::{fmt, EnvFilter};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const VERBOSE_FILTER: &str = "stackops=debug";

//--------------------------------------------------------------------------------------------------
// Functions: main
//--------------------------------------------------------------------------------------------------

#[tokio::main]
async fn main() -> StackopsResult<()> {
    // A missing .env file is not an error
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = StackopsArgs::parse();

    let filter = if args.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::from_default_env()
    };

    fmt()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let Some(subcommand) = args.subcommand else {
        StackopsArgs::command().print_help()?;
        return Ok(());
    };

    let mut config = StackopsConfig::from_env()?;
    if let Some(api_url) = args.api_url {
        config.set_api_url(api_url);
    }

    tracing::trace!("using configuration: {config:?}");
    let manager = StackManager::connect(&config)?;

    let result = match subcommand {
        StackopsSubcommand::List => handlers::list_subcommand(&manager).await,
        StackopsSubcommand::Status { id } => handlers::status_subcommand(&manager, id).await,
        StackopsSubcommand::Up { id, wait } => {
            handlers::operation_subcommand(&manager, id, Operation::Up, wait).await
        }
        StackopsSubcommand::Down { id, wait } => {
            handlers::operation_subcommand(&manager, id, Operation::Down, wait).await
        }
        StackopsSubcommand::Restart { id, wait } => {
            handlers::operation_subcommand(&manager, id, Operation::Restart, wait).await
        }
        StackopsSubcommand::Build { id, wait } => {
            handlers::operation_subcommand(&manager, id, Operation::Build, wait).await
        }
        StackopsSubcommand::Pull { id, wait } => {
            handlers::operation_subcommand(&manager, id, Operation::Pull, wait).await
        }
        StackopsSubcommand::Ps { id } => {
            handlers::operation_subcommand(&manager, id, Operation::Ps, false).await
        }
        StackopsSubcommand::Logs { id } => {
            handlers::operation_subcommand(&manager, id, Operation::Logs, false).await
        }
        StackopsSubcommand::Remove { id, yes } => {
            handlers::remove_subcommand(&manager, id, yes).await
        }
    };

    manager.shutdown();
    result
}
