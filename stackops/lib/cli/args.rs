use super::styles;
use clap::Parser;

use crate::models::StackId;

//-------------------------------------------------------------------------------------------------
// Types
//-------------------------------------------------------------------------------------------------

/// stackops - Manage the docker compose stacks of a stack backend
#[derive(Debug, Parser)]
#[command(name = "stackops", author, about, version, styles=styles::styles())]
pub struct StackopsArgs {
    /// The subcommand to run
    #[command(subcommand)]
    pub subcommand: Option<StackopsSubcommand>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL of the stack backend, overrides `STACKOPS_API_URL`
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,
}

/// Available subcommands for managing stacks
#[derive(Debug, Parser)]
pub enum StackopsSubcommand {
    /// List the registered stacks and whether they are running
    #[command(name = "list", alias = "ls")]
    List,

    /// Show the containers of a stack
    #[command(name = "status")]
    Status {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,
    },

    /// Start a stack
    #[command(name = "up")]
    Up {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Wait for the follow-up refreshes and show the resulting status
        #[arg(short, long)]
        wait: bool,
    },

    /// Stop a stack
    #[command(name = "down")]
    Down {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Wait for the follow-up refresh and show the resulting status
        #[arg(short, long)]
        wait: bool,
    },

    /// Restart a running stack
    #[command(name = "restart")]
    Restart {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Wait for the follow-up refresh and show the resulting status
        #[arg(short, long)]
        wait: bool,
    },

    /// Build the images of a running stack
    #[command(name = "build")]
    Build {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Wait for the follow-up refresh and show the resulting status
        #[arg(short, long)]
        wait: bool,
    },

    /// Pull the images of a stack
    #[command(name = "pull")]
    Pull {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Wait for the follow-up refresh and show the resulting status
        #[arg(short, long)]
        wait: bool,
    },

    /// Show the output of `docker compose ps` for a stack
    #[command(name = "ps")]
    Ps {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,
    },

    /// Show the logs of a stack
    #[command(name = "logs", alias = "log")]
    Logs {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,
    },

    /// Remove a stack from the registry
    #[command(name = "remove", alias = "rm")]
    Remove {
        /// Id of the stack
        #[arg(required = true)]
        id: StackId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

//-------------------------------------------------------------------------------------------------
// Tests
//-------------------------------------------------------------------------------------------------
