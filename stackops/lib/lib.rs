//! `stackops` is a client for managing docker compose stacks through a stack backend.
//!
//! # Overview
//!
//! The backend keeps a registry of compose stacks and runs `docker compose` for them. stackops
//! keeps a local view of that registry and of the containers of every stack. It handles:
//! - Loading and removing the registry's stacks
//! - Polling the containers of each stack and classifying their status
//! - Dispatching `up`, `down`, `restart`, `build`, `pull`, `ps` and `logs`, one at a time per stack
//! - Attributing the errors in failed operation output to the containers they name
//! - Refreshing a stack's status after the operations that change it
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use stackops::{config::StackopsConfig, models::Operation, orchestration::StackManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = StackManager::connect(&StackopsConfig::from_env()?)?;
//!
//!     for stack in manager.load().await? {
//!         println!("{} {}", stack.id, stack.name);
//!     }
//!
//!     manager.refresh_all(true).await;
//!     let result = manager.dispatch(1, Operation::Up).await?;
//!     println!("{}", result.message);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`api`] - The stack backend and its HTTP client
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Runtime configuration
//! - [`models`] - The data exchanged with the backend
//! - [`orchestration`] - Registry, status polling and operation dispatching
//! - [`presentation`] - View models for rendering stacks

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod api;
pub mod cli;
pub mod config;
pub mod models;
pub mod orchestration;
pub mod presentation;

pub use error::*;
