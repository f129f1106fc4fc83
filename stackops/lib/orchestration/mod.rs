//! Management of the docker compose stacks of a backend.
//!
//! The [`StackManager`] is the entry point. It loads the registry's stacks, polls their
//! containers, dispatches operations one at a time per stack and schedules the refreshes that
//! follow them.

mod dispatcher;
mod extract;
mod manager;
mod poller;
mod registry;
mod scheduler;
mod state;
mod status;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use dispatcher::*;
pub use extract::*;
pub use manager::*;
pub use poller::*;
pub use registry::*;
pub use scheduler::*;
pub use status::*;
