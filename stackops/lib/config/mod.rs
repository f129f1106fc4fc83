//! Configuration types and helpers.

mod defaults;
mod stackops;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use defaults::*;
pub use stackops::*;
