//! The boundary to the external stack backend.
//!
//! The core only ever talks to the backend through [`StackApi`], so it can be driven by the HTTP
//! client in production and by an in-memory backend in tests.

mod http;
mod traits;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub use http::*;
pub use traits::*;
