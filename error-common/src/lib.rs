//! Common error handling for the CareLink access-control engine
//!
//! Every engine crate shares one error taxonomy so that callers (the route
//! layer, out of scope here) can translate a failure into their own protocol
//! without inspecting crate-private types. The taxonomy deliberately keeps
//! denial variants information-poor: a `PermissionDenied` names the resource
//! and action that were refused, never the data the caller failed to reach.

pub mod types;

pub use types::*;
