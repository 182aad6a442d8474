//! Composite access decisions for the coordination platform.
//!
//! The engine layers three questions on top of each other:
//!
//! 1. does the caller's role hold the permission at all (table lookup),
//! 2. which slice of the data may the caller see (scope resolution),
//! 3. does an individual record belong to that slice (ownership and
//!    relationship grants).
//!
//! Every decision, allow or deny, lands on the audit trail without being on
//! the caller's critical path.

pub mod config;
pub mod engine;
pub mod scope;
pub mod special;

pub use config::*;
pub use engine::*;
pub use scope::*;
pub use special::*;
