//! Roles, caller identities, and profile directories
//!
//! The identity provider that authenticates credentials is an external
//! collaborator; by the time the engine runs, a request already carries a
//! resolved [`CallerIdentity`]. This crate holds that shape, the closed
//! [`Role`] enumeration, and the directory traits the grant store and the
//! special-access resolver use to look up profiles and organizations.

pub mod directory;
pub mod models;

pub use directory::*;
pub use models::*;
