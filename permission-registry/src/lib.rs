//! Static role→resource→action permission table
//!
//! An allow-only table: presence of any matching active entry grants access,
//! absence denies, and there is no deny entry to adjudicate against. Entries
//! may carry a `"*"` wildcard in the resource or action position; wildcard
//! rows default to priority 100 so listings show them without letting them
//! shadow specific grants (priority never resolves conflicts — it only
//! orders read views).
//!
//! Lookup probes four tiers in order: exact, resource-wildcard,
//! action-wildcard, global wildcard. `super_admin` short-circuits to allow
//! without consulting stored rows at all.

pub mod models;
pub mod registry;
pub mod repository;
pub mod seed;

pub use models::*;
pub use registry::*;
pub use repository::*;
