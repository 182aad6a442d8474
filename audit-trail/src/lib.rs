//! Append-only audit trail for access decisions and session events
//!
//! Every authorization outcome and every authenticated session event flows
//! through [`AuditTrail::record`]. Recording is fire-and-forget from the
//! caller's perspective: the entry is redacted and flagged synchronously,
//! then persisted on a spawned task whose failure is logged and swallowed —
//! an audit-store outage must never fail the operation being audited.
//!
//! Entries are write-once. The only mutation the store ever sees afterwards
//! is the retention purge, which removes entries older than the policy
//! horizon (default seven years).

pub mod entry;
pub mod repository;
pub mod trail;

pub use entry::*;
pub use repository::*;
pub use trail::*;
