//! Relationship grants: caretaker assignments and mentor authorizations
//!
//! Two grant kinds link a grantee to a patient, each with its own lifecycle:
//!
//! - a *caretaker assignment* pairs a caretaker with a patient in the same
//!   organization, optionally bounded by a work schedule;
//! - a *mentor authorization* pairs a mentor with a patient, carries a
//!   capability subset, may cross organizations, and is revocable.
//!
//! One document exists per (grantee, patient) pair — re-creating a grant
//! upserts the existing document rather than duplicating it. Grants are
//! never physically deleted; ending or revoking one transitions its status
//! and the history stays behind for audit.
//!
//! Whether a grant is *currently* active is never stored: it is computed
//! from the status field plus the schedule window against a supplied "now",
//! so a grant whose window has lapsed is denied everywhere even though its
//! stored status still reads `active`.

pub mod models;
pub mod repository;
pub mod store;

pub use models::*;
pub use repository::*;
pub use store::*;
