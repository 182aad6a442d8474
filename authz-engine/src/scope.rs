use chrono::{DateTime, Utc};
use error_common::{AccessError, Result};
use grant_store::RelationshipGrantStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use care_identity::Role;

/// Which slice of a resource collection a caller may see.
///
/// A filter is a predicate over record ownership, not a query: callers turn
/// it into whatever their storage layer speaks (a WHERE clause, an index
/// lookup) and may AND it with their own narrowing conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// No restriction. Platform operators only.
    Unrestricted,
    /// Records belonging to one organization.
    Organization(Uuid),
    /// Records owned by exactly this user.
    SelfOnly(Uuid),
    /// Records owned by one of an explicit set of patients.
    PatientSet(Vec<Uuid>),
}

impl ScopeFilter {
    /// Does a record with this owner and organization fall inside the scope?
    pub fn permits(&self, owner_id: Uuid, organization_id: Uuid) -> bool {
        match self {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::Organization(org) => *org == organization_id,
            ScopeFilter::SelfOnly(id) => *id == owner_id,
            ScopeFilter::PatientSet(ids) => ids.contains(&owner_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ScopeFilter::PatientSet(ids) if ids.is_empty())
    }
}

/// Maps a caller to the [`ScopeFilter`] governing a resource collection.
///
/// Scopes are computed from live grant state, so a caller whose assignment
/// ended sees the narrower scope on their next request.
pub struct ScopeResolver {
    grants: Arc<RelationshipGrantStore>,
}

impl ScopeResolver {
    pub fn new(grants: Arc<RelationshipGrantStore>) -> Self {
        Self { grants }
    }

    /// Resolve the caller's scope for `resource_type` at instant `now`.
    ///
    /// Relationship-based roles get an explicit patient set derived from
    /// their currently-active grants; an empty set is a valid scope that
    /// matches nothing.
    pub async fn scope(
        &self,
        role: Role,
        caller_id: Uuid,
        organization_id: Uuid,
        resource_type: &str,
        now: DateTime<Utc>,
    ) -> Result<ScopeFilter> {
        let filter = match role {
            Role::SuperAdmin => ScopeFilter::Unrestricted,
            Role::OrgAdmin | Role::CareManager => ScopeFilter::Organization(organization_id),
            Role::Caretaker => ScopeFilter::PatientSet(
                self.grants
                    .active_patient_ids_for_caretaker(caller_id, now)
                    .await?,
            ),
            Role::PatientMentor => ScopeFilter::PatientSet(
                self.grants
                    .active_patient_ids_for_mentor(caller_id, now)
                    .await?,
            ),
            Role::Patient => ScopeFilter::SelfOnly(caller_id),
            Role::Caller => {
                return Err(AccessError::ConfigurationError(
                    "caller role has no data scope".to_string(),
                ))
            }
        };
        debug!(%role, resource = resource_type, ?filter, "resolved scope");
        Ok(filter)
    }
}
