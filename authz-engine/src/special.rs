use chrono::{DateTime, Utc};
use error_common::Result;
use grant_store::RelationshipGrantStore;
use permission_registry::Action;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use care_identity::{CallerIdentity, ProfileDirectory, Role};

/// Instance-level access paths that exist alongside the role table.
///
/// The registry answers "may this role touch this resource type"; this
/// resolver answers "may this caller touch this particular record", based
/// on organization membership or an active relationship grant. It is only
/// consulted once the role-level check has already passed.
pub struct SpecialAccessResolver {
    profiles: Arc<dyn ProfileDirectory>,
    grants: Arc<RelationshipGrantStore>,
}

impl SpecialAccessResolver {
    pub fn new(profiles: Arc<dyn ProfileDirectory>, grants: Arc<RelationshipGrantStore>) -> Self {
        Self { profiles, grants }
    }

    /// May `actor` perform `action` on the record owned by `owner_id`?
    ///
    /// A missing owner profile denies rather than errors: an unresolvable
    /// owner is indistinguishable from an out-of-scope one.
    pub async fn can_access_owned(
        &self,
        actor: &CallerIdentity,
        resource_type: &str,
        action: Action,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let allowed = match actor.role {
            Role::OrgAdmin | Role::CareManager => match self.profiles.find_profile(owner_id).await? {
                Some(owner) => owner.organization_id == actor.organization_id,
                None => false,
            },
            Role::Caretaker => {
                resource_type == "patients"
                    && self
                        .grants
                        .assignment_is_active(actor.id, owner_id, now)
                        .await?
            }
            Role::PatientMentor => {
                resource_type == "patients"
                    && self
                        .grants
                        .authorization_is_active(actor.id, owner_id, now)
                        .await?
            }
            _ => false,
        };
        debug!(
            actor = %actor.id,
            role = %actor.role,
            resource = resource_type,
            action = %action,
            owner = %owner_id,
            allowed,
            "instance access resolved"
        );
        Ok(allowed)
    }
}
