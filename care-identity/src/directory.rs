use crate::models::{Organization, Profile, Role};
use async_trait::async_trait;
use dashmap::DashMap;
use error_common::{AccessError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Read-only directory of user profiles.
///
/// The grant store and the special-access resolver take this as an explicit
/// constructor dependency; nothing in the engine reaches for a global model
/// registry.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>>;

    /// Resolve a profile or fail with `NotFound`.
    async fn require_profile(&self, id: Uuid) -> Result<Profile> {
        self.find_profile(id)
            .await?
            .ok_or_else(|| AccessError::not_found("profile", id))
    }

    /// Resolve a profile and verify it carries the expected role.
    async fn require_role(&self, id: Uuid, role: Role, field: &str) -> Result<Profile> {
        let profile = self.require_profile(id).await?;
        if profile.role != role {
            return Err(AccessError::validation(
                field,
                format!("must have role {role}, found {}", profile.role),
            ));
        }
        Ok(profile)
    }
}

/// Read-only directory of organizations.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>>;

    async fn require_organization(&self, id: Uuid) -> Result<Organization> {
        self.find_organization(id)
            .await?
            .ok_or_else(|| AccessError::not_found("organization", id))
    }
}

/// In-memory directory for tests and development.
pub struct InMemoryDirectory {
    profiles: Arc<DashMap<Uuid, Profile>>,
    organizations: Arc<DashMap<Uuid, Organization>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(DashMap::new()),
            organizations: Arc::new(DashMap::new()),
        }
    }

    pub fn insert_profile(&self, profile: Profile) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn insert_organization(&self, organization: Organization) {
        self.organizations.insert(organization.id, organization);
    }

    /// Seed a fresh profile and return its id.
    pub fn seed_profile(&self, role: Role, organization_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.insert_profile(Profile::new(id, role, organization_id));
        id
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryDirectory {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.value().clone()))
    }
}

#[async_trait]
impl OrganizationDirectory for InMemoryDirectory {
    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|o| o.value().clone()))
    }
}
