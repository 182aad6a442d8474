use crate::models::{Action, PermissionEntry};
use crate::repository::PermissionRepository;
use care_identity::Role;
use error_common::Result;
use std::sync::Arc;
use tracing::debug;

/// Lookup front for the permission table.
///
/// Allow-only: any matching active row grants, absence denies, and malformed
/// resource identifiers simply match nothing. No call here ever errors for
/// an unknown resource or action string.
pub struct PermissionRegistry {
    repository: Arc<dyn PermissionRepository>,
}

impl PermissionRegistry {
    pub fn new(repository: Arc<dyn PermissionRepository>) -> Self {
        Self { repository }
    }

    /// Does `role` hold `action` on `resource`?
    ///
    /// `super_admin` short-circuits to true without consulting stored rows.
    /// Otherwise the four lookup tiers are probed in order: exact,
    /// resource-wildcard, action-wildcard, global wildcard.
    pub async fn has_permission(&self, role: Role, resource: &str, action: Action) -> Result<bool> {
        if role == Role::SuperAdmin {
            return Ok(true);
        }

        let tiers = [
            (resource, action.as_str()),
            ("*", action.as_str()),
            (resource, "*"),
            ("*", "*"),
        ];

        for (tier_resource, tier_action) in tiers {
            if self
                .repository
                .exists_active(role, tier_resource, tier_action)
                .await?
            {
                debug!(
                    role = %role,
                    resource = tier_resource,
                    action = tier_action,
                    "permission matched"
                );
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Distinct resource values across the role's active entries, in
    /// listing order (priority, then resource).
    ///
    /// `super_admin` matches everything by convention rather than by stored
    /// rows; callers special-case it before asking for a listing.
    pub async fn accessible_resources(&self, role: Role) -> Result<Vec<String>> {
        let entries = self.repository.active_for_role(role).await?;
        let mut resources: Vec<String> = Vec::new();
        for entry in entries {
            let resource = entry.resource.as_str().to_string();
            if !resources.contains(&resource) {
                resources.push(resource);
            }
        }
        Ok(resources)
    }

    /// Distinct action values across the role's active entries matching
    /// `resource` (wildcard rows included).
    pub async fn allowed_actions(&self, role: Role, resource: &str) -> Result<Vec<String>> {
        let entries = self.repository.active_for_role(role).await?;
        let mut actions: Vec<String> = Vec::new();
        for entry in entries {
            if entry.resource.matches(resource) {
                let action = entry.action.as_str().to_string();
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }

    /// Platform-operator mutation: insert or replace a table row.
    pub async fn grant(&self, entry: PermissionEntry) -> Result<()> {
        self.repository.upsert(entry).await
    }

    /// Platform-operator mutation: deactivate a table row.
    pub async fn deactivate(&self, role: Role, resource: &str, action: &str) -> Result<()> {
        self.repository.deactivate(role, resource, action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionSpec, ResourceSpec};
    use crate::repository::InMemoryPermissionRepository;

    fn registry() -> PermissionRegistry {
        PermissionRegistry::new(Arc::new(InMemoryPermissionRepository::new()))
    }

    #[tokio::test]
    async fn absence_means_deny() {
        let registry = registry();
        assert!(!registry
            .has_permission(Role::Caretaker, "patients", Action::Read)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn super_admin_needs_no_rows() {
        let registry = registry();
        for action in [Action::Create, Action::Read, Action::Delete, Action::Revoke] {
            assert!(registry
                .has_permission(Role::SuperAdmin, "anything", action)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn all_four_tiers_grant() {
        let cases = [
            (ResourceSpec::named("patients"), ActionSpec::Of(Action::Read)),
            (ResourceSpec::Any, ActionSpec::Of(Action::Read)),
            (ResourceSpec::named("patients"), ActionSpec::Any),
            (ResourceSpec::Any, ActionSpec::Any),
        ];

        for (resource, action) in cases {
            let registry = registry();
            registry
                .grant(PermissionEntry::new(Role::CareManager, resource, action))
                .await
                .unwrap();
            assert!(registry
                .has_permission(Role::CareManager, "patients", Action::Read)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn deactivating_returns_permission_to_false() {
        let registry = registry();
        registry
            .grant(PermissionEntry::new(
                Role::Caretaker,
                ResourceSpec::named("patients"),
                ActionSpec::Of(Action::Read),
            ))
            .await
            .unwrap();
        assert!(registry
            .has_permission(Role::Caretaker, "patients", Action::Read)
            .await
            .unwrap());

        registry
            .deactivate(Role::Caretaker, "patients", "read")
            .await
            .unwrap();
        assert!(!registry
            .has_permission(Role::Caretaker, "patients", Action::Read)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_resource_matches_nothing() {
        let registry = registry();
        registry
            .grant(PermissionEntry::new(
                Role::Caretaker,
                ResourceSpec::named("patients"),
                ActionSpec::Of(Action::Read),
            ))
            .await
            .unwrap();
        assert!(!registry
            .has_permission(Role::Caretaker, "patients;drop", Action::Read)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn derived_views_list_distinct_values() {
        let registry = registry();
        registry
            .grant(PermissionEntry::new(
                Role::Patient,
                ResourceSpec::named("profile"),
                ActionSpec::Of(Action::Read),
            ))
            .await
            .unwrap();
        registry
            .grant(PermissionEntry::new(
                Role::Patient,
                ResourceSpec::named("profile"),
                ActionSpec::Of(Action::Update),
            ))
            .await
            .unwrap();
        registry
            .grant(PermissionEntry::new(
                Role::Patient,
                ResourceSpec::named("mentors"),
                ActionSpec::Of(Action::Authorize),
            ))
            .await
            .unwrap();

        let resources = registry.accessible_resources(Role::Patient).await.unwrap();
        assert_eq!(resources.len(), 2);
        assert!(resources.contains(&"profile".to_string()));
        assert!(resources.contains(&"mentors".to_string()));

        let actions = registry.allowed_actions(Role::Patient, "profile").await.unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions.contains(&"read".to_string()));
        assert!(actions.contains(&"update".to_string()));
    }

    #[tokio::test]
    async fn wildcard_rows_appear_in_allowed_actions() {
        let registry = registry();
        registry
            .grant(PermissionEntry::new(
                Role::OrgAdmin,
                ResourceSpec::Any,
                ActionSpec::Of(Action::Read),
            ))
            .await
            .unwrap();

        let actions = registry.allowed_actions(Role::OrgAdmin, "patients").await.unwrap();
        assert_eq!(actions, vec!["read".to_string()]);
    }
}
