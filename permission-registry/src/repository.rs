use crate::models::{entry_key, PermissionEntry};
use async_trait::async_trait;
use care_identity::Role;
use dashmap::DashMap;
use error_common::Result;
use std::sync::Arc;

pub mod postgres;

/// Repository interface for permission entries.
///
/// The stored `resource` / `action` strings include the `"*"` wildcard; tier
/// selection lives in the registry, the repository only answers point
/// questions about stored rows.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Insert or replace the entry for its (role, resource, action) triple.
    async fn upsert(&self, entry: PermissionEntry) -> Result<()>;

    /// Deactivate the entry for a triple, if present.
    async fn deactivate(&self, role: Role, resource: &str, action: &str) -> Result<()>;

    /// Does an active entry exist for exactly this stored triple?
    async fn exists_active(&self, role: Role, resource: &str, action: &str) -> Result<bool>;

    /// All active entries for a role, ordered by priority (descending) then
    /// resource. Priority is advisory listing order only.
    async fn active_for_role(&self, role: Role) -> Result<Vec<PermissionEntry>>;
}

/// In-memory permission repository for tests and development.
pub struct InMemoryPermissionRepository {
    entries: Arc<DashMap<String, PermissionEntry>>,
}

impl InMemoryPermissionRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryPermissionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn upsert(&self, entry: PermissionEntry) -> Result<()> {
        self.entries.insert(entry.key(), entry);
        Ok(())
    }

    async fn deactivate(&self, role: Role, resource: &str, action: &str) -> Result<()> {
        if let Some(mut entry) = self.entries.get_mut(&entry_key(role, resource, action)) {
            entry.is_active = false;
        }
        Ok(())
    }

    async fn exists_active(&self, role: Role, resource: &str, action: &str) -> Result<bool> {
        Ok(self
            .entries
            .get(&entry_key(role, resource, action))
            .map(|entry| entry.is_active)
            .unwrap_or(false))
    }

    async fn active_for_role(&self, role: Role) -> Result<Vec<PermissionEntry>> {
        let mut entries: Vec<PermissionEntry> = self
            .entries
            .iter()
            .filter(|entry| entry.role == role && entry.is_active)
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.resource.as_str().cmp(b.resource.as_str()))
        });
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ActionSpec, ResourceSpec};

    #[tokio::test]
    async fn upsert_replaces_the_same_triple() {
        let repo = InMemoryPermissionRepository::new();
        let first = PermissionEntry::new(
            Role::CareManager,
            ResourceSpec::named("patients"),
            ActionSpec::Of(Action::Read),
        );
        let second = first.clone();

        repo.upsert(first).await.unwrap();
        repo.upsert(second).await.unwrap();

        let entries = repo.active_for_role(Role::CareManager).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn deactivate_removes_the_match() {
        let repo = InMemoryPermissionRepository::new();
        repo.upsert(PermissionEntry::new(
            Role::Caretaker,
            ResourceSpec::named("patients"),
            ActionSpec::Of(Action::Read),
        ))
        .await
        .unwrap();

        assert!(repo
            .exists_active(Role::Caretaker, "patients", "read")
            .await
            .unwrap());

        repo.deactivate(Role::Caretaker, "patients", "read")
            .await
            .unwrap();

        assert!(!repo
            .exists_active(Role::Caretaker, "patients", "read")
            .await
            .unwrap());
    }
}
