use crate::entry::{ActivitySummary, AuditLogEntry, FlagSeverity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use error_common::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

/// Storage interface for the append-only audit log.
///
/// `append` is the only write; `purge_before` is the only delete and exists
/// solely for the retention policy.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<()>;

    /// Entries for one actor, newest first.
    async fn for_actor(&self, actor_id: Uuid, limit: usize) -> Result<Vec<AuditLogEntry>>;

    /// Entries touching one resource, newest first.
    async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>>;

    /// Entries carrying at least one flag at or above `min_severity`,
    /// newest first.
    async fn security_incidents(
        &self,
        min_severity: FlagSeverity,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>>;

    /// Per-day and per-action counts for one actor since `since`.
    async fn activity_summary(&self, actor_id: Uuid, since: DateTime<Utc>)
        -> Result<ActivitySummary>;

    /// Remove entries created before `cutoff`; returns the count removed.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// In-memory audit repository for tests and development.
pub struct InMemoryAuditRepository {
    entries: Arc<DashMap<Uuid, AuditLogEntry>>,
}

impl InMemoryAuditRepository {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sorted(&self, mut entries: Vec<AuditLogEntry>, limit: usize) -> Vec<AuditLogEntry> {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        entries
    }
}

impl Default for InMemoryAuditRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        self.entries.insert(entry.id, entry);
        Ok(())
    }

    async fn for_actor(&self, actor_id: Uuid, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let matched = self
            .entries
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .map(|e| e.value().clone())
            .collect();
        Ok(self.sorted(matched, limit))
    }

    async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>> {
        let matched = self
            .entries
            .iter()
            .filter(|e| {
                e.resource_type.as_deref() == Some(resource_type)
                    && e.resource_id.as_deref() == Some(resource_id)
            })
            .map(|e| e.value().clone())
            .collect();
        Ok(self.sorted(matched, limit))
    }

    async fn security_incidents(
        &self,
        min_severity: FlagSeverity,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>> {
        let matched = self
            .entries
            .iter()
            .filter(|e| e.security_flags.iter().any(|f| f.severity >= min_severity))
            .map(|e| e.value().clone())
            .collect();
        Ok(self.sorted(matched, limit))
    }

    async fn activity_summary(
        &self,
        actor_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<ActivitySummary> {
        let mut by_day: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();
        let mut by_action: BTreeMap<String, u64> = BTreeMap::new();

        for entry in self.entries.iter() {
            if entry.actor_id != actor_id || entry.created_at < since {
                continue;
            }
            *by_day.entry(entry.created_at.date_naive()).or_default() += 1;
            *by_action.entry(entry.action.clone()).or_default() += 1;
        }

        Ok(ActivitySummary {
            by_day: by_day.into_iter().collect(),
            by_action: by_action.into_iter().collect(),
        })
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.created_at >= cutoff);
        Ok((before - self.entries.len()) as u64)
    }
}
