use crate::entry::{
    ActivitySummary, AuditEvent, AuditLogEntry, AuditOutcome, FlagSeverity, RetentionPolicy,
    SecurityFlag,
};
use crate::repository::AuditRepository;
use chrono::{DateTime, Timelike, Utc};
use error_common::Result;
use logger_redacted::FieldRedactor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hours (inclusive start, exclusive end) considered normal access time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 22,
        }
    }
}

impl BusinessHours {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let hour = at.hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrailConfig {
    pub business_hours: BusinessHours,
    pub retention: RetentionPolicy,
}

/// The audit pipeline: redact, flag, persist.
pub struct AuditTrail {
    repository: Arc<dyn AuditRepository>,
    redactor: Arc<FieldRedactor>,
    config: AuditTrailConfig,
}

impl AuditTrail {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self {
            repository,
            redactor: Arc::new(FieldRedactor::default()),
            config: AuditTrailConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AuditTrailConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_redactor(mut self, redactor: FieldRedactor) -> Self {
        self.redactor = Arc::new(redactor);
        self
    }

    /// Record an event. Fire-and-forget: redaction and flagging happen
    /// synchronously, the store write runs on a spawned task. A failed
    /// write is logged and swallowed — it never reaches the caller of the
    /// operation being audited. The returned handle is the failure channel
    /// for callers (tests, shutdown paths) that do want to await it.
    pub fn record(&self, event: AuditEvent) -> JoinHandle<()> {
        let entry = self.prepare(event);
        let repository = self.repository.clone();
        tokio::spawn(async move {
            if let Err(err) = repository.append(entry).await {
                warn!(error = %err, "audit write failed, entry dropped");
            }
        })
    }

    /// Redact the payload and run the anomaly heuristics.
    fn prepare(&self, event: AuditEvent) -> AuditLogEntry {
        let mut details = event.details;
        self.redactor.redact_in_place(&mut details);

        let previous_values = event.previous_values.map(|mut v| {
            self.redactor.redact_in_place(&mut v);
            v
        });
        let new_values = event.new_values.map(|mut v| {
            self.redactor.redact_in_place(&mut v);
            v
        });

        let mut security_flags = Vec::new();
        if !self.config.business_hours.contains(event.occurred_at) {
            security_flags.push(SecurityFlag::new(
                "off_hours_access",
                FlagSeverity::Medium,
                "access outside normal hours",
                event.occurred_at,
            ));
        }
        if event.action == "login_failed" {
            security_flags.push(SecurityFlag::new(
                "failed_login",
                FlagSeverity::Medium,
                "failed login attempt",
                event.occurred_at,
            ));
        }

        debug!(
            actor = %event.actor_id,
            action = %event.action,
            flags = security_flags.len(),
            "audit entry prepared"
        );

        AuditLogEntry {
            id: Uuid::new_v4(),
            actor_id: event.actor_id,
            action: event.action,
            resource_type: event.resource_type,
            resource_id: event.resource_id,
            outcome: event.outcome,
            ip_address: event.ip_address,
            user_agent: event.user_agent,
            details,
            previous_values,
            new_values,
            security_flags,
            created_at: event.occurred_at,
        }
    }

    // =========================================================================
    // Session events
    // =========================================================================

    pub fn record_login(
        &self,
        actor_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> JoinHandle<()> {
        self.record(
            AuditEvent::new(actor_id, "login", AuditOutcome::Success).client(ip_address, user_agent),
        )
    }

    pub fn record_logout(&self, actor_id: Uuid) -> JoinHandle<()> {
        self.record(AuditEvent::new(actor_id, "logout", AuditOutcome::Success))
    }

    pub fn record_login_failed(
        &self,
        actor_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> JoinHandle<()> {
        self.record(
            AuditEvent::new(actor_id, "login_failed", AuditOutcome::Failure)
                .client(ip_address, user_agent),
        )
    }

    // =========================================================================
    // Read-only queries
    // =========================================================================

    pub async fn entries_for_actor(&self, actor_id: Uuid, limit: usize) -> Result<Vec<AuditLogEntry>> {
        self.repository.for_actor(actor_id, limit).await
    }

    pub async fn entries_for_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>> {
        self.repository
            .for_resource(resource_type, resource_id, limit)
            .await
    }

    pub async fn security_incidents(
        &self,
        min_severity: FlagSeverity,
        limit: usize,
    ) -> Result<Vec<AuditLogEntry>> {
        self.repository.security_incidents(min_severity, limit).await
    }

    pub async fn activity_summary(
        &self,
        actor_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<ActivitySummary> {
        self.repository.activity_summary(actor_id, since).await
    }

    /// Remove entries past the retention horizon. The only mutation the
    /// trail ever applies to persisted rows.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = self.config.retention.cutoff(now);
        self.repository.purge_before(cutoff).await
    }
}
