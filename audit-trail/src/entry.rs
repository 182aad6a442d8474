use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of the audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    Partial,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::Partial => "partial",
        }
    }
}

impl std::str::FromStr for AuditOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(AuditOutcome::Success),
            "failure" => Ok(AuditOutcome::Failure),
            "partial" => Ok(AuditOutcome::Partial),
            other => Err(format!("unknown outcome: {other}")),
        }
    }
}

/// Severity attached to a security flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Anomaly marker appended by the recording heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFlag {
    pub flag_type: String,
    pub severity: FlagSeverity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

impl SecurityFlag {
    pub fn new(flag_type: &str, severity: FlagSeverity, description: &str, detected_at: DateTime<Utc>) -> Self {
        Self {
            flag_type: flag_type.to_string(),
            severity,
            description: description.to_string(),
            detected_at,
        }
    }
}

/// A persisted, write-once audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Value,
    pub previous_values: Option<Value>,
    pub new_values: Option<Value>,
    pub security_flags: Vec<SecurityFlag>,
    pub created_at: DateTime<Utc>,
}

/// Input to [`crate::AuditTrail::record`], before redaction and flagging.
///
/// `occurred_at` is injectable so the off-hours heuristic is testable; it
/// defaults to the wall clock at build time.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub actor_id: Uuid,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Value,
    pub previous_values: Option<Value>,
    pub new_values: Option<Value>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(actor_id: Uuid, action: &str, outcome: AuditOutcome) -> Self {
        Self {
            actor_id,
            action: action.to_string(),
            resource_type: None,
            resource_id: None,
            outcome,
            ip_address: None,
            user_agent: None,
            details: Value::Null,
            previous_values: None,
            new_values: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn previous_values(mut self, values: Value) -> Self {
        self.previous_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// Policy horizon after which entries become eligible for purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub horizon_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        // Seven years.
        Self { horizon_days: 2555 }
    }
}

impl RetentionPolicy {
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.horizon_days)
    }

    pub fn eligible_for_purge(&self, entry: &AuditLogEntry, now: DateTime<Utc>) -> bool {
        entry.created_at < self.cutoff(now)
    }
}

/// Per-day and per-action counts over an actor's timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub by_day: Vec<(chrono::NaiveDate, u64)>,
    pub by_action: Vec<(String, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn severity_orders_low_to_critical() {
        assert!(FlagSeverity::Low < FlagSeverity::Medium);
        assert!(FlagSeverity::High < FlagSeverity::Critical);
    }

    #[test]
    fn retention_eligibility_uses_the_horizon() {
        let policy = RetentionPolicy::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();

        let entry_at = |created: DateTime<Utc>| AuditLogEntry {
            id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            action: "read".to_string(),
            resource_type: None,
            resource_id: None,
            outcome: AuditOutcome::Success,
            ip_address: None,
            user_agent: None,
            details: Value::Null,
            previous_values: None,
            new_values: None,
            security_flags: vec![],
            created_at: created,
        };

        let fresh = entry_at(now - Duration::days(30));
        let ancient = entry_at(now - Duration::days(3000));
        assert!(!policy.eligible_for_purge(&fresh, now));
        assert!(policy.eligible_for_purge(&ancient, now));
    }
}
