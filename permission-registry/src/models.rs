use care_identity::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed action enumeration used throughout the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Assign,
    Authorize,
    Revoke,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Assign => "assign",
            Action::Authorize => "authorize",
            Action::Revoke => "revoke",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            "assign" => Ok(Action::Assign),
            "authorize" => Ok(Action::Authorize),
            "revoke" => Ok(Action::Revoke),
            other => Err(format!("unknown action: {other}")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource position of a permission entry: a named resource or the `"*"`
/// wildcard matching any resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceSpec {
    Any,
    Named(String),
}

impl ResourceSpec {
    pub fn named(resource: &str) -> Self {
        Self::Named(resource.to_string())
    }

    pub fn as_str(&self) -> &str {
        match self {
            ResourceSpec::Any => "*",
            ResourceSpec::Named(name) => name,
        }
    }

    pub fn matches(&self, resource: &str) -> bool {
        match self {
            ResourceSpec::Any => true,
            ResourceSpec::Named(name) => name == resource,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ResourceSpec::Any)
    }
}

impl From<String> for ResourceSpec {
    fn from(value: String) -> Self {
        if value == "*" {
            ResourceSpec::Any
        } else {
            ResourceSpec::Named(value)
        }
    }
}

impl From<ResourceSpec> for String {
    fn from(value: ResourceSpec) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action position of a permission entry: a concrete action or the `"*"`
/// wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionSpec {
    Any,
    Of(Action),
}

impl ActionSpec {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSpec::Any => "*",
            ActionSpec::Of(action) => action.as_str(),
        }
    }

    pub fn matches(&self, action: Action) -> bool {
        match self {
            ActionSpec::Any => true,
            ActionSpec::Of(own) => *own == action,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ActionSpec::Any)
    }
}

impl TryFrom<String> for ActionSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "*" {
            Ok(ActionSpec::Any)
        } else {
            value.parse::<Action>().map(ActionSpec::Of)
        }
    }
}

impl From<ActionSpec> for String {
    fn from(value: ActionSpec) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priority assigned to wildcard rows so they sort after nothing is hidden
/// in listings. Advisory only.
pub const WILDCARD_PRIORITY: i32 = 100;

/// One allow row of the permission table.
///
/// Uniqueness invariant: at most one active entry per (role, resource,
/// action) triple; repositories upsert on that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub id: Uuid,
    pub role: Role,
    pub resource: ResourceSpec,
    pub action: ActionSpec,
    pub is_active: bool,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

impl PermissionEntry {
    pub fn new(role: Role, resource: ResourceSpec, action: ActionSpec) -> Self {
        let priority = if resource.is_wildcard() || action.is_wildcard() {
            WILDCARD_PRIORITY
        } else {
            0
        };
        Self {
            id: Uuid::new_v4(),
            role,
            resource,
            action,
            is_active: true,
            priority,
            created_at: Utc::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Uniqueness key for the (role, resource, action) triple.
    pub fn key(&self) -> String {
        entry_key(self.role, self.resource.as_str(), self.action.as_str())
    }

    pub fn matches(&self, resource: &str, action: Action) -> bool {
        self.is_active && self.resource.matches(resource) && self.action.matches(action)
    }
}

impl fmt::Display for PermissionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.role, self.resource, self.action)
    }
}

/// Composed lookup key for a (role, resource, action) triple.
pub fn entry_key(role: Role, resource: &str, action: &str) -> String {
    format!("{}|{}|{}", role, resource, action)
}
