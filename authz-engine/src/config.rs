use serde::{Deserialize, Serialize};

/// Tunables for the authorization engine, usually deserialized from the
/// service's configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache role-level decisions between permission-table changes.
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { cache_enabled: true }
    }
}
