//! Backend configuration.

use serde::Deserialize;

use oncommit_task::{DEFAULT_QUEUE_NAME, TaskError};

/// Alias used when a backend is configured without one.
pub const DEFAULT_BACKEND_ALIAS: &str = "default";

/// Configuration for a task backend.
///
/// ```toml
/// alias = "default"
/// enqueue_on_commit = true
/// queues = ["default", "emails"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Identifier stamped into every produced result
    pub alias: String,
    /// Defer execution until the active transaction commits (tasks may override)
    pub enqueue_on_commit: bool,
    /// Queue names tasks may target (empty = any queue)
    pub queues: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            alias: DEFAULT_BACKEND_ALIAS.to_string(),
            enqueue_on_commit: true,
            queues: vec![DEFAULT_QUEUE_NAME.to_string()],
        }
    }
}

impl BackendConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, TaskError> {
        toml::from_str(source).map_err(|e| TaskError::Configuration(e.to_string()))
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn with_enqueue_on_commit(mut self, enqueue_on_commit: bool) -> Self {
        self.enqueue_on_commit = enqueue_on_commit;
        self
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a task may target `queue_name` on this backend.
    pub fn allows_queue(&self, queue_name: &str) -> bool {
        self.queues.is_empty() || self.queues.iter().any(|q| q == queue_name)
    }
}
