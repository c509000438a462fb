//! Version history configuration

use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Version history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Author name recorded on every revision
    pub author_name: String,
    /// Author email recorded on every revision
    pub author_email: String,
    /// Maximum revisions returned by a per-document history query
    pub limit: usize,
    /// Create the repository on open when `repo_root` has none
    pub init_repository: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            author_name: "folio".to_string(),
            author_email: "folio@localhost".to_string(),
            limit: 20,
            init_repository: false,
        }
    }
}

impl HistoryConfig {
    /// Reject values the backend cannot use
    pub fn validate(&self) -> ConfigResult<()> {
        if self.limit == 0 {
            return Err(ConfigError::invalid("history.limit", "must be at least 1"));
        }
        if self.author_name.trim().is_empty() {
            return Err(ConfigError::invalid("history.author_name", "must not be blank"));
        }
        if self.author_email.trim().is_empty() {
            return Err(ConfigError::invalid("history.author_email", "must not be blank"));
        }
        Ok(())
    }
}
