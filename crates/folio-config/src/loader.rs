//! Config file discovery and layering

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{ConfigError, ConfigResult, FolioConfig};

/// Loads [`FolioConfig`] from file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader that reads the default config file if it exists
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit config file; a missing file is an error
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Default config path: `$XDG_CONFIG_HOME/folio/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            })
            .join("folio")
            .join("config.toml")
    }

    /// Load defaults, then the file, then `FOLIO_*` env overrides, then validate
    pub fn load(&self) -> ConfigResult<FolioConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an injectable environment lookup
    pub fn load_with_env<F>(&self, env: F) -> ConfigResult<FolioConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.file {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!("No config file at {}, using defaults", path.display());
                    FolioConfig::default()
                }
            }
        };

        apply_env_overrides(&mut config, env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a single TOML file without env overrides or validation
    pub fn from_file(path: &Path) -> ConfigResult<FolioConfig> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(FolioConfig::default());
        }
        debug!("Loaded config file {}", path.display());
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn apply_env_overrides<F>(config: &mut FolioConfig, env: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = env("FOLIO_REPO_ROOT") {
        config.store.repo_root = PathBuf::from(root);
    }
    if let Some(dir) = env("FOLIO_CONTENT_DIR") {
        config.store.content_dir = PathBuf::from(dir);
    }
    if let Some(ext) = env("FOLIO_EXTENSION") {
        config.store.extension = ext;
    }
    if let Some(name) = env("FOLIO_AUTHOR_NAME") {
        config.history.author_name = name;
    }
    if let Some(email) = env("FOLIO_AUTHOR_EMAIL") {
        config.history.author_email = email;
    }
    if let Some(limit) = env("FOLIO_HISTORY_LIMIT") {
        config.history.limit = limit.parse().map_err(|_| ConfigError::InvalidEnv {
            var: "FOLIO_HISTORY_LIMIT",
            value: limit.clone(),
        })?;
    }
    if let Some(level) = env("FOLIO_LOG") {
        config.logging.level = level;
    }
    Ok(())
}
