//! Document store configuration
//!
//! Where the repository lives and where documents sit inside it.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::{ConfigError, ConfigResult};

/// Document store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root of the version-controlled working tree
    pub repo_root: PathBuf,
    /// Directory holding document files, relative to `repo_root`
    pub content_dir: PathBuf,
    /// File extension for document files, without the leading dot
    pub extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            repo_root: PathBuf::from("."),
            content_dir: PathBuf::from("content/projects"),
            extension: "mdx".to_string(),
        }
    }
}

impl StoreConfig {
    /// Absolute-or-cwd-relative directory holding the document files
    pub fn content_root(&self) -> PathBuf {
        self.repo_root.join(&self.content_dir)
    }

    /// Reject content dirs that would escape the repository
    pub fn validate(&self) -> ConfigResult<()> {
        validate_content_dir(&self.content_dir)?;

        let ext = self.extension.trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::invalid(
                "store.extension",
                format!("{:?} is not a plain alphanumeric extension", self.extension),
            ));
        }
        Ok(())
    }
}

fn validate_content_dir(dir: &Path) -> ConfigResult<()> {
    if dir.as_os_str().is_empty() {
        return Err(ConfigError::invalid("store.content_dir", "must not be empty"));
    }
    for component in dir.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(ConfigError::invalid(
                    "store.content_dir",
                    format!("{} must not contain '..'", dir.display()),
                ))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ConfigError::invalid(
                    "store.content_dir",
                    format!("{} must be relative to store.repo_root", dir.display()),
                ))
            }
        }
    }
    Ok(())
}
