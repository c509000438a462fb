//! # Folio Configuration Library
//!
//! Type-safe configuration for the folio content store.
//!
//! ## Sources
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`$XDG_CONFIG_HOME/folio/config.toml` or an explicit path)
//! 3. `FOLIO_*` environment variables
//! 4. Command-line overrides applied by the caller
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use folio_config::ConfigLoader;
//!
//! let config = ConfigLoader::new().load()?;
//! println!("documents live in {}", config.store.content_root().display());
//! # Ok::<(), folio_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod components;
mod error;
mod loader;

pub use components::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::*;

use serde::{Deserialize, Serialize};

/// Top-level folio configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    /// Where documents live on disk
    pub store: StoreConfig,
    /// Version history settings
    pub history: HistoryConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

impl FolioConfig {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        self.store.validate()?;
        self.history.validate()?;
        Ok(())
    }
}
