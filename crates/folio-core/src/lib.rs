//! # Folio Core
//!
//! A versioned content store. Documents are frontmatter-plus-body files, one
//! per slug, and every create, update, delete or rollback is recorded as
//! exactly one revision in a history backend (git by default).
//!
//! ```rust,no_run
//! use folio_core::{Capability, ContentStore, DocumentPatch};
//!
//! # async fn demo(config: folio_config::FolioConfig) -> folio_core::StoreResult<()> {
//! let store = ContentStore::open(&config).await?;
//! let cap = Capability::grant(&true)?;
//! store
//!     .update(&cap, "ising-model", DocumentPatch {
//!         results: Some("validated against analytic solution".into()),
//!         ..Default::default()
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod document;
mod error;
pub mod history;
pub mod slug;
pub mod storage;

pub use auth::{Capability, SessionGate};
pub use document::{Document, DocumentError, DocumentPatch, FieldProblem, Metadata};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use history::{
    GitBackend, HistoryBackend, HistoryError, HistoryResult, PathState, PathStatus, Revision,
    RevisionId, Signature,
};
pub use slug::Slug;
pub use storage::{ContentStore, Divergence, FileStore};

#[cfg(feature = "test-utils")]
pub mod test_utils;
