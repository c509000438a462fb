//! Document storage: raw files plus the versioned store built on them

mod content_store;
mod file_store;

pub use content_store::{ContentStore, Divergence, DEFAULT_HISTORY_LIMIT};
pub use file_store::FileStore;
