//! Store Error Types
//!
//! Every failure the content store can surface, each carrying the slug and
//! operation it happened in. [`ErrorKind`] is the coarse classification a
//! request layer maps to responses.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::{DocumentError, FieldProblem};
use crate::history::HistoryError;

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSlug,
    NotFound,
    AlreadyExists,
    MalformedDocument,
    InvalidDocument,
    Io,
    VersionControl,
    RevisionNotFound,
    Unauthorized,
}

/// Error type for content store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid slug {slug:?}: only lowercase letters, digits and hyphens are allowed")]
    InvalidSlug { slug: String },

    #[error("document '{slug}' not found")]
    NotFound { slug: String },

    #[error("document '{slug}' already exists")]
    AlreadyExists { slug: String },

    #[error("document '{slug}' is malformed: {source}")]
    MalformedDocument {
        slug: String,
        #[source]
        source: DocumentError,
    },

    #[error("document '{slug}' failed validation: {}", join_problems(.problems))]
    InvalidDocument {
        slug: String,
        problems: Vec<FieldProblem>,
    },

    #[error("I/O error during {operation} on {}: {source}", .path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("version control error during {operation} of '{slug}': {source}")]
    VersionControl {
        operation: &'static str,
        slug: String,
        #[source]
        source: HistoryError,
    },

    #[error("revision {revision} not found for document '{slug}'")]
    RevisionNotFound { slug: String, revision: String },

    #[error("caller is not authenticated")]
    Unauthorized,
}

/// Result type for content store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSlug { .. } => ErrorKind::InvalidSlug,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Self::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            Self::Io { .. } => ErrorKind::Io,
            Self::VersionControl { .. } => ErrorKind::VersionControl,
            Self::RevisionNotFound { .. } => ErrorKind::RevisionNotFound,
            Self::Unauthorized => ErrorKind::Unauthorized,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(slug: impl Into<String>, source: DocumentError) -> Self {
        Self::MalformedDocument {
            slug: slug.into(),
            source,
        }
    }

    /// Wrap a backend failure, lifting a missing revision into its own kind
    pub(crate) fn history(operation: &'static str, slug: impl Into<String>, source: HistoryError) -> Self {
        let slug = slug.into();
        match source {
            HistoryError::RevisionNotFound { revision, .. } => Self::RevisionNotFound { slug, revision },
            source => Self::VersionControl {
                operation,
                slug,
                source,
            },
        }
    }
}

fn join_problems(problems: &[FieldProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_revision_gets_its_own_kind() {
        let err = StoreError::history(
            "rollback",
            "ising-model",
            HistoryError::RevisionNotFound {
                revision: "abc1234".to_string(),
                path: PathBuf::from("content/projects/ising-model.mdx"),
            },
        );
        assert_eq!(err.kind(), ErrorKind::RevisionNotFound);
        assert_eq!(
            err.to_string(),
            "revision abc1234 not found for document 'ising-model'"
        );
    }

    #[test]
    fn other_history_failures_are_version_control() {
        let err = StoreError::history("create", "ising-model", HistoryError::NothingToCommit);
        assert_eq!(err.kind(), ErrorKind::VersionControl);
        assert!(err.to_string().contains("during create of 'ising-model'"));
    }

    #[test]
    fn validation_message_lists_every_field() {
        let err = StoreError::InvalidDocument {
            slug: "draft".to_string(),
            problems: vec![
                FieldProblem::new("title", "is required"),
                FieldProblem::new("codeUrl", "must be an http(s) URL"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("title is required"));
        assert!(msg.contains("codeUrl must be an http(s) URL"));
    }
}
