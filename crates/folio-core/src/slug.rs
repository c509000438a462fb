//! Document identifiers
//!
//! A slug is the only thing that ever becomes part of a file path, so every
//! path is built from a [`Slug`] and a `Slug` can only be obtained through
//! [`validate`].

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("static regex"));
static SEPARATOR_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_-]+").expect("static regex"));

/// Turn an arbitrary title into slug form.
///
/// Total: never fails, but returns an empty string when nothing usable is
/// left. Callers must reject empty output.
pub fn normalize(raw_title: &str) -> String {
    let lowered = raw_title.trim().to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_' || c.is_whitespace()
        })
        .collect();
    SEPARATOR_RUN_RE
        .replace_all(&kept, "-")
        .trim_matches('-')
        .to_string()
}

/// True iff `slug` is non-empty and only `[a-z0-9-]`
pub fn validate(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

/// A validated document identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate an existing slug
    pub fn new(slug: impl Into<String>) -> StoreResult<Self> {
        let slug = slug.into();
        if validate(&slug) {
            Ok(Self(slug))
        } else {
            Err(StoreError::InvalidSlug { slug })
        }
    }

    /// Derive a slug from a human title
    pub fn from_title(title: &str) -> StoreResult<Self> {
        Self::new(normalize(title)).map_err(|_| StoreError::InvalidSlug {
            slug: title.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Slug {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Slug {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}
