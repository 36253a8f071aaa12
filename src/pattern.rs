//! Glob pattern matching over resource paths.
//!
//! Manifest recognition and scan ignore rules are both expressed as glob
//! patterns matched against `/`-separated resource paths such as
//! `conda/conda-meta/requests-2.32.3-py312h06a4308_1.json`.
//!
//! # Pattern Syntax
//!
//! - `*` matches any sequence of characters, `/` included, so `*/meta.yaml`
//!   matches a `meta.yaml` at any depth
//! - `**` matches any sequence of path components
//! - `?` matches any single character
//! - `[abc]` and `[a-z]` match one character from a set or range
//!
//! Matching is case-sensitive.
//!
//! # Examples
//!
//! ```rust
//! use conda_inspect::pattern::{PatternMatcher, PatternSet};
//! use std::path::Path;
//!
//! # fn example() -> Result<(), conda_inspect::core::ScanError> {
//! let matcher = PatternMatcher::new("*conda-meta/*.json")?;
//! assert!(matcher.matches(Path::new("rootfs/opt/conda/conda-meta/zlib-1.2.13-h5eee18b_0.json")));
//!
//! let ignore = PatternSet::from_patterns(&["**/.git".to_string(), "**/.git/**".to_string()])?;
//! assert!(ignore.is_match("project/.git/config"));
//! # Ok(())
//! # }
//! ```

use glob::Pattern;
use std::path::Path;
use tracing::trace;

use crate::core::ScanError;

/// A single compiled glob pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Pattern,
    original_pattern: String,
}

impl PatternMatcher {
    /// Compile a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidPattern`] when the pattern is not valid
    /// glob syntax, e.g. an unclosed character class.
    pub fn new(pattern_str: &str) -> Result<Self, ScanError> {
        let pattern = Pattern::new(pattern_str).map_err(|e| ScanError::InvalidPattern {
            pattern: pattern_str.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            original_pattern: pattern_str.to_string(),
        })
    }

    /// Checks a path, rendered with `/` separators.
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.matches_str(&path_str)
    }

    /// Checks an already `/`-separated path string.
    pub fn matches_str(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    /// The pattern as given to [`PatternMatcher::new`].
    pub fn pattern(&self) -> &str {
        &self.original_pattern
    }
}

/// Several patterns tested together; a path matches if any pattern does.
///
/// Used for scan ignore rules.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    matchers: Vec<PatternMatcher>,
}

impl PatternSet {
    /// An empty set, matching nothing.
    pub const fn new() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Compile every pattern of `patterns`.
    pub fn from_patterns(patterns: &[String]) -> Result<Self, ScanError> {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(pattern)?;
        }
        Ok(set)
    }

    /// Add one pattern to the set.
    pub fn add(&mut self, pattern: &str) -> Result<(), ScanError> {
        self.matchers.push(PatternMatcher::new(pattern)?);
        Ok(())
    }

    /// Whether any pattern matches `path`.
    pub fn is_match(&self, path: &str) -> bool {
        let matched = self.matchers.iter().find(|m| m.matches_str(path));
        if let Some(matcher) = matched {
            trace!("Path '{}' matched pattern '{}'", path, matcher.pattern());
        }
        matched.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }
}
