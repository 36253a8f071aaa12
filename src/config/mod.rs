//! Scan configuration.
//!
//! A scan is driven by a [`ScanConfig`], usually left at its defaults and
//! optionally loaded from a TOML file:
//!
//! ```toml
//! # Skip VCS metadata and vendored trees
//! ignore = ["**/.git", "**/.git/**", "**/node_modules/**"]
//!
//! # Follow symbolic links while walking (off by default)
//! follow_links = false
//!
//! # Recognize environment files (environment.yml, conda.yaml, ...)
//! environment_files = true
//!
//! # Files larger than this are indexed but never parsed
//! max_file_size = 10485760
//! ```
//!
//! Every field is optional; missing fields take the values of
//! [`ScanConfig::default`].

mod parser;

pub use parser::parse_config;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codebase::WalkOptions;
use crate::core::ScanError;
use crate::pattern::PatternSet;

fn default_ignore() -> Vec<String> {
    vec!["**/.git".to_string(), "**/.git/**".to_string()]
}

const fn default_environment_files() -> bool {
    true
}

/// Settings for one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Glob patterns of resource paths to skip, subtree included.
    ///
    /// Patterns are matched against paths that start with the scan root's
    /// name, e.g. `rootfs/opt/conda/pkgs`.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Follow symbolic links while walking.
    #[serde(default)]
    pub follow_links: bool,

    /// Recognize Conda environment files. Their name patterns are broad
    /// (`*env*.yaml`), so trees full of unrelated YAML may want this off.
    #[serde(default = "default_environment_files")]
    pub environment_files: bool,

    /// Size limit in bytes above which a manifest is not parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore(),
            follow_links: false,
            environment_files: default_environment_files(),
            max_file_size: None,
        }
    }
}

impl ScanConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        parse_config(path)
    }

    /// Compile the ignore patterns.
    pub fn ignore_patterns(&self) -> Result<PatternSet, ScanError> {
        PatternSet::from_patterns(&self.ignore)
    }

    /// The walk settings for building a codebase.
    pub fn walk_options(&self) -> Result<WalkOptions, ScanError> {
        Ok(WalkOptions {
            ignore: self.ignore_patterns()?,
            follow_links: self.follow_links,
        })
    }

    /// Whether a file of `size` bytes may be parsed.
    pub fn allows_size(&self, size: u64) -> bool {
        self.max_file_size.is_none_or(|max| size <= max)
    }
}
