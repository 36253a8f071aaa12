//! Error handling for conda-inspect
//!
//! This module provides the typed errors raised while reading and parsing Conda
//! manifests. The error system follows two rules:
//! 1. **Strongly-typed errors** for the failures a caller may want to match on
//! 2. **Graceful degradation** for everything else: a broken directory convention
//!    or a resource missing from the tree is never an error, it simply yields
//!    "nothing found"
//!
//! # Error Categories
//!
//! - **Parsing**: [`ScanError::ManifestParseError`], [`ScanError::YamlError`],
//!   [`ScanError::JsonError`] for malformed structured data after template cleanup
//! - **Configuration**: [`ScanError::ConfigError`], [`ScanError::TomlError`],
//!   [`ScanError::InvalidPattern`]
//!
//! # Error Conversion
//!
//! Common library errors are converted automatically:
//! - [`serde_yaml::Error`] → [`ScanError::YamlError`]
//! - [`serde_json::Error`] → [`ScanError::JsonError`]
//! - [`toml::de::Error`] → [`ScanError::TomlError`]
//!
//! Unreadable files surface as [`crate::core::FileOperationError`], never as a
//! `ScanError` variant.
//!
//! Public entry points return [`anyhow::Result`] and attach the offending file
//! path with `.with_context(...)`; the typed error stays available through
//! [`anyhow::Error::downcast_ref`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use conda_inspect::core::ScanError;
//!
//! fn handle_error(error: &ScanError) {
//!     match error {
//!         ScanError::ManifestParseError { file, reason } => {
//!             eprintln!("Skipping {file}: {reason}");
//!         }
//!         ScanError::YamlError(e) => eprintln!("Broken YAML: {e}"),
//!         other => eprintln!("Unexpected error: {other}"),
//!     }
//! }
//! ```

use thiserror::Error;

/// The main error type for manifest parsing and scanning.
///
/// Every variant describes a failure that is fatal for a *single* artifact.
/// Nothing here aborts a whole scan: the scan driver records the error against
/// the manifest path and moves on to the next resource.
#[derive(Error, Debug)]
pub enum ScanError {
    /// A manifest was read but its content is not usable
    ///
    /// Raised when the structured data parses but has the wrong shape, for
    /// example a metadata JSON whose top level is an array.
    ///
    /// # Fields
    /// - `file`: Path of the manifest that failed to parse
    /// - `reason`: What was wrong with it
    #[error("Invalid manifest syntax in {file}: {reason}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// The path does not match any known Conda manifest pattern
    #[error("Not a recognized Conda manifest: {path}")]
    UnsupportedManifest {
        /// Path that was offered for parsing
        path: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// A glob pattern from the configuration could not be compiled
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Reason reported by the glob compiler
        reason: String,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl ScanError {
    /// Build a [`ScanError::ManifestParseError`] for `file`.
    pub fn manifest_parse(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ManifestParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
