//! Core error types for conda-inspect
//!
//! This module holds the error vocabulary shared by the parsers, the codebase
//! walker and the scan driver.
//!
//! # Modules
//!
//! ## `error` - Typed scan errors
//!
//! - [`ScanError`] - Enumerated failures for a single manifest or configuration file
//!
//! ## `file_error` - File operation context
//!
//! - [`FileOperationError`] - IO error enriched with operation, path, purpose and caller
//! - [`FileOps`] - Context-carrying wrappers for the reads every parser performs
//! - [`FileResultExt`] - Extension trait to attach that context to any `io::Result`
//!
//! # Error First Design
//!
//! Reads and structural parses return [`Result`]. Directory-convention lookups do
//! not: a missing parent, a mismatched package directory name or an absent
//! resource means "no sibling found", never an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use conda_inspect::core::{FileOps, ScanError};
//! use std::path::Path;
//!
//! fn read_manifest(path: &Path) -> anyhow::Result<serde_yaml::Value> {
//!     let content = FileOps::read_with_context(path, "parsing manifest", "example")?;
//!     Ok(serde_yaml::from_str(&content).map_err(ScanError::from)?)
//! }
//! ```
//!
//! [`Result`]: std::result::Result

pub mod error;
pub mod file_error;

pub use error::ScanError;
pub use file_error::{FileOperation, FileOperationError, FileOps, FileResultExt};
