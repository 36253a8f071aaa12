//! conda-inspect - Conda package manifest inspection
//!
//! Finds the Conda package manifests in a directory tree, parses them into
//! normalized package records, and assembles the records of one installed
//! package into a single [`Package`](models::Package) that owns the files the
//! package brought into the tree.
//!
//! # Architecture Overview
//!
//! A scan runs in three stages:
//!
//! 1. **Walk**: the directory is indexed into a [`Codebase`](codebase::Codebase),
//!    a read-only tree of resources keyed by path
//! 2. **Parse**: each file matching a [`ManifestKind`](manifest::ManifestKind)
//!    pattern is parsed into [`PackageData`](models::PackageData) records
//! 3. **Assemble**: records are correlated through directory conventions
//!    and turned into packages, dependencies and a
//!    [`ResourceOwnership`](codebase::ResourceOwnership) index
//!
//! ## Supported Manifests
//!
//! | Kind | Path pattern | Parser |
//! |------|--------------|--------|
//! | Installed package metadata | `*conda-meta/*.json` | [`manifest::metadata_json`] |
//! | Build recipe | `*/meta.yaml` | [`manifest::recipe`] |
//! | Environment file | `*conda*.yaml`, `*env*.yml`, ... | [`manifest::environment`] |
//!
//! Recipes are Jinja2 templates; [`templating`] performs the crude variable
//! substitution needed to read them as YAML.
//!
//! # Core Modules
//!
//! - [`assembly`] - Sibling lookups and package assembly
//! - [`codebase`] - Resource tree and ownership index
//! - [`config`] - Scan configuration (`conda-inspect.toml`)
//! - [`core`] - Error types and file operation context
//! - [`manifest`] - Manifest recognition and the three parsers
//! - [`models`] - Package, dependency and record models
//! - [`pattern`] - Glob pattern matching
//! - [`purl`] - Package URL construction
//! - [`scan`] - The scan driver
//! - [`templating`] - Recipe template resolution
//!
//! # Example
//!
//! ```rust,no_run
//! use conda_inspect::{ScanConfig, Scanner};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let result = Scanner::new(ScanConfig::default()).scan(Path::new("/opt/conda"))?;
//! for package in &result.packages {
//!     println!("{}", package.purl);
//! }
//! for dependency in &result.dependencies {
//!     println!("  {} ({})", dependency.purl, dependency.scope);
//! }
//! # Ok(())
//! # }
//! ```

pub mod assembly;
pub mod codebase;
pub mod config;
pub mod core;
pub mod manifest;
pub mod models;
pub mod pattern;
pub mod purl;
pub mod scan;
pub mod templating;

// test_utils is available for unit tests and, with the `test-utils` feature,
// for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ScanConfig;
pub use core::ScanError;
pub use manifest::ManifestKind;
pub use scan::{ScanResult, Scanner};
