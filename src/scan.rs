//! Scan driver: walk, parse, assemble.
//!
//! [`Scanner::scan`] runs the whole pipeline over a directory:
//!
//! 1. walk it into a [`Codebase`], applying the configured ignore patterns;
//! 2. recognize each file's [`ManifestKind`] and parse it, attaching the
//!    records to the resource. A file that fails to parse is logged, recorded
//!    in [`ScanResult::errors`], and the scan goes on;
//! 3. assemble every resource carrying package data, in path order, skipping
//!    manifests an earlier assembly already folded into a package.
//!
//! ```rust,no_run
//! use conda_inspect::config::ScanConfig;
//! use conda_inspect::scan::Scanner;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let result = Scanner::new(ScanConfig::default()).scan(Path::new("/opt/conda"))?;
//! for package in &result.packages {
//!     println!("{} ({} files)", package.purl, result.ownership.resources_of(&package.package_uid).len());
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, trace, warn};

use crate::assembly::{Assembler, AssemblyItem};
use crate::codebase::{Codebase, Resource, ResourceOwnership};
use crate::config::ScanConfig;
use crate::core::{FileOperationError, FileOps};
use crate::manifest::ManifestKind;
use crate::models::{Dependency, Package};

/// A manifest that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    /// Resource path of the manifest
    pub path: String,
    pub kind: ManifestKind,
    /// The error with its full context chain
    pub message: String,
}

/// Everything a scan found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub packages: Vec<Package>,
    pub dependencies: Vec<Dependency>,
    pub ownership: ResourceOwnership,
    pub errors: Vec<ScanIssue>,
}

/// Runs scans with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan a directory, or a single file.
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        let options = self.config.walk_options().context("Invalid ignore pattern in scan configuration")?;
        let mut codebase = Codebase::from_dir(root, &options)?;

        let errors = self.parse_manifests(&mut codebase);
        let mut result = assemble_codebase(&codebase);
        result.errors = errors;

        info!(
            "Scanned {}: {} packages, {} dependencies, {} owned resources, {} errors",
            root.display(),
            result.packages.len(),
            result.dependencies.len(),
            result.ownership.len(),
            result.errors.len()
        );
        Ok(result)
    }

    /// Recognize and parse every manifest of `codebase`, attaching the records.
    ///
    /// Resources without an on-disk location (virtual trees) are skipped.
    pub fn parse_manifests(&self, codebase: &mut Codebase) -> Vec<ScanIssue> {
        let mut parsed = Vec::new();
        let mut errors = Vec::new();

        for resource in codebase.resources().filter(|r| r.is_file) {
            let Some(kind) = self.detect(resource) else {
                continue;
            };
            let Some(location) = &resource.location else {
                continue;
            };
            if !self.within_size_limit(location) {
                debug!("Skipping {}: larger than the configured size limit", resource.path);
                continue;
            }

            trace!("Parsing {} as {:?}", resource.path, kind);
            match kind.parse(location) {
                Ok(records) if records.is_empty() => {
                    trace!("No package data in {}", resource.path);
                }
                Ok(records) => parsed.push((resource.path.clone(), records)),
                Err(e) => {
                    warn!("Failed to parse {}: {:#}", resource.path, e);
                    let message = e
                        .downcast_ref::<FileOperationError>()
                        .map(FileOperationError::user_message)
                        .unwrap_or_else(|| format!("{e:#}"));
                    errors.push(ScanIssue {
                        path: resource.path.clone(),
                        kind,
                        message,
                    });
                }
            }
        }

        for (path, records) in parsed {
            codebase.attach_package_data(&path, records);
        }
        errors
    }

    fn detect(&self, resource: &Resource) -> Option<ManifestKind> {
        // Match on the full location so a single-file scan still sees the
        // directories above the file
        let candidate = resource
            .location
            .as_ref()
            .map(|l| l.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|| resource.path.clone());

        ManifestKind::detect(&candidate)
            .filter(|kind| self.config.environment_files || *kind != ManifestKind::Environment)
    }

    fn within_size_limit(&self, location: &Path) -> bool {
        if self.config.max_file_size.is_none() {
            return true;
        }
        match FileOps::metadata_with_context(location, "checking manifest size", "scan") {
            Ok(metadata) => self.config.allows_size(metadata.len()),
            Err(e) => {
                debug!("{}", e);
                false
            }
        }
    }
}

/// Assemble every resource of `codebase` that carries package data.
pub fn assemble_codebase(codebase: &Codebase) -> ScanResult {
    let mut result = ScanResult::default();
    let mut consumed = HashSet::new();

    for resource in codebase.resources().filter(|r| r.has_package_data()) {
        for package_data in &resource.package_data {
            if consumed.contains(&resource.path) {
                trace!("{} already assembled", resource.path);
                break;
            }

            let items = Assembler::new(codebase, &mut result.ownership).assemble(package_data, resource);
            for item in items {
                match item {
                    AssemblyItem::Package(package) => result.packages.push(package),
                    AssemblyItem::Dependency(dependency) => result.dependencies.push(dependency),
                    AssemblyItem::Resource(path) => {
                        consumed.insert(path);
                    }
                }
            }
        }
    }

    result
}
