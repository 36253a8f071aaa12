//! In-memory resource tree.
//!
//! A [`Codebase`] indexes every file and directory of a scan by a
//! `/`-separated path whose first segment is the name of the scan root:
//! scanning `/tmp/rootfs` yields `rootfs`, `rootfs/opt`,
//! `rootfs/opt/conda/conda-meta/zlib-1.2.13-h5eee18b_0.json`, ... Parsed
//! manifest records hang off their [`Resource`].
//!
//! The tree is read-only once built, apart from attaching package data. Who
//! owns which resource is tracked separately in [`ResourceOwnership`].
//!
//! Trees can also be built from bare path lists with
//! [`Codebase::from_paths`], which is how the assembly engine is exercised
//! without touching the file system.

pub mod ownership;

pub use ownership::{Assignment, ResourceOwnership};

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::{FileOperation, FileResultExt, ScanError};
use crate::models::PackageData;
use crate::pattern::PatternSet;

/// One file or directory of the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    /// `/`-separated path starting with the root name
    pub path: String,
    /// Last path segment
    pub name: String,
    pub is_file: bool,
    /// On-disk location, absent for virtual trees
    pub location: Option<PathBuf>,
    /// Records parsed from this resource when it is a manifest
    pub package_data: Vec<PackageData>,
}

impl Resource {
    fn new(path: String, is_file: bool, location: Option<PathBuf>) -> Self {
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            path,
            name,
            is_file,
            location,
            package_data: Vec::new(),
        }
    }

    /// Whether a manifest parser produced at least one record for this resource.
    pub fn has_package_data(&self) -> bool {
        !self.package_data.is_empty()
    }
}

/// Options for walking a directory into a [`Codebase`].
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Resources whose path matches are skipped, with their subtree
    pub ignore: PatternSet,
    pub follow_links: bool,
}

/// Resources keyed by path.
#[derive(Debug, Clone, Default)]
pub struct Codebase {
    resources: BTreeMap<String, Resource>,
}

impl Codebase {
    /// Walk `root` on disk.
    ///
    /// # Errors
    ///
    /// Fails when `root` does not exist or has no usable file name. Entries
    /// that cannot be read during the walk are logged and skipped.
    pub fn from_dir(root: &Path, options: &WalkOptions) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_file_context(FileOperation::Walk, root, "resolving scan root", "codebase")
            .with_context(|| format!("Failed to canonicalize scan root: {}", root.display()))?;
        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ScanError::ConfigError {
                message: format!("Scan root has no name: {}", root.display()),
            })?;

        debug!("Building codebase from {}", root.display());
        let mut resources = BTreeMap::new();

        let walker = WalkDir::new(&root)
            .follow_links(options.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let path = resource_path(&root_name, &root, entry.path());
                let keep = entry.depth() == 0 || !options.ignore.is_match(&path);
                if !keep {
                    trace!("Ignoring {}", path);
                }
                keep
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = resource_path(&root_name, &root, entry.path());
            trace!("Indexed {}", path);
            let resource = Resource::new(
                path.clone(),
                entry.file_type().is_file(),
                Some(entry.path().to_path_buf()),
            );
            resources.insert(path, resource);
        }

        debug!("Codebase has {} resources", resources.len());
        Ok(Self {
            resources,
        })
    }

    /// Build a virtual tree from `/`-separated paths.
    ///
    /// Every path is a file unless it ends with `/`. Missing parent
    /// directories are created.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resources = BTreeMap::new();

        for raw in paths {
            let raw = raw.as_ref();
            let is_file = !raw.ends_with('/');
            let path = raw.trim_matches('/');
            if path.is_empty() {
                continue;
            }

            let mut ancestor = path;
            while let Some((parent, _)) = ancestor.rsplit_once('/') {
                resources
                    .entry(parent.to_string())
                    .or_insert_with(|| Resource::new(parent.to_string(), false, None));
                ancestor = parent;
            }

            resources.insert(path.to_string(), Resource::new(path.to_string(), is_file, None));
        }

        Self {
            resources,
        }
    }

    /// Look up a resource; a trailing `/` is ignored.
    pub fn get_resource(&self, path: &str) -> Option<&Resource> {
        self.resources.get(path.trim_end_matches('/'))
    }

    /// The directory holding `resource`, `None` at the root.
    pub fn parent(&self, resource: &Resource) -> Option<&Resource> {
        let (parent, _) = resource.path.rsplit_once('/')?;
        self.resources.get(parent)
    }

    /// `resource` followed by all its descendants, in path order.
    pub fn walk<'a>(&'a self, resource: &'a Resource) -> Vec<&'a Resource> {
        let prefix = format!("{}/", resource.path);
        let mut walked = vec![resource];
        walked.extend(
            self.resources
                .range(prefix.clone()..)
                .take_while(|(path, _)| path.starts_with(&prefix))
                .map(|(_, r)| r),
        );
        walked
    }

    /// All resources in path order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Whether the scan covered exactly one resource (a single-file scan).
    pub fn has_single_resource(&self) -> bool {
        self.resources.len() == 1
    }

    /// Store parsed records on a resource. Returns `false` if it does not exist.
    pub fn attach_package_data(&mut self, path: &str, package_data: Vec<PackageData>) -> bool {
        match self.resources.get_mut(path.trim_end_matches('/')) {
            Some(resource) => {
                resource.package_data.extend(package_data);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

fn resource_path(root_name: &str, root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => root_name.to_string(),
        Ok(relative) => {
            let segments: Vec<_> =
                relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
            format!("{root_name}/{}", segments.join("/"))
        }
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}
