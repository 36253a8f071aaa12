//! Resource-to-package ownership index.
//!
//! Ownership is kept apart from the [`Codebase`] so the tree stays read-only
//! during assembly. Each resource path has at most one owner, identified by
//! its `package_uid`. The first assignment wins: assigning the same owner
//! again is a no-op, and a different owner is reported and ignored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::{Codebase, Resource};

/// Outcome of one [`ResourceOwnership::assign`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The resource had no owner and now has this one
    Assigned,
    /// The resource was already owned by this package
    AlreadyOwned,
    /// The resource is owned by another package; nothing changed
    Conflict,
}

/// Map of resource path to owning `package_uid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceOwnership {
    owners: BTreeMap<String, String>,
}

impl ResourceOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `path` to `package_uid`.
    pub fn assign(&mut self, path: &str, package_uid: &str) -> Assignment {
        match self.owners.get(path) {
            None => {
                self.owners.insert(path.to_string(), package_uid.to_string());
                Assignment::Assigned
            }
            Some(owner) if owner == package_uid => Assignment::AlreadyOwned,
            Some(owner) => {
                warn!(
                    "Resource {} is already owned by {}, not assigning it to {}",
                    path, owner, package_uid
                );
                Assignment::Conflict
            }
        }
    }

    /// Assign `resource` and every resource below it. Returns how many
    /// resources were newly assigned.
    pub fn assign_tree(
        &mut self,
        codebase: &Codebase,
        resource: &Resource,
        package_uid: &str,
    ) -> usize {
        codebase
            .walk(resource)
            .into_iter()
            .filter(|r| self.assign(&r.path, package_uid) == Assignment::Assigned)
            .count()
    }

    /// The owner of `path`, if any.
    pub fn owner_of(&self, path: &str) -> Option<&str> {
        self.owners.get(path.trim_end_matches('/')).map(String::as_str)
    }

    /// Paths owned by `package_uid`, in path order.
    pub fn resources_of(&self, package_uid: &str) -> Vec<&str> {
        self.owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == package_uid)
            .map(|(path, _)| path.as_str())
            .collect()
    }

    /// All `(path, owner)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.owners.iter().map(|(path, owner)| (path.as_str(), owner.as_str()))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
