//! Shared package data models
//!
//! This module defines the records that flow through conda-inspect:
//!
//! - [`PackageData`] - one normalized record produced by a manifest parser
//! - [`DependentPackage`] - one dependency declared by a manifest
//! - [`Package`] - the logical package assembled from one or more records
//! - [`Dependency`] - a [`DependentPackage`] tagged with its manifest and owning package
//!
//! Parsers create [`PackageData`] and never touch it again. The assembly engine
//! turns the first record with a package URL into a [`Package`] and may merge at
//! most one more record (the recipe) into it with [`Package::update`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::purl::PackageUrl;

/// Package type shared by every Conda record.
pub const CONDA_TYPE: &str = "conda";

/// Free-form data that does not map onto the common record fields.
pub type ExtraData = BTreeMap<String, JsonValue>;

/// Identifies which parser produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasourceId {
    /// `conda-meta/*.json` written by the package manager
    CondaMetaJson,
    /// `meta.yaml` build recipe
    CondaMetaYaml,
    /// Environment file (`environment.yml`, `conda.yaml`, ...)
    CondaYaml,
}

impl DatasourceId {
    /// The stable string tag used in serialized output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CondaMetaJson => "conda_meta_json",
            Self::CondaMetaYaml => "conda_meta_yaml",
            Self::CondaYaml => "conda_yaml",
        }
    }
}

impl fmt::Display for DatasourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentPackage {
    /// Package URL of the dependency, version included only when pinned
    pub purl: String,
    /// The constraint as written (`>=1.15`, `=1.2`, `==2.0.1`)
    pub extracted_requirement: Option<String>,
    /// Requirement group: `run`, `build`, `host`, `dependencies`, ...
    pub scope: String,
    pub is_runtime: bool,
    pub is_optional: bool,
    /// True iff an exact version was extracted
    pub is_pinned: bool,
    /// Always true: no transitive resolution happens here
    pub is_direct: bool,
}

/// A normalized record produced by one manifest parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageData {
    pub datasource_id: DatasourceId,
    #[serde(rename = "type")]
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub primary_language: Option<String>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub download_url: Option<String>,
    pub vcs_url: Option<String>,
    pub extracted_license_statement: Option<String>,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub is_private: bool,
    #[serde(default)]
    pub dependencies: Vec<DependentPackage>,
    #[serde(default)]
    pub extra_data: ExtraData,
}

impl PackageData {
    /// Start an empty Conda record for `datasource_id`.
    pub fn new(datasource_id: DatasourceId) -> Self {
        Self {
            datasource_id,
            package_type: CONDA_TYPE.to_string(),
            namespace: None,
            name: None,
            version: None,
            primary_language: None,
            description: None,
            homepage_url: None,
            download_url: None,
            vcs_url: None,
            extracted_license_statement: None,
            size: None,
            md5: None,
            sha256: None,
            is_private: false,
            dependencies: Vec::new(),
            extra_data: ExtraData::new(),
        }
    }

    /// The canonical identifier of this record, or `None` without a name.
    pub fn purl(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        PackageUrl::new(&self.package_type, name)
            .ok()
            .map(|purl| {
                purl.with_namespace(self.namespace.as_deref())
                    .with_version(self.version.as_deref())
                    .to_string()
            })
    }

    /// Read a string entry from `extra_data`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra_data.get(key).and_then(JsonValue::as_str)
    }
}

/// The logical package assembled from one or more manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// `purl` plus a `uuid` qualifier, unique per assembled package
    pub package_uid: String,
    /// Fixed when the package is created
    pub purl: String,
    #[serde(rename = "type")]
    pub package_type: String,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub primary_language: Option<String>,
    pub description: Option<String>,
    pub homepage_url: Option<String>,
    pub download_url: Option<String>,
    pub vcs_url: Option<String>,
    pub extracted_license_statement: Option<String>,
    pub size: Option<u64>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub is_private: bool,
    pub extra_data: ExtraData,
    /// Every manifest merged into this package, in merge order
    pub datafile_paths: Vec<String>,
    pub datasource_ids: Vec<DatasourceId>,
}

impl Package {
    /// Create a package from a record, or `None` when the record has no purl.
    pub fn from_package_data(package_data: &PackageData, datafile_path: &str) -> Option<Self> {
        let purl = package_data.purl()?;
        Some(Self {
            package_uid: build_uid(&purl),
            purl,
            package_type: package_data.package_type.clone(),
            namespace: package_data.namespace.clone(),
            name: package_data.name.clone(),
            version: package_data.version.clone(),
            primary_language: package_data.primary_language.clone(),
            description: package_data.description.clone(),
            homepage_url: package_data.homepage_url.clone(),
            download_url: package_data.download_url.clone(),
            vcs_url: package_data.vcs_url.clone(),
            extracted_license_statement: package_data.extracted_license_statement.clone(),
            size: package_data.size,
            md5: package_data.md5.clone(),
            sha256: package_data.sha256.clone(),
            is_private: package_data.is_private,
            extra_data: package_data.extra_data.clone(),
            datafile_paths: vec![datafile_path.to_string()],
            datasource_ids: vec![package_data.datasource_id],
        })
    }

    /// Merge another record into this package.
    ///
    /// Identity (type, namespace, name, version, purl, uid) never changes. Any
    /// descriptive field the record provides replaces the current value; fields
    /// the record leaves empty keep theirs. `extra_data` is merged per key with
    /// the record winning.
    pub fn update(&mut self, package_data: &PackageData, datafile_path: &str) {
        fn fill(field: &mut Option<String>, value: &Option<String>) {
            if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                *field = Some(value.clone());
            }
        }

        fill(&mut self.primary_language, &package_data.primary_language);
        fill(&mut self.description, &package_data.description);
        fill(&mut self.homepage_url, &package_data.homepage_url);
        fill(&mut self.download_url, &package_data.download_url);
        fill(&mut self.vcs_url, &package_data.vcs_url);
        fill(&mut self.extracted_license_statement, &package_data.extracted_license_statement);
        fill(&mut self.md5, &package_data.md5);
        fill(&mut self.sha256, &package_data.sha256);
        if package_data.size.is_some() {
            self.size = package_data.size;
        }

        for (key, value) in &package_data.extra_data {
            self.extra_data.insert(key.clone(), value.clone());
        }

        if !self.datafile_paths.iter().any(|p| p == datafile_path) {
            self.datafile_paths.push(datafile_path.to_string());
        }
        if !self.datasource_ids.contains(&package_data.datasource_id) {
            self.datasource_ids.push(package_data.datasource_id);
        }
    }
}

/// A dependency attached to the manifest that declared it and its package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub purl: String,
    pub extracted_requirement: Option<String>,
    pub scope: String,
    pub is_runtime: bool,
    pub is_optional: bool,
    pub is_pinned: bool,
    pub is_direct: bool,
    pub dependency_uid: String,
    pub for_package_uid: Option<String>,
    pub datafile_path: String,
    pub datasource_id: DatasourceId,
}

impl Dependency {
    /// Tag every dependent package of a manifest with its origin.
    pub fn from_dependent_packages(
        dependent_packages: &[DependentPackage],
        datafile_path: &str,
        datasource_id: DatasourceId,
        package_uid: Option<&str>,
    ) -> Vec<Self> {
        dependent_packages
            .iter()
            .map(|dep| Self {
                purl: dep.purl.clone(),
                extracted_requirement: dep.extracted_requirement.clone(),
                scope: dep.scope.clone(),
                is_runtime: dep.is_runtime,
                is_optional: dep.is_optional,
                is_pinned: dep.is_pinned,
                is_direct: dep.is_direct,
                dependency_uid: build_uid(&dep.purl),
                for_package_uid: package_uid.map(String::from),
                datafile_path: datafile_path.to_string(),
                datasource_id,
            })
            .collect()
    }
}

fn build_uid(purl: &str) -> String {
    let separator = if purl.contains('?') { '&' } else { '?' };
    format!("{purl}{separator}uuid={}", Uuid::new_v4())
}
