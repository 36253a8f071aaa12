//! Conda manifest recognition and parsing.
//!
//! Three kinds of file describe Conda packages:
//!
//! | Kind | Typical path | Parser |
//! |------|--------------|--------|
//! | [`ManifestKind::MetadataJson`] | `<env>/conda-meta/<name>-<version>-<build>.json` | [`metadata_json`] |
//! | [`ManifestKind::Recipe`] | `<env>/pkgs/<name>-<version>-<build>/info/recipe/meta.yaml` | [`recipe`] |
//! | [`ManifestKind::Environment`] | `environment.yml`, `conda.yaml` | [`environment`] |
//!
//! Every parser produces [`PackageData`] records; [`ManifestKind::parse`] is
//! the single dispatch point and always returns a (possibly empty) list.
//!
//! # Recognition
//!
//! [`ManifestKind::detect`] matches a `/`-separated resource path against each
//! kind's glob patterns, in priority order: metadata JSON, then recipe, then
//! environment file. A `meta.yaml` is therefore always a recipe, even under an
//! `envs/` directory. Environment patterns are matched against the file name
//! only, so a YAML file nested below a directory called `envs` is not taken
//! for an environment file.
//!
//! ```rust
//! use conda_inspect::manifest::ManifestKind;
//!
//! assert_eq!(
//!     ManifestKind::detect("conda/conda-meta/zlib-1.2.13-h5eee18b_0.json"),
//!     Some(ManifestKind::MetadataJson)
//! );
//! assert_eq!(ManifestKind::detect("project/environment.yml"), Some(ManifestKind::Environment));
//! assert_eq!(ManifestKind::detect("project/README.md"), None);
//! ```

pub mod environment;
pub mod metadata_json;
pub mod recipe;
pub mod requirement;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use crate::core::ScanError;
use crate::models::{DatasourceId, PackageData};
use crate::pattern::PatternMatcher;

const DOCUMENTATION_URL: &str = "https://docs.conda.io/";

/// The closed set of Conda manifest dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    MetadataJson,
    Recipe,
    Environment,
}

static MATCHERS: LazyLock<Vec<(ManifestKind, Vec<PatternMatcher>)>> = LazyLock::new(|| {
    ManifestKind::ALL
        .iter()
        .map(|kind| {
            let matchers = kind
                .path_patterns()
                .iter()
                .map(|p| PatternMatcher::new(p).expect("manifest patterns are valid globs"))
                .collect();
            (*kind, matchers)
        })
        .collect()
});

impl ManifestKind {
    /// All kinds, in recognition priority order.
    pub const ALL: [Self; 3] = [Self::MetadataJson, Self::Recipe, Self::Environment];

    pub const fn datasource_id(self) -> DatasourceId {
        match self {
            Self::MetadataJson => DatasourceId::CondaMetaJson,
            Self::Recipe => DatasourceId::CondaMetaYaml,
            Self::Environment => DatasourceId::CondaYaml,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::MetadataJson => "Conda metadata JSON in rootfs",
            Self::Recipe => "Conda meta.yml manifest",
            Self::Environment => "Conda yaml manifest",
        }
    }

    pub const fn documentation_url(self) -> &'static str {
        DOCUMENTATION_URL
    }

    /// Glob patterns recognizing this kind.
    pub const fn path_patterns(self) -> &'static [&'static str] {
        match self {
            Self::MetadataJson => &["*conda-meta/*.json"],
            Self::Recipe => &["*/meta.yaml"],
            Self::Environment => &[
                "*conda*.yaml",
                "*env*.yaml",
                "*environment*.yaml",
                "*conda*.yml",
                "*env*.yml",
                "*environment*.yml",
            ],
        }
    }

    /// Recognize the manifest kind of a `/`-separated resource path.
    pub fn detect(path: &str) -> Option<Self> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        MATCHERS.iter().find_map(|(kind, matchers)| {
            let candidate = match kind {
                Self::Environment => file_name,
                _ => path,
            };
            matchers.iter().any(|m| m.matches_str(candidate)).then_some(*kind)
        })
    }

    /// Parse a file of this kind into its records.
    pub fn parse(self, path: &Path) -> Result<Vec<PackageData>> {
        Ok(match self {
            Self::MetadataJson => vec![metadata_json::parse(path)?],
            Self::Recipe => recipe::parse(path)?.into_iter().collect(),
            Self::Environment => environment::parse(path)?.into_iter().collect(),
        })
    }
}

/// Recognize `path` and parse it with the matching parser.
///
/// # Errors
///
/// Fails with [`ScanError::UnsupportedManifest`] when the path matches no
/// manifest pattern, otherwise with whatever the parser reports.
pub fn parse_manifest(path: &Path) -> Result<Vec<PackageData>> {
    let candidate = path.to_string_lossy().replace('\\', "/");
    let kind = ManifestKind::detect(&candidate).ok_or_else(|| ScanError::UnsupportedManifest {
        path: path.display().to_string(),
    })?;
    kind.parse(path)
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Read `key` of a YAML mapping as a string; numbers and booleans are
/// rendered in their YAML form (`version: 1.0` gives `"1.0"`).
pub(crate) fn yaml_get_str(value: &YamlValue, key: &str) -> Option<String> {
    value.get(key).and_then(yaml_scalar_to_string)
}

/// Render a mapping key as a string.
pub(crate) fn yaml_key_to_string(key: &YamlValue) -> Option<String> {
    yaml_scalar_to_string(key)
}

fn yaml_scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        _ => None,
    }
}
