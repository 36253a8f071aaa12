//! Conda environment file parsing (`environment.yml`, `conda.yaml`, ...).
//!
//! An environment file describes a project rather than a published package:
//!
//! ```yaml
//! name: ml-project
//! channels:
//!   - conda-forge
//! dependencies:
//!   - conda-forge::scikit-learn=1.2
//!   - numpy >=1.15
//!   - pip:
//!       - flask==2.0.1
//! ```
//!
//! Plain string items are tried as PEP 508 lines first, which yields a `pypi`
//! dependency, and fall back to Conda match specs. Items under a nested
//! `pip:` list are always PEP 508. Every dependency gets the `dependencies`
//! scope and is a direct runtime requirement.

use anyhow::{Context, Result};
use serde_yaml::Value as YamlValue;
use std::path::Path;
use tracing::debug;

use super::requirement::{
    Requirement, is_excluded_name, parse_requirement_line, split_inline_pin, split_namespace,
};
use super::yaml_get_str;
use crate::core::{FileOps, ScanError};
use crate::models::{CONDA_TYPE, DatasourceId, DependentPackage, PackageData};
use crate::purl::PackageUrl;

const SCOPE: &str = "dependencies";
const PYPI_TYPE: &str = "pypi";

/// Parse an environment file.
///
/// Returns `Ok(None)` when the file declares neither a name nor any
/// dependency, or is not a YAML mapping at all.
pub fn parse(path: &Path) -> Result<Option<PackageData>> {
    let content = FileOps::read_with_context(path, "parsing conda environment file", "manifest")?;
    parse_str(&content)
        .with_context(|| format!("Failed to parse conda environment file: {}", path.display()))
}

/// Parse environment file content.
pub fn parse_str(content: &str) -> Result<Option<PackageData>> {
    let document: YamlValue = serde_yaml::from_str(content).map_err(ScanError::from)?;
    if !document.is_mapping() {
        debug!("Environment document is not a mapping");
        return Ok(None);
    }

    let name = yaml_get_str(&document, "name");
    let dependencies = document
        .get("dependencies")
        .and_then(YamlValue::as_sequence)
        .map(|items| collect_dependencies(items))
        .unwrap_or_default();

    if name.is_none() && dependencies.is_empty() {
        return Ok(None);
    }

    let mut data = PackageData::new(DatasourceId::CondaYaml);
    data.name = name;
    data.primary_language = Some("Python".to_string());
    data.is_private = true;
    data.dependencies = dependencies;

    if let Some(channels) = document.get("channels").filter(|c| !is_empty_yaml(c)) {
        data.extra_data.insert("channels".to_string(), serde_json::to_value(channels)?);
    }

    Ok(Some(data))
}

fn collect_dependencies(items: &[YamlValue]) -> Vec<DependentPackage> {
    let mut dependencies = Vec::new();

    for item in items {
        match item {
            YamlValue::String(spec) => {
                if let Some(dep) = parse_spec(spec) {
                    dependencies.push(dep);
                }
            }
            YamlValue::Mapping(_) => {
                let Some(pip) = item.get("pip").and_then(YamlValue::as_sequence) else {
                    continue;
                };
                for line in pip.iter().filter_map(YamlValue::as_str) {
                    match parse_requirement_line(line) {
                        Some(req) => {
                            if let Some(dep) = pypi_dependency(&req) {
                                dependencies.push(dep);
                            }
                        }
                        None => debug!("Skipping pip entry '{}'", line),
                    }
                }
            }
            other => debug!("Skipping environment dependency of unexpected shape: {:?}", other),
        }
    }

    dependencies
}

/// Turn one plain dependency string into a dependency, `None` when excluded.
fn parse_spec(spec: &str) -> Option<DependentPackage> {
    let spec = spec.trim();
    let (namespace, spec) = match split_namespace(spec) {
        // A channel URL such as `https://host/channel::pkg` is not a namespace
        (Some(ns), name) if ns.contains('/') || ns.contains(':') => (None, name),
        split => split,
    };

    let dependency = match parse_requirement_line(spec) {
        Some(req) => pypi_dependency(&req)?,
        None => {
            let (name, version) = split_inline_pin(spec);
            let purl = PackageUrl::new(CONDA_TYPE, name)
                .ok()?
                .with_namespace(namespace)
                .with_version(version);
            dependency(
                purl,
                version.map(|v| format!("={v}")),
                version.is_some(),
            )
        }
    };

    if is_excluded_name(purl_name(&dependency.purl)) {
        return None;
    }
    Some(dependency)
}

fn pypi_dependency(req: &Requirement) -> Option<DependentPackage> {
    let version = req.pinned_version();
    let purl = PackageUrl::new(PYPI_TYPE, &req.name).ok()?.with_version(version);
    Some(dependency(purl, Some(req.specs()), version.is_some()))
}

fn dependency(
    purl: PackageUrl,
    extracted_requirement: Option<String>,
    is_pinned: bool,
) -> DependentPackage {
    DependentPackage {
        purl: purl.to_string(),
        extracted_requirement,
        scope: SCOPE.to_string(),
        is_runtime: true,
        is_optional: false,
        is_pinned,
        is_direct: true,
    }
}

/// The name segment of a formatted purl.
fn purl_name(purl: &str) -> &str {
    let without_version = purl.split(['@', '?']).next().unwrap_or(purl);
    without_version.rsplit('/').next().unwrap_or(without_version)
}

fn is_empty_yaml(value: &YamlValue) -> bool {
    match value {
        YamlValue::Null => true,
        YamlValue::Sequence(items) => items.is_empty(),
        YamlValue::Mapping(map) => map.is_empty(),
        YamlValue::String(s) => s.is_empty(),
        _ => false,
    }
}
