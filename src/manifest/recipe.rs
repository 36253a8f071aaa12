//! Conda build recipe (`meta.yaml`) parsing.
//!
//! Recipes are templated, so the file first goes through
//! [`crate::templating::resolve_file`]; the cleaned text is then read as YAML
//! and the fixed sections are mapped onto a [`PackageData`]:
//!
//! | Recipe field      | Record field                  |
//! |-------------------|-------------------------------|
//! | `package.name`    | `name`                        |
//! | `package.version` | `version`                     |
//! | `source.url`      | `download_url`                |
//! | `source.sha256`   | `sha256`                      |
//! | `about.home`      | `homepage_url`                |
//! | `about.license`   | `extracted_license_statement` |
//! | `about.summary`   | `description`                 |
//! | `about.dev_url`   | `vcs_url`                     |
//!
//! The fixed sections are read into typed structs so scalars keep their literal
//! text (`version: 3.10` stays `3.10`). A recipe whose sections have an
//! unexpected shape falls back to a lenient walk over the YAML tree.
//!
//! `requirements` maps a scope (`build`, `host`, `run`, ...) to a list of
//! Conda match specs, each turned into a [`DependentPackage`]. `python` and
//! `pip` entries are not dependencies; their raw strings are kept in
//! `extra_data[<scope>]`.

use anyhow::{Context, Result};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::fmt;
use std::path::Path;
use tracing::debug;

use super::requirement::{is_excluded_name, split_inline_pin, split_namespace};
use super::{yaml_get_str, yaml_key_to_string};
use crate::core::ScanError;
use crate::models::{CONDA_TYPE, DatasourceId, DependentPackage, PackageData};
use crate::purl::PackageUrl;
use crate::templating;

/// Parse a recipe file.
///
/// Returns `Ok(None)` when the resolved document is empty or not a mapping.
pub fn parse(path: &Path) -> Result<Option<PackageData>> {
    let resolved = templating::resolve_file(path)?;
    parse_str(&resolved.text)
        .with_context(|| format!("Failed to parse conda recipe: {}", path.display()))
}

/// The fixed recipe sections, read with their scalar text intact.
#[derive(Debug, Default, Deserialize)]
struct RecipeSections {
    package: Option<PackageSection>,
    source: Option<SourceSection>,
    about: Option<AboutSection>,
}

#[derive(Debug, Default, Deserialize)]
struct PackageSection {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceFields {
    url: Option<String>,
    sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AboutSection {
    home: Option<String>,
    license: Option<String>,
    summary: Option<String>,
    dev_url: Option<String>,
}

/// `source` is either one mapping or a list of them; only the first counts.
#[derive(Debug, Default)]
struct SourceSection(SourceFields);

impl<'de> Deserialize<'de> for SourceSection {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SourceVisitor;

        impl<'de> Visitor<'de> for SourceVisitor {
            type Value = SourceSection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a source mapping or a list of source mappings")
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                SourceFields::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(SourceSection)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let first = seq.next_element::<SourceFields>()?.unwrap_or_default();
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(SourceSection(first))
            }
        }

        deserializer.deserialize_any(SourceVisitor)
    }
}

impl RecipeSections {
    fn apply(self, data: &mut PackageData) {
        if let Some(package) = self.package {
            data.name = package.name;
            data.version = package.version;
        }
        if let Some(SourceSection(source)) = self.source {
            data.download_url = source.url;
            data.sha256 = source.sha256;
        }
        if let Some(about) = self.about {
            data.homepage_url = about.home;
            data.extracted_license_statement = about.license;
            data.description = about.summary;
            data.vcs_url = about.dev_url;
        }
    }
}

/// Parse already resolved recipe text.
pub fn parse_str(text: &str) -> Result<Option<PackageData>> {
    let document: YamlValue = serde_yaml::from_str(text).map_err(ScanError::from)?;
    if !document.is_mapping() {
        debug!("Recipe document is not a mapping");
        return Ok(None);
    }

    let mut data = PackageData::new(DatasourceId::CondaMetaYaml);
    match serde_yaml::from_str::<RecipeSections>(text) {
        Ok(sections) => sections.apply(&mut data),
        Err(e) => {
            debug!("Recipe sections have an unexpected shape ({}), reading leniently", e);
            apply_lenient(&document, &mut data);
        }
    }

    if let Some(requirements) = document.get("requirements").and_then(YamlValue::as_mapping) {
        for (scope, reqs) in requirements {
            let Some(scope) = yaml_key_to_string(scope) else {
                continue;
            };
            let Some(reqs) = reqs.as_sequence() else {
                continue;
            };
            for req in reqs.iter().filter_map(YamlValue::as_str) {
                add_requirement(&mut data, &scope, req);
            }
        }
    }

    Ok(Some(data))
}

/// Read the fixed sections from the YAML tree, skipping any field of the wrong type.
fn apply_lenient(document: &YamlValue, data: &mut PackageData) {
    if let Some(package) = document.get("package") {
        data.name = yaml_get_str(package, "name");
        data.version = yaml_get_str(package, "version");
    }

    if let Some(source) = document.get("source") {
        let source = source.as_sequence().and_then(|s| s.first()).unwrap_or(source);
        data.download_url = yaml_get_str(source, "url");
        data.sha256 = yaml_get_str(source, "sha256");
    }

    if let Some(about) = document.get("about") {
        data.homepage_url = yaml_get_str(about, "home");
        data.extracted_license_statement = yaml_get_str(about, "license");
        data.description = yaml_get_str(about, "summary");
        data.vcs_url = yaml_get_str(about, "dev_url");
    }
}

/// Turn one match spec of `scope` into a dependency or an `extra_data` entry.
fn add_requirement(data: &mut PackageData, scope: &str, req: &str) {
    let req_trimmed = req.trim();
    let (token, constraint) = match req_trimmed.split_once(char::is_whitespace) {
        Some((token, constraint)) => (token, constraint.trim()),
        None => (req_trimmed, ""),
    };
    if token.is_empty() {
        return;
    }

    let mut requirement = constraint.to_string();
    let mut version = constraint.strip_prefix("==").map(str::trim).filter(|v| !v.is_empty());
    let mut is_pinned = version.is_some();

    let (namespace, name) = split_namespace(token);
    let (name, inline_version) = split_inline_pin(name);
    if let Some(inline_version) = inline_version {
        version = Some(inline_version);
        is_pinned = true;
        requirement = format!("={inline_version}");
    }

    if is_excluded_name(name) {
        let entry = data
            .extra_data
            .entry(scope.to_string())
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        if let JsonValue::Array(items) = entry {
            items.push(JsonValue::String(req.to_string()));
        }
        return;
    }

    let purl = match PackageUrl::new(CONDA_TYPE, name) {
        Ok(purl) => purl.with_namespace(namespace).with_version(version),
        Err(e) => {
            debug!("Skipping requirement '{}' in scope '{}': {}", req, scope, e);
            return;
        }
    };

    let is_runtime = scope.contains("run");
    data.dependencies.push(DependentPackage {
        purl: purl.to_string(),
        extracted_requirement: Some(requirement),
        scope: scope.to_string(),
        is_runtime,
        is_optional: !is_runtime,
        is_pinned,
        is_direct: true,
    });
}
