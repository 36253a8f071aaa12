//! `conda-meta/*.json` parsing.
//!
//! The package manager writes one JSON record per installed package into the
//! environment's `conda-meta/` directory, named `<name>-<version>-<build>.json`.
//! Besides identity and download details it records where the package was
//! extracted and which files it installed; those are kept in `extra_data` so
//! the assembly engine can assign file ownership.

use anyhow::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::core::{FileOps, ScanError};
use crate::models::{DatasourceId, PackageData};

/// Keys copied verbatim into `extra_data`, `null` when absent.
pub const EXTRA_DATA_FIELDS: [&str; 5] = [
    "requested_spec",
    "channel",
    "extracted_package_dir",
    "files",
    "package_tarball_full_path",
];

/// Parse a metadata JSON file.
pub fn parse(path: &Path) -> Result<PackageData> {
    let content = FileOps::read_with_context(path, "parsing conda metadata", "manifest")?;
    let value: JsonValue = serde_json::from_str(&content)
        .map_err(ScanError::from)
        .with_context(|| format!("Failed to parse conda metadata JSON: {}", path.display()))?;

    let JsonValue::Object(object) = value else {
        return Err(ScanError::manifest_parse(
            path.display().to_string(),
            "top-level value is not a JSON object",
        )
        .into());
    };

    Ok(from_object(&object))
}

/// Build the record from an already decoded JSON object.
pub fn from_object(object: &Map<String, JsonValue>) -> PackageData {
    let mut data = PackageData::new(DatasourceId::CondaMetaJson);
    data.name = get_string(object, "name");
    data.version = get_string(object, "version");
    data.extracted_license_statement = get_string(object, "license");
    data.download_url = get_string(object, "url");
    data.size = object.get("size").and_then(JsonValue::as_u64);
    data.md5 = get_string(object, "md5");
    data.sha256 = get_string(object, "sha256");
    data.primary_language = Some("Python".to_string());

    for field in EXTRA_DATA_FIELDS {
        let value = object.get(field).cloned().unwrap_or(JsonValue::Null);
        data.extra_data.insert(field.to_string(), value);
    }

    data
}

fn get_string(object: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match object.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
