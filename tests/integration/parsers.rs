//! Manifest parsers on files written to disk.

use anyhow::Result;
use conda_inspect::ManifestKind;
use conda_inspect::models::DatasourceId;
use conda_inspect::test_utils::fixtures::{ABEONA_META_YAML, ENVIRONMENT_YML};
use conda_inspect::test_utils::{CondaTreeFixture, InstalledPackage};
use serde_json::json;

#[test]
fn test_recipe_file() -> Result<()> {
    let tree = CondaTreeFixture::new("recipes")?;
    let path = tree.write("abeona/meta.yaml", ABEONA_META_YAML)?;

    let records = ManifestKind::Recipe.parse(&path)?;
    assert_eq!(records.len(), 1);
    let data = &records[0];

    assert_eq!(data.datasource_id, DatasourceId::CondaMetaYaml);
    assert_eq!(data.purl().as_deref(), Some("pkg:conda/abeona@0.45.0"));
    assert_eq!(
        data.download_url.as_deref(),
        Some("https://pypi.io/packages/source/a/abeona/abeona-0.45.0.tar.gz")
    );
    assert_eq!(data.extracted_license_statement.as_deref(), Some("Apache Software"));
    assert_eq!(data.homepage_url.as_deref(), Some("https://github.com/winni2k/abeona"));

    let deps: Vec<_> =
        data.dependencies.iter().map(|d| (d.purl.as_str(), d.scope.as_str(), d.is_pinned)).collect();
    assert_eq!(
        deps,
        vec![
            ("pkg:conda/cortexpy", "run", false),
            ("pkg:conda/mccortex@1.0", "run", true),
            ("pkg:conda/nextflow@19.01.0", "run", true),
            ("pkg:conda/pandas", "run", false),
            ("pkg:conda/progressbar2", "run", false),
        ]
    );
    assert!(data.dependencies.iter().all(|d| d.is_runtime && !d.is_optional));

    // python and pip are kept only as raw strings
    assert_eq!(data.extra_data["build"], json!(["python", "pip"]));
    assert_eq!(data.extra_data["run"], json!(["python >=3.6"]));
    Ok(())
}

#[test]
fn test_environment_file() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    let path = tree.write("environment.yml", ENVIRONMENT_YML)?;

    let records = ManifestKind::Environment.parse(&path)?;
    assert_eq!(records.len(), 1);
    let data = &records[0];

    assert_eq!(data.datasource_id, DatasourceId::CondaYaml);
    assert_eq!(data.name.as_deref(), Some("ds-project"));
    assert!(data.is_private);
    assert_eq!(data.extra_data["channels"], json!(["conda-forge", "defaults"]));

    let purls: Vec<_> = data.dependencies.iter().map(|d| d.purl.as_str()).collect();
    assert_eq!(
        purls,
        vec![
            "pkg:conda/conda-forge/numpy@1.26.4",
            "pkg:pypi/openssl",
            "pkg:pypi/requests@2.32.3",
            "pkg:pypi/flask",
        ]
    );
    assert!(data.dependencies.iter().all(|d| d.scope == "dependencies" && d.is_runtime));
    assert!(!purls.iter().any(|p| p.contains("/pip") || p.contains("/python")));
    Ok(())
}

#[test]
fn test_metadata_json_file() -> Result<()> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let package = InstalledPackage::new("requests", "2.32.3", "py312h06a4308_0")
        .with_license("Apache-2.0")
        .with_files(&["lib/python3.12/site-packages/requests/__init__.py"]);
    tree.install("opt/conda", &package)?;

    let path = tree.root().join("opt/conda/conda-meta/requests-2.32.3-py312h06a4308_0.json");
    let records = ManifestKind::MetadataJson.parse(&path)?;
    assert_eq!(records.len(), 1);
    let data = &records[0];

    assert_eq!(data.purl().as_deref(), Some("pkg:conda/requests@2.32.3"));
    assert_eq!(data.extracted_license_statement.as_deref(), Some("Apache-2.0"));
    assert_eq!(data.size, Some(1024));
    assert_eq!(
        data.extra_data["extracted_package_dir"],
        json!("/opt/conda/pkgs/requests-2.32.3-py312h06a4308_0")
    );
    assert_eq!(data.extra_data["files"], json!(["lib/python3.12/site-packages/requests/__init__.py"]));
    assert_eq!(data.extra_data["requested_spec"], json!("requests"));
    Ok(())
}

#[test]
fn test_malformed_recipe_is_an_error() -> Result<()> {
    let tree = CondaTreeFixture::new("recipes")?;
    let path = tree.write("broken/meta.yaml", "package:\n  name: [unclosed\n")?;

    let err = ManifestKind::Recipe.parse(&path).unwrap_err();
    assert!(format!("{err:#}").contains("meta.yaml"));
    Ok(())
}

#[test]
fn test_empty_environment_yields_nothing() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    let path = tree.write("environment.yaml", "channels:\n  - defaults\n")?;
    assert!(ManifestKind::Environment.parse(&path)?.is_empty());
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    for kind in ManifestKind::ALL {
        assert!(kind.parse(&temp.path().join("absent.yaml")).is_err(), "{kind} on a missing file");
    }
}
