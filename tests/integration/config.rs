//! Scan configuration files.

use anyhow::Result;
use conda_inspect::test_utils::CondaTreeFixture;
use conda_inspect::test_utils::fixtures::ENVIRONMENT_YML;
use conda_inspect::{ScanConfig, Scanner};

#[test]
fn test_config_file_drives_the_scan() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    tree.write("environment.yml", ENVIRONMENT_YML)?;
    tree.write("vendor/env/meta.yaml", "package:\n  name: vendored\n  version: \"1.0\"\n")?;
    tree.write("recipe/meta.yaml", "package:\n  name: tool\n  version: \"0.3\"\n")?;

    let config_path = tree.write(
        "conda-inspect.toml",
        "ignore = [\"**/vendor\", \"**/vendor/**\"]\nenvironment_files = false\n",
    )?;
    let config = ScanConfig::load(&config_path)?;
    assert!(!config.environment_files);

    let result = Scanner::new(config).scan(tree.root())?;
    let purls: Vec<_> = result.packages.iter().map(|p| p.purl.as_str()).collect();
    assert_eq!(purls, vec!["pkg:conda/tool@0.3"]);
    Ok(())
}

#[test]
fn test_invalid_config_reports_file() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    let path = tree.write("conda-inspect.toml", "follow_links = \"sometimes\"\n")?;

    let err = ScanConfig::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("conda-inspect.toml"));
    Ok(())
}

#[test]
fn test_invalid_ignore_pattern_fails_the_scan() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    let config = ScanConfig {
        ignore: vec!["[broken".to_string()],
        ..ScanConfig::default()
    };
    assert!(Scanner::new(config).scan(tree.root()).is_err());
    Ok(())
}
