//! Whole-tree scans of realistic layouts.

use anyhow::Result;
use conda_inspect::models::DatasourceId;
use conda_inspect::test_utils::fixtures::{ENVIRONMENT_YML, REQUESTS_KERBEROS_META_YAML};
use conda_inspect::test_utils::{CondaTreeFixture, InstalledPackage, init_test_logging};
use conda_inspect::{ManifestKind, ScanConfig, Scanner};

const REQUESTS_RECIPE: &str = r#"{% set name = "requests" %}
{% set version = "2.32.3" %}

package:
  name: {{ name|lower }}
  version: {{ version }}

source:
  url: https://pypi.io/packages/source/r/requests/requests-{{ version }}.tar.gz
  sha256: 55365417734eb18255590a9ff9eb97e9e1da868d4ccd6402399eaf68af20a760

build:
  number: 1
  script: {{ PYTHON }} -m pip install . --no-deps -vv

requirements:
  host:
    - python
    - pip
    - setuptools
    - wheel
  run:
    - python
    - certifi >=2017.4.17
    - charset-normalizer >=2,<4
    - idna >=2.5,<4
    - urllib3 >=1.21.1,<3

about:
  home: https://requests.readthedocs.io/
  license: Apache-2.0
  summary: Requests is an elegant and simple HTTP library for Python, built for human beings.
  dev_url: https://github.com/psf/requests
"#;

const REQUESTS_DIR: &str = "rootfs/opt/conda/pkgs/requests-2.32.3-py312h06a4308_1";

fn requests_rootfs() -> Result<CondaTreeFixture> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let requests = InstalledPackage::new("requests", "2.32.3", "py312h06a4308_1")
        .with_license("Apache-2.0")
        .with_files(&[
            "lib/python3.12/site-packages/requests/__init__.py",
            "lib/python3.12/site-packages/requests/api.py",
            "lib/python3.12/site-packages/requests-2.32.3.dist-info/METADATA",
        ])
        .with_recipe(REQUESTS_RECIPE)
        .with_archive();
    tree.install("opt/conda", &requests)?;

    let zlib = InstalledPackage::new("zlib", "1.2.13", "h5eee18b_1")
        .with_license("Zlib")
        .with_files(&["lib/libz.so.1.2.13"]);
    tree.install("opt/conda", &zlib)?;

    tree.write("opt/conda/conda-meta/history", "==> 2024-06-01 <==\n")?;
    tree.write("etc/os-release", "ID=debian\n")?;
    Ok(tree)
}

#[test]
fn test_requests_rootfs() -> Result<()> {
    init_test_logging(None);
    let tree = requests_rootfs()?;

    let result = Scanner::default().scan(tree.root())?;
    assert!(result.errors.is_empty());

    let purls: Vec<_> = result.packages.iter().map(|p| p.purl.as_str()).collect();
    assert_eq!(purls, vec!["pkg:conda/requests@2.32.3", "pkg:conda/zlib@1.2.13"]);

    let requests = &result.packages[0];
    assert_eq!(
        requests.datafile_paths,
        vec![
            "rootfs/opt/conda/conda-meta/requests-2.32.3-py312h06a4308_1.json".to_string(),
            format!("{REQUESTS_DIR}/info/recipe/meta.yaml"),
        ]
    );
    assert_eq!(requests.vcs_url.as_deref(), Some("https://github.com/psf/requests"));
    assert_eq!(
        requests.sha256.as_deref(),
        Some("55365417734eb18255590a9ff9eb97e9e1da868d4ccd6402399eaf68af20a760")
    );

    let owned = result.ownership.resources_of(&requests.package_uid);
    for path in [
        REQUESTS_DIR,
        "rootfs/opt/conda/pkgs/requests-2.32.3-py312h06a4308_1.conda",
        "rootfs/opt/conda/lib/python3.12/site-packages/requests/__init__.py",
        "rootfs/opt/conda/lib/python3.12/site-packages/requests/api.py",
        "rootfs/opt/conda/lib/python3.12/site-packages/requests-2.32.3.dist-info/METADATA",
    ] {
        assert!(owned.contains(&path), "{path} should belong to requests");
    }
    assert!(!owned.iter().any(|p| p.contains("libz")));
    assert_eq!(result.ownership.owner_of("rootfs/etc/os-release"), None);
    assert_eq!(result.ownership.owner_of("rootfs/opt/conda/conda-meta/history"), None);

    let zlib = &result.packages[1];
    assert_eq!(
        result.ownership.owner_of("rootfs/opt/conda/lib/libz.so.1.2.13"),
        Some(zlib.package_uid.as_str())
    );

    let runtime: Vec<_> = result
        .dependencies
        .iter()
        .filter(|d| d.is_runtime)
        .map(|d| (d.purl.as_str(), d.extracted_requirement.as_deref()))
        .collect();
    assert_eq!(
        runtime,
        vec![
            ("pkg:conda/certifi", Some(">=2017.4.17")),
            ("pkg:conda/charset-normalizer", Some(">=2,<4")),
            ("pkg:conda/idna", Some(">=2.5,<4")),
            ("pkg:conda/urllib3", Some(">=1.21.1,<3")),
        ]
    );
    let host: Vec<_> =
        result.dependencies.iter().filter(|d| d.scope == "host").map(|d| d.purl.as_str()).collect();
    assert_eq!(host, vec!["pkg:conda/setuptools", "pkg:conda/wheel"]);
    assert!(result.dependencies.iter().all(|d| d.for_package_uid.as_deref() == Some(requests.package_uid.as_str())));
    Ok(())
}

#[test]
fn test_recipe_tar_extract_root() -> Result<()> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let dir = "opt/conda/pkgs/requests-kerberos-0.14.0-pyhd8ed1ab_0";
    tree.write(&format!("{dir}/info/recipe.tar-extract/recipe/meta.yaml"), REQUESTS_KERBEROS_META_YAML)?;
    tree.write(&format!("{dir}/info/index.json"), "{}")?;
    tree.write(&format!("{dir}/site-packages/requests_kerberos/__init__.py"), "")?;
    tree.write("opt/conda/pkgs/other-1.0-0/info/about.json", "{}")?;

    let result = Scanner::default().scan(tree.root())?;
    assert_eq!(result.packages.len(), 1);
    let package = &result.packages[0];
    assert_eq!(package.purl, "pkg:conda/requests-kerberos@0.14.0");
    assert_eq!(package.datasource_ids, vec![DatasourceId::CondaMetaYaml]);
    assert_eq!(package.extracted_license_statement.as_deref(), Some("ISC"));

    assert_eq!(
        package.download_url.as_deref(),
        Some("https://pypi.io/packages/source/r/requests-kerberos/requests-kerberos-0.14.0.tar.gz")
    );

    let uid = package.package_uid.as_str();
    let root = format!("rootfs/{dir}");
    assert_eq!(result.ownership.owner_of(&root), Some(uid));
    assert_eq!(result.ownership.owner_of(&format!("{root}/info/index.json")), Some(uid));
    assert_eq!(
        result.ownership.owner_of(&format!("{root}/site-packages/requests_kerberos/__init__.py")),
        Some(uid)
    );
    assert_eq!(result.ownership.owner_of("rootfs/opt/conda/pkgs/other-1.0-0/info/about.json"), None);

    let run: Vec<_> =
        result.dependencies.iter().filter(|d| d.scope == "run").map(|d| d.purl.as_str()).collect();
    assert_eq!(run, vec!["pkg:conda/requests", "pkg:conda/cryptography", "pkg:conda/pyspnego"]);
    Ok(())
}

#[test]
fn test_installed_package_with_tar_extract_recipe() -> Result<()> {
    init_test_logging(None);
    let tree = CondaTreeFixture::new("rootfs")?;
    let kerberos = InstalledPackage::new("requests-kerberos", "0.14.0", "pyhd8ed1ab_0")
        .with_license("ISC")
        .with_files(&["lib/python3.12/site-packages/requests_kerberos/__init__.py"]);
    tree.install("opt/conda", &kerberos)?;
    let dir = "opt/conda/pkgs/requests-kerberos-0.14.0-pyhd8ed1ab_0";
    let recipe = format!("{dir}/info/recipe.tar-extract/recipe/meta.yaml");
    tree.write(&recipe, REQUESTS_KERBEROS_META_YAML)?;

    let result = Scanner::default().scan(tree.root())?;
    assert!(result.errors.is_empty());
    assert_eq!(result.packages.len(), 1);

    let package = &result.packages[0];
    assert_eq!(package.purl, "pkg:conda/requests-kerberos@0.14.0");
    assert_eq!(package.datasource_ids, vec![DatasourceId::CondaMetaJson, DatasourceId::CondaMetaYaml]);
    assert_eq!(
        package.datafile_paths,
        vec![
            "rootfs/opt/conda/conda-meta/requests-kerberos-0.14.0-pyhd8ed1ab_0.json".to_string(),
            format!("rootfs/{recipe}"),
        ]
    );
    assert_eq!(
        package.sha256.as_deref(),
        Some("cda9d1240ae5392e081869881c8742d0e171fd6a893a7ac0875db2748e966fd1")
    );

    let uid = package.package_uid.as_str();
    assert_eq!(result.ownership.owner_of(&format!("rootfs/{recipe}")), Some(uid));
    assert_eq!(
        result.ownership.owner_of("rootfs/opt/conda/lib/python3.12/site-packages/requests_kerberos/__init__.py"),
        Some(uid)
    );

    let run: Vec<_> =
        result.dependencies.iter().filter(|d| d.scope == "run").map(|d| d.purl.as_str()).collect();
    assert_eq!(run, vec!["pkg:conda/requests", "pkg:conda/cryptography", "pkg:conda/pyspnego"]);
    assert!(result.dependencies.iter().all(|d| d.for_package_uid.as_deref() == Some(uid)));
    Ok(())
}

#[test]
fn test_environment_project() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    tree.write("environment.yml", ENVIRONMENT_YML)?;
    tree.write(
        "ci/conda-env.yaml",
        "dependencies:\n  - conda-forge::scikit-learn=1.2\n  - pip:\n    - flask==2.0.1\n",
    )?;
    tree.write("docs/settings.yaml", "theme: dark\n")?;

    let result = Scanner::default().scan(tree.root())?;
    assert!(result.errors.is_empty());

    // Only the named environment becomes a package
    assert_eq!(result.packages.len(), 1);
    let package = &result.packages[0];
    assert_eq!(package.purl, "pkg:conda/ds-project");
    assert!(package.is_private);
    assert_eq!(result.ownership.owner_of("project/environment.yml"), Some(package.package_uid.as_str()));

    let unnamed: Vec<_> = result
        .dependencies
        .iter()
        .filter(|d| d.datafile_path == "project/ci/conda-env.yaml")
        .collect();
    let purls: Vec<_> = unnamed.iter().map(|d| d.purl.as_str()).collect();
    assert_eq!(purls, vec!["pkg:conda/conda-forge/scikit-learn@1.2", "pkg:pypi/flask@2.0.1"]);
    assert!(unnamed.iter().all(|d| d.is_pinned && d.for_package_uid.is_none()));
    assert_eq!(result.ownership.owner_of("project/ci/conda-env.yaml"), None);
    Ok(())
}

#[test]
fn test_single_file_scan() -> Result<()> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let zlib = InstalledPackage::new("zlib", "1.2.13", "h5eee18b_1").with_files(&["lib/libz.so"]);
    tree.install("opt/conda", &zlib)?;

    let json = tree.root().join("opt/conda/conda-meta/zlib-1.2.13-h5eee18b_1.json");
    let result = Scanner::default().scan(&json)?;
    assert_eq!(result.packages.len(), 1);
    assert_eq!(result.packages[0].purl, "pkg:conda/zlib@1.2.13");
    assert_eq!(result.ownership.len(), 1);
    assert_eq!(
        result.ownership.owner_of("zlib-1.2.13-h5eee18b_1.json"),
        Some(result.packages[0].package_uid.as_str())
    );
    Ok(())
}

#[test]
fn test_ignored_subtree_is_not_scanned() -> Result<()> {
    let tree = requests_rootfs()?;
    let config = ScanConfig {
        ignore: vec!["rootfs/opt/conda/pkgs".to_string(), "rootfs/opt/conda/pkgs/**".to_string()],
        ..ScanConfig::default()
    };

    let result = Scanner::new(config).scan(tree.root())?;
    assert_eq!(result.packages.len(), 2);

    let requests = &result.packages[0];
    assert_eq!(requests.datafile_paths.len(), 1);
    assert!(result.ownership.iter().all(|(path, _)| !path.contains("/pkgs/")));
    assert!(result.dependencies.is_empty());
    Ok(())
}

#[test]
fn test_parse_errors_do_not_stop_the_scan() -> Result<()> {
    let tree = requests_rootfs()?;
    tree.write("opt/conda/conda-meta/broken-0.1-0.json", "[1, 2")?;
    tree.write("opt/conda/conda-meta/list-0.1-0.json", "[1, 2]")?;

    let result = Scanner::default().scan(tree.root())?;
    assert_eq!(result.packages.len(), 2);

    let failed: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        failed,
        vec!["rootfs/opt/conda/conda-meta/broken-0.1-0.json", "rootfs/opt/conda/conda-meta/list-0.1-0.json"]
    );
    assert!(result.errors.iter().all(|e| e.kind == ManifestKind::MetadataJson));
    Ok(())
}

#[test]
fn test_result_serializes() -> Result<()> {
    let tree = requests_rootfs()?;
    let result = Scanner::default().scan(tree.root())?;

    let json = serde_json::to_value(&result)?;
    assert_eq!(json["packages"][0]["type"], "conda");
    assert_eq!(json["packages"][0]["datasource_ids"][1], "conda_meta_yaml");
    assert_eq!(
        json["ownership"]["rootfs/opt/conda/lib/libz.so.1.2.13"],
        serde_json::Value::String(result.packages[1].package_uid.clone())
    );
    assert!(json["errors"].as_array().is_some_and(Vec::is_empty));
    Ok(())
}
