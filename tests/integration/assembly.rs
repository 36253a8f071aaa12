//! Sibling correlation and file ownership on trees written to disk.

use anyhow::Result;
use conda_inspect::assembly::{Assembler, AssemblyItem};
use conda_inspect::codebase::{Codebase, ResourceOwnership};
use conda_inspect::models::{DatasourceId, Package};
use conda_inspect::test_utils::{CondaTreeFixture, InstalledPackage, init_test_logging};
use conda_inspect::{ScanConfig, Scanner};

const JSON: &str = "rootfs/opt/conda/conda-meta/foo-1.0-abc.json";
const RECIPE: &str = "rootfs/opt/conda/pkgs/foo-1.0-abc/info/recipe/meta.yaml";

const FOO_RECIPE: &str = r#"{% set version = "1.0" %}
package:
  name: foo
  version: {{ version }}
requirements:
  run:
    - python >=3.8
    - zlib >=1.2
about:
  home: https://example.org/foo
  license: MIT License
  summary: The foo library.
"#;

fn foo_tree() -> Result<CondaTreeFixture> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let package = InstalledPackage::new("foo", "1.0", "abc")
        .with_license("MIT")
        .with_files(&["lib/libfoo.so", "bin/foo"])
        .with_recipe(FOO_RECIPE)
        .with_archive();
    tree.install("opt/conda", &package)?;
    tree.write("opt/conda/lib/libunrelated.so", "")?;
    Ok(tree)
}

/// Walk and parse a fixture tree without assembling it.
fn parsed_codebase(tree: &CondaTreeFixture) -> Result<Codebase> {
    let scanner = Scanner::new(ScanConfig::default());
    let mut codebase = Codebase::from_dir(tree.root(), &scanner.config().walk_options()?)?;
    let errors = scanner.parse_manifests(&mut codebase);
    assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
    Ok(codebase)
}

fn packages(items: &[AssemblyItem]) -> Vec<&Package> {
    items
        .iter()
        .filter_map(|item| match item {
            AssemblyItem::Package(package) => Some(package),
            _ => None,
        })
        .collect()
}

fn assemble_from(
    codebase: &Codebase,
    ownership: &mut ResourceOwnership,
    path: &str,
) -> Vec<AssemblyItem> {
    let resource = codebase.get_resource(path).expect("resource in codebase");
    Assembler::new(codebase, ownership).assemble(&resource.package_data[0], resource)
}

#[test]
fn test_installed_package_from_scan() -> Result<()> {
    init_test_logging(None);
    let tree = foo_tree()?;

    let result = Scanner::default().scan(tree.root())?;
    assert_eq!(result.packages.len(), 1);
    assert!(result.errors.is_empty());

    let package = &result.packages[0];
    assert_eq!(package.purl, "pkg:conda/foo@1.0");
    assert_eq!(package.datafile_paths, vec![JSON, RECIPE]);
    assert_eq!(package.datasource_ids, vec![DatasourceId::CondaMetaJson, DatasourceId::CondaMetaYaml]);

    let uid = package.package_uid.as_str();
    for path in [
        JSON,
        RECIPE,
        "rootfs/opt/conda/pkgs/foo-1.0-abc",
        "rootfs/opt/conda/pkgs/foo-1.0-abc.conda",
        "rootfs/opt/conda/lib/libfoo.so",
        "rootfs/opt/conda/bin/foo",
    ] {
        assert_eq!(result.ownership.owner_of(path), Some(uid), "{path} should be owned");
    }
    assert_eq!(result.ownership.owner_of("rootfs/opt/conda/lib/libunrelated.so"), None);
    assert_eq!(result.ownership.owner_of("rootfs/opt/conda/lib"), None);

    let deps: Vec<_> = result.dependencies.iter().map(|d| d.purl.as_str()).collect();
    assert_eq!(deps, vec!["pkg:conda/zlib"]);
    assert_eq!(result.dependencies[0].for_package_uid.as_deref(), Some(uid));
    assert_eq!(result.dependencies[0].datafile_path, RECIPE);
    Ok(())
}

#[test]
fn test_anchor_precedence_from_either_start() -> Result<()> {
    let tree = foo_tree()?;
    let codebase = parsed_codebase(&tree)?;

    for start in [JSON, RECIPE] {
        let mut ownership = ResourceOwnership::new();
        let items = assemble_from(&codebase, &mut ownership, start);

        let found = packages(&items);
        assert_eq!(found.len(), 1, "starting from {start}");
        let package = found[0];
        assert_eq!(package.purl, "pkg:conda/foo@1.0");
        assert_eq!(package.datafile_paths, vec![JSON, RECIPE], "starting from {start}");

        // The recipe's descriptive fields win over the metadata JSON
        assert_eq!(package.extracted_license_statement.as_deref(), Some("MIT License"));
        assert_eq!(package.homepage_url.as_deref(), Some("https://example.org/foo"));
        assert_eq!(package.description.as_deref(), Some("The foo library."));

        let consumed: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                AssemblyItem::Resource(path) => Some(path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(consumed, vec![RECIPE, JSON]);
        assert_eq!(ownership.owner_of(JSON), Some(package.package_uid.as_str()));
    }
    Ok(())
}

#[test]
fn test_ownership_is_not_changed_by_reassembly() -> Result<()> {
    let tree = foo_tree()?;
    let codebase = parsed_codebase(&tree)?;

    let mut ownership = ResourceOwnership::new();
    let first = assemble_from(&codebase, &mut ownership, JSON);
    let snapshot = ownership.clone();

    let second = assemble_from(&codebase, &mut ownership, JSON);
    assert_eq!(ownership, snapshot);

    let first_uid = packages(&first)[0].package_uid.clone();
    let second_uid = packages(&second)[0].package_uid.clone();
    assert_ne!(first_uid, second_uid);
    assert!(ownership.resources_of(&second_uid).is_empty());
    Ok(())
}

#[test]
fn test_lone_recipe_owns_its_repository() -> Result<()> {
    let tree = CondaTreeFixture::new("project")?;
    tree.write(
        "conda.recipe/meta.yaml",
        "package:\n  name: tool\n  version: 2.1\nrequirements:\n  run:\n    - numpy >=1.15\n    - python >=3.6\n",
    )?;
    tree.write("src/tool/__init__.py", "")?;
    tree.write("setup.py", "")?;

    let result = Scanner::default().scan(tree.root())?;
    assert_eq!(result.packages.len(), 1);
    let package = &result.packages[0];
    assert_eq!(package.purl, "pkg:conda/tool@2.1");

    let dep = &result.dependencies[0];
    assert_eq!(result.dependencies.len(), 1);
    assert_eq!(dep.purl, "pkg:conda/numpy");
    assert!(dep.is_runtime && !dep.is_pinned);
    assert_eq!(dep.extracted_requirement.as_deref(), Some(">=1.15"));
    assert_eq!(package.extra_data["run"], serde_json::json!(["python >=3.6"]));

    // conda.recipe/meta.yaml describes the directory above the recipe
    let uid = package.package_uid.as_str();
    assert_eq!(result.ownership.owner_of("project"), Some(uid));
    assert_eq!(result.ownership.owner_of("project/src/tool/__init__.py"), Some(uid));
    assert_eq!(result.ownership.owner_of("project/setup.py"), Some(uid));
    Ok(())
}

#[test]
fn test_recipe_version_mismatch() -> Result<()> {
    let tree = CondaTreeFixture::new("rootfs")?;
    let package = InstalledPackage::new("foo", "1.0", "abc")
        .with_recipe("package:\n  name: foo\n  version: \"2.0\"\n");
    tree.install("opt/conda", &package)?;
    let codebase = parsed_codebase(&tree)?;

    // The metadata JSON finds its recipe by directory name alone
    let mut ownership = ResourceOwnership::new();
    let items = assemble_from(&codebase, &mut ownership, JSON);
    let found = packages(&items);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].purl, "pkg:conda/foo@1.0");
    assert_eq!(found[0].datafile_paths, vec![JSON, RECIPE]);

    // The recipe only finds a metadata JSON whose directory carries its own
    // name and version, so it stands alone
    let mut ownership = ResourceOwnership::new();
    let items = assemble_from(&codebase, &mut ownership, RECIPE);
    let found = packages(&items);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].purl, "pkg:conda/foo@2.0");
    assert_eq!(found[0].datafile_paths, vec![RECIPE]);
    assert_eq!(ownership.owner_of(JSON), None);
    assert_eq!(
        ownership.owner_of("rootfs/opt/conda/pkgs/foo-1.0-abc"),
        Some(found[0].package_uid.as_str())
    );
    Ok(())
}
