//! Conda installation layouts and sample manifests for tests.

use anyhow::{Context, Result};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A recipe with templating, a URL source and build/run requirements.
pub const ABEONA_META_YAML: &str = r#"{% set name = "abeona" %}
{% set version = "0.45.0" %}

package:
  name: {{ name|lower }}
  version: {{ version }}

source:
  url: https://pypi.io/packages/source/a/{{ name }}/{{ name }}-{{ version }}.tar.gz
  sha256: bf7a6ed4d0a1c6cb1d3c0e1e7a6f9b2b0c7e2f1b4c6a9d8e7f6a5b4c3d2e1f0a

build:
  number: 0
  noarch: python

requirements:
  build:
    - python
    - pip
  run:
    - python >=3.6
    - cortexpy =0.45.7
    - mccortex ==1.0
    - nextflow ==19.01.0
    - pandas
    - progressbar2

about:
  home: https://github.com/winni2k/abeona
  license: Apache Software
  summary: A simple transcriptome assembler based on kallisto and Cortex graphs.
"#;

/// The recipe shipped inside an installed `requests-kerberos` package.
pub const REQUESTS_KERBEROS_META_YAML: &str = r#"{% set name = "requests-kerberos" %}
{% set version = "0.14.0" %}

package:
  name: {{ name|lower }}
  version: {{ version }}

source:
  url: https://pypi.io/packages/source/r/requests-kerberos/requests-kerberos-{{ version }}.tar.gz
  sha256: cda9d1240ae5392e081869881c8742d0e171fd6a893a7ac0875db2748e966fd1

build:
  number: 0
  noarch: python
  script: {{ PYTHON }} -m pip install . -vv

requirements:
  host:
    - python >=3.6
    - pip
  run:
    - python >=3.6
    - requests >=1.1.0
    - cryptography >=1.3
    - pyspnego

about:
  home: https://github.com/requests/requests-kerberos
  license: ISC
  license_file: LICENSE
  summary: An authentication handler for using Kerberos with Python Requests.
"#;

/// An environment file mixing conda specs, a channel prefix and pip lines.
pub const ENVIRONMENT_YML: &str = r#"name: ds-project
channels:
  - conda-forge
  - defaults
dependencies:
  - python=3.10
  - pip
  - conda-forge::numpy=1.26.4=py310hb13e2d6_0
  - https://repo.anaconda.com/pkgs/main::openssl
  - pip:
      - requests[security]==2.32.3
      - flask>=2.0
      - --index-url https://example.org/simple
"#;

/// One package installed into a Conda prefix.
///
/// [`CondaTreeFixture::install`] writes its `conda-meta/<dir>.json` record
/// and optionally the extracted package directory, its recipe, the `.conda`
/// archive and the files it installed into the prefix.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub build: String,
    pub license: Option<String>,
    /// Files installed into the prefix, relative to it
    pub files: Vec<String>,
    /// Content of `pkgs/<dir>/info/recipe/meta.yaml`
    pub recipe: Option<String>,
    /// Write `pkgs/<dir>.conda` next to the extracted directory
    pub archive: bool,
}

impl InstalledPackage {
    pub fn new(name: &str, version: &str, build: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            build: build.to_string(),
            license: None,
            files: Vec::new(),
            recipe: None,
            archive: false,
        }
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = Some(license.to_string());
        self
    }

    pub fn with_files(mut self, files: &[&str]) -> Self {
        self.files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_recipe(mut self, recipe: &str) -> Self {
        self.recipe = Some(recipe.to_string());
        self
    }

    pub fn with_archive(mut self) -> Self {
        self.archive = true;
        self
    }

    /// `<name>-<version>-<build>`, the directory and record name.
    pub fn dist_name(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.build)
    }

    /// The `conda-meta` JSON record for an installation at `/<prefix>`.
    pub fn meta_json(&self, prefix: &str) -> String {
        let dist = self.dist_name();
        let record = json!({
            "build": self.build,
            "build_number": 0,
            "channel": "https://repo.anaconda.com/pkgs/main/linux-64",
            "depends": [],
            "extracted_package_dir": format!("/{prefix}/pkgs/{dist}"),
            "files": self.files,
            "fn": format!("{dist}.conda"),
            "license": self.license,
            "md5": "0123456789abcdef0123456789abcdef",
            "name": self.name,
            "package_tarball_full_path": format!("/{prefix}/pkgs/{dist}.conda"),
            "requested_spec": self.name,
            "size": 1024,
            "subdir": "linux-64",
            "url": format!("https://repo.anaconda.com/pkgs/main/linux-64/{dist}.conda"),
            "version": self.version,
        });
        serde_json::to_string_pretty(&record).unwrap_or_default()
    }
}

/// A temporary directory holding a scan root, e.g. `<tmp>/rootfs`.
pub struct CondaTreeFixture {
    _temp: TempDir,
    root: PathBuf,
}

impl CondaTreeFixture {
    /// Create an empty scan root named `root_name`.
    pub fn new(root_name: &str) -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temp directory")?;
        let root = temp.path().join(root_name);
        fs::create_dir_all(&root).with_context(|| format!("Failed to create {}", root.display()))?;
        Ok(Self {
            _temp: temp,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` at `relative_path` under the root, creating parents.
    pub fn write(&self, relative_path: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Install `package` into the prefix at `prefix` (relative to the root,
    /// e.g. `opt/conda`). The record's `extracted_package_dir` is
    /// `/<prefix>/pkgs/<dist>`, as if the root were mounted at `/`.
    pub fn install(&self, prefix: &str, package: &InstalledPackage) -> Result<()> {
        let prefix = prefix.trim_matches('/');
        let dist = package.dist_name();

        self.write(&format!("{prefix}/conda-meta/{dist}.json"), &package.meta_json(prefix))?;

        for file in &package.files {
            self.write(&format!("{prefix}/{file}"), "")?;
            self.write(&format!("{prefix}/pkgs/{dist}/{file}"), "")?;
        }
        if let Some(recipe) = &package.recipe {
            self.write(&format!("{prefix}/pkgs/{dist}/info/recipe/meta.yaml"), recipe)?;
        }
        if package.archive {
            self.write(&format!("{prefix}/pkgs/{dist}.conda"), "")?;
        }
        Ok(())
    }
}
