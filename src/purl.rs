//! Package URL formatting.
//!
//! A package URL (purl) names a package across ecosystems:
//! `pkg:<type>/<namespace>/<name>@<version>`. Only formatting is
//! needed here; every identifier this crate emits is built from already-parsed
//! components.
//!
//! Components are percent-encoded, the type is lowercased, and `pypi` names are
//! normalized the way the Python packaging ecosystem compares them (lowercase,
//! `_` replaced by `-`).
//!
//! ```rust
//! use conda_inspect::purl::PackageUrl;
//!
//! let purl = PackageUrl::new("conda", "numpy")
//!     .unwrap()
//!     .with_namespace(Some("conda-forge"))
//!     .with_version(Some("1.26.4"));
//! assert_eq!(purl.to_string(), "pkg:conda/conda-forge/numpy@1.26.4");
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::fmt;

use crate::core::ScanError;

/// Characters left as-is in purl components (RFC 3986 unreserved set).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

/// A package URL under construction or ready to format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUrl {
    ty: String,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
}

impl PackageUrl {
    /// Create a purl for `name` in the ecosystem `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ManifestParseError`] when the type or name is empty,
    /// since such an identifier cannot name anything.
    pub fn new(ty: &str, name: &str) -> Result<Self, ScanError> {
        let ty = ty.trim().to_ascii_lowercase();
        let name = name.trim();
        if ty.is_empty() || name.is_empty() {
            return Err(ScanError::manifest_parse(
                format!("pkg:{ty}/{name}"),
                "package URL requires a type and a name",
            ));
        }

        let name = if ty == "pypi" {
            name.to_lowercase().replace('_', "-")
        } else {
            name.to_string()
        };

        Ok(Self {
            ty,
            namespace: None,
            name,
            version: None,
        })
    }

    /// Set the namespace; empty values are ignored.
    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<&str>) -> Self {
        self.namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty()).map(String::from);
        self
    }

    /// Set the version; empty values are ignored.
    #[must_use]
    pub fn with_version(mut self, version: Option<&str>) -> Self {
        self.version = version.map(str::trim).filter(|v| !v.is_empty()).map(String::from);
        self
    }

    /// The package type (`conda`, `pypi`, ...).
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// The (normalized) package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The version, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for PackageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/", self.ty)?;

        if let Some(namespace) = &self.namespace {
            for segment in namespace.split('/').filter(|s| !s.is_empty()) {
                write!(f, "{}/", utf8_percent_encode(segment, COMPONENT))?;
            }
        }

        write!(f, "{}", utf8_percent_encode(&self.name, COMPONENT))?;

        if let Some(version) = &self.version {
            write!(f, "@{}", utf8_percent_encode(version, COMPONENT))?;
        }

        Ok(())
    }
}
