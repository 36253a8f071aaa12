//! Generic TOML configuration loading.
//!
//! [`parse_config`] reads any `DeserializeOwned` type from a TOML file and
//! attaches the file path to every failure:
//!
//! ```text
//! Failed to parse config file: /path/to/conda-inspect.toml
//! Caused by:
//!     TOML parse error at line 1, column 10
//! ```
//!
//! The underlying [`ScanError::TomlError`] stays reachable through
//! [`anyhow::Error::downcast_ref`].

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::{FileOps, ScanError};

/// Parse a TOML configuration file into `T`.
///
/// # Examples
///
/// ```rust,no_run
/// use conda_inspect::config::parse_config;
/// use serde::Deserialize;
/// use std::path::Path;
///
/// #[derive(Deserialize)]
/// struct Config {
///     ignore: Vec<String>,
/// }
///
/// # fn example() -> anyhow::Result<()> {
/// let config: Config = parse_config(Path::new("conda-inspect.toml"))?;
/// println!("{} ignore patterns", config.ignore.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails when the file cannot be read, is not valid TOML, or does not match
/// the shape of `T`.
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = FileOps::read_with_context(path, "loading configuration", "config")
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content)
        .map_err(ScanError::from)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}
