//! Requirement-line parsing.
//!
//! Two dialects show up in Conda manifests:
//!
//! - **Conda match specs** such as `numpy >=1.15`, `conda-forge::numpy=1.15.4`
//!   or `python`. These are handled by the small helpers at the bottom of this
//!   module, which only split out what the manifests need: namespace, name and
//!   an inline pinned version.
//! - **PEP 508 requirement lines** such as `flask==2.0.1` or
//!   `requests[security]>=2.8; python_version < "3.8"`, found in environment
//!   files and their nested `pip:` lists. [`parse_requirement_line`] returns
//!   `None` for anything that is not a valid PEP 508 line, which is how the
//!   environment parser tells the two dialects apart.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Names that denote the interpreter or the installer, never a dependency.
pub const EXCLUDED_NAMES: [&str; 2] = ["pip", "python"];

static NAME_AND_REST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[(?P<extras>[^\]]*)\])?\s*(?P<rest>.*)$",
    )
    .expect("requirement name pattern is a valid regex")
});

static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<op>~=|===|==|!=|<=|>=|<|>)\s*(?P<version>[A-Za-z0-9][A-Za-z0-9.*+!_-]*)$")
        .expect("specifier pattern is a valid regex")
});

/// One clause of a PEP 440 specifier set, e.g. `>=1.15`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub operator: String,
    pub version: String,
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A parsed PEP 508 requirement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    pub specifiers: Vec<Specifier>,
    /// Direct reference (`name @ https://...`)
    pub url: Option<String>,
    /// Environment marker after `;`, unevaluated
    pub marker: Option<String>,
}

impl Requirement {
    /// The specifier set as written, comma separated (`>=1.0,<2`).
    pub fn specs(&self) -> String {
        self.specifiers.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }

    /// The exact version when the set is a single `==` or `===` clause.
    pub fn pinned_version(&self) -> Option<&str> {
        match self.specifiers.as_slice() {
            [only] if (only.operator == "==" || only.operator == "===")
                && !only.version.contains('*') =>
            {
                Some(&only.version)
            }
            _ => None,
        }
    }
}

/// Parse one PEP 508 requirement line.
///
/// Comments and surrounding whitespace are ignored. Returns `None` for blank
/// lines, installer options (`-e`, `--index-url`), bare URLs and VCS
/// references, and anything that does not follow the grammar, including Conda
/// specs like `numpy=1.15` or `numpy 1.15`.
pub fn parse_requirement_line(line: &str) -> Option<Requirement> {
    let line = line.split_once(" #").map_or(line, |(before, _)| before).trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return None;
    }

    let caps = NAME_AND_REST.captures(line)?;
    let name = caps.name("name")?.as_str().to_string();
    let extras = caps
        .name("extras")
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let rest = caps.name("rest").map_or("", |m| m.as_str()).trim();

    if let Some(reference) = rest.strip_prefix('@') {
        let (url, marker) = split_marker(reference);
        let url = url.trim();
        if url.is_empty() || !url.contains("://") {
            return None;
        }
        return Some(Requirement {
            name,
            extras,
            specifiers: Vec::new(),
            url: Some(url.to_string()),
            marker,
        });
    }

    let (spec_part, marker) = split_marker(rest);
    let spec_part = spec_part.trim();
    let spec_part = spec_part
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(spec_part)
        .trim();

    let mut specifiers = Vec::new();
    if !spec_part.is_empty() {
        for clause in spec_part.split(',') {
            let caps = SPECIFIER.captures(clause.trim())?;
            specifiers.push(Specifier {
                operator: caps["op"].to_string(),
                version: caps["version"].to_string(),
            });
        }
    }

    Some(Requirement {
        name,
        extras,
        specifiers,
        url: None,
        marker,
    })
}

fn split_marker(text: &str) -> (&str, Option<String>) {
    match text.split_once(';') {
        Some((before, marker)) => {
            let marker = marker.trim();
            (before, (!marker.is_empty()).then(|| marker.to_string()))
        }
        None => (text, None),
    }
}

/// Whether a bare package name denotes the interpreter or installer.
pub fn is_excluded_name(name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
}

/// Split `channel::name` into its namespace and name.
pub fn split_namespace(token: &str) -> (Option<&str>, &str) {
    match token.split_once("::") {
        Some((namespace, name)) => (Some(namespace), name),
        None => (None, token),
    }
}

/// Split an inline pin `name=version` (or `name==version`, `name=version=build`).
///
/// Returns the bare name and the version, with any trailing build string
/// dropped. Names without `=` come back unchanged with no version.
pub fn split_inline_pin(token: &str) -> (&str, Option<&str>) {
    let Some((name, rest)) = token.split_once('=') else {
        return (token, None);
    };
    let rest = rest.trim_start_matches('=');
    let version = rest.split('=').next().unwrap_or_default().trim();
    (name.trim(), (!version.is_empty()).then_some(version))
}
