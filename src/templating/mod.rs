//! Crude variable resolution for templated Conda recipes.
//!
//! `meta.yaml` recipes are Jinja templates. They usually declare a few
//! variables at the top and reference them further down:
//!
//! ```text
//! {% set name = "abeona" %}
//! {% set version = "0.45.0" %}
//!
//! package:
//!   name: {{ name|lower }}
//!   version: {{ version }}
//! ```
//!
//! This module does not evaluate Jinja. It resolves the recipe in two passes:
//!
//! 1. **Extraction**: every `{% set <name> = <value> %}` line yields a variable.
//! 2. **Substitution**: every `{{ name }}` or `{{ name|lower }}` referring to a
//!    known variable is replaced by its literal value.
//!
//! Whatever cannot be resolved is removed line by line: declaration lines are
//! dropped, statement lines (`{% if ... %}`, `{% endfor %}`) are dropped, and any
//! line still holding a `{{` reference after substitution is dropped. A recipe
//! with exotic templating therefore loses a few fields instead of failing to
//! parse.
//!
//! Variables are not chained: `{% set b = a ~ "x" %}` stores the raw text
//! `a ~ "x"`, and a line referencing `b` keeps that text verbatim.

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::trace;

use crate::core::FileOps;

/// `{{ name }}` or `{{ name|lower }}` with any inner whitespace.
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*(?:\|\s*([A-Za-z_]+)\s*)?\}\}")
        .expect("reference pattern is a valid regex")
});

/// Filters applied inside a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Lower,
}

impl Filter {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "lower" => Some(Self::Lower),
            _ => None,
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            Self::Lower => value.to_lowercase(),
        }
    }
}

/// A recipe after variable resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTemplate {
    /// Declared variables and their literal values
    pub variables: BTreeMap<String, String>,
    /// The recipe text with references substituted and unresolved lines removed
    pub text: String,
}

/// Read the declared variables of a templated file.
pub fn get_variables(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = FileOps::read_with_context(path, "extracting template variables", "templating")?;
    Ok(extract_variables(&content))
}

/// Resolve a templated file.
pub fn resolve_file(path: &Path) -> Result<ResolvedTemplate> {
    let content = FileOps::read_with_context(path, "resolving recipe template", "templating")
        .with_context(|| format!("Failed to resolve template: {}", path.display()))?;
    Ok(resolve_template(&content))
}

/// Collect `{% set name = value %}` declarations.
///
/// The value is everything after the first `=`, trimmed, with one pair of
/// surrounding quotes removed. Later declarations of the same name win.
pub fn extract_variables(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| is_declaration(line))
        .filter_map(parse_declaration)
        .collect()
}

/// Run both passes over `text`.
pub fn resolve_template(text: &str) -> ResolvedTemplate {
    let variables = extract_variables(text);
    let mut lines = Vec::new();

    for line in text.lines() {
        let stripped = line.trim();
        if is_declaration(stripped) || is_statement(stripped) {
            trace!("Dropping template statement: {}", stripped);
            continue;
        }

        let line = if line.contains("{{") {
            substitute(line, &variables)
        } else {
            line.to_string()
        };

        if line.contains("{{") {
            trace!("Dropping unresolved template line: {}", line.trim());
            continue;
        }
        lines.push(line);
    }

    let mut text = lines.join("\n");
    if !text.is_empty() {
        text.push('\n');
    }

    ResolvedTemplate {
        variables,
        text,
    }
}

fn substitute(line: &str, variables: &BTreeMap<String, String>) -> String {
    REFERENCE
        .replace_all(line, |caps: &Captures<'_>| {
            let original = caps[0].to_string();
            let Some(value) = variables.get(&caps[1]) else {
                return original;
            };
            match caps.get(2) {
                None => value.clone(),
                Some(filter) => match Filter::parse(filter.as_str()) {
                    Some(filter) => filter.apply(value),
                    None => original,
                },
            }
        })
        .into_owned()
}

fn is_declaration(stripped: &str) -> bool {
    stripped.starts_with("{%") && stripped.ends_with("%}") && stripped.contains('=')
}

fn is_statement(stripped: &str) -> bool {
    stripped.starts_with("{%") && stripped.ends_with("%}")
}

fn parse_declaration(stripped: &str) -> Option<(String, String)> {
    let inner = stripped.strip_prefix("{%")?.strip_suffix("%}")?;
    let inner = inner.strip_prefix('-').unwrap_or(inner);
    let inner = inner.strip_suffix('-').unwrap_or(inner).trim();

    let rest = inner.strip_prefix("set")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let (name, value) = rest.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    Some((name.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value.strip_prefix(quote).and_then(|v| v.strip_suffix(quote)) {
            return inner;
        }
    }
    value
}
