//! Directory-convention lookups between related manifests.
//!
//! A Conda installation keeps the two machine-readable views of a package
//! in predictable places:
//!
//! ```text
//! <install-root>/conda-meta/<name>-<version>-<build>.json
//! <install-root>/pkgs/<name>-<version>-<build>/info/recipe/meta.yaml
//! ```
//!
//! Older packages nest the recipe one level deeper, under
//! `info/recipe.tar-extract/recipe/` or `info/recipe/recipe/`.
//!
//! The lookups below walk between the two. Any deviation from the
//! convention (wrong directory names, missing resources, a sibling that
//! failed to parse) results in `None`, never an error.

use tracing::debug;

use crate::codebase::{Codebase, Resource};

/// Recipe locations relative to the directory that owns them, most specific
/// first. The last entry is the layout of an extracted package.
const RECIPE_SUFFIXES: [&str; 4] = [
    "info/recipe.tar-extract/recipe/meta.yaml",
    "info/recipe/recipe/meta.yaml",
    "conda.recipe/meta.yaml",
    "info/recipe/meta.yaml",
];

/// Recipe locations inside an extracted package directory, in lookup order.
const PACKAGE_RECIPE_SUFFIXES: [&str; 3] = [
    "info/recipe/meta.yaml",
    "info/recipe.tar-extract/recipe/meta.yaml",
    "info/recipe/recipe/meta.yaml",
];

/// The directory a recipe describes: the package directory for recipes under
/// `info/`, the repository for `conda.recipe/meta.yaml`, otherwise the
/// recipe's own directory.
pub fn get_conda_root<'a>(codebase: &'a Codebase, recipe: &'a Resource) -> Option<&'a Resource> {
    for suffix in RECIPE_SUFFIXES {
        if !recipe.path.ends_with(suffix) {
            continue;
        }
        let mut current = recipe;
        for _ in suffix.split('/') {
            current = codebase.parent(current)?;
        }
        return Some(current);
    }
    codebase.parent(recipe)
}

/// Find the `conda-meta/*.json` record of the installed package a recipe
/// was extracted from.
pub fn find_conda_meta_json<'a>(
    codebase: &'a Codebase,
    recipe: &'a Resource,
) -> Option<&'a Resource> {
    let record = recipe.package_data.first()?;
    let package_dir = get_conda_root(codebase, recipe)?;
    let pkgs_dir = codebase.parent(package_dir)?;

    let name = record.name.as_deref().unwrap_or("None");
    let version = record.version.as_deref().unwrap_or("None");
    let expected = format!("{name}-{version}");
    if !package_dir.name.contains(&expected) || !pkgs_dir.name.contains("pkgs") {
        debug!(
            "Recipe {} is not inside a pkgs/{}* directory, no metadata JSON lookup",
            recipe.path, expected
        );
        return None;
    }

    let install_root = codebase.parent(pkgs_dir)?;
    let json_path = format!("{}/conda-meta/{}.json", install_root.path, package_dir.name);
    let json = codebase.get_resource(&json_path).filter(|r| r.has_package_data());
    debug!(
        "Metadata JSON for recipe {}: {}",
        recipe.path,
        json.map_or("not found", |r| r.path.as_str())
    );
    json
}

/// Find the recipe extracted alongside an installed package's
/// `conda-meta/*.json` record.
pub fn find_conda_meta_yaml<'a>(
    codebase: &'a Codebase,
    json: &'a Resource,
) -> Option<&'a Resource> {
    let recipe = package_recipes(codebase, json).next();
    debug!(
        "Recipe for metadata JSON {}: {}",
        json.path,
        recipe.map_or("not found", |r| r.path.as_str())
    );
    recipe
}

/// Every parsed recipe inside the extracted package directory of a
/// `conda-meta/*.json` record, plain `info/recipe/meta.yaml` first.
pub fn package_recipes<'a>(
    codebase: &'a Codebase,
    json: &'a Resource,
) -> impl Iterator<Item = &'a Resource> + 'a {
    let package_dir = json
        .name
        .strip_suffix(".json")
        .zip(codebase.parent(json).filter(|r| r.name == "conda-meta"))
        .and_then(|(package_dir_name, conda_meta)| {
            let install_root = codebase.parent(conda_meta)?;
            codebase.get_resource(&format!("{}/pkgs/{}", install_root.path, package_dir_name))
        });

    package_dir.into_iter().flat_map(move |dir| {
        PACKAGE_RECIPE_SUFFIXES.into_iter().filter_map(move |suffix| {
            codebase
                .get_resource(&format!("{}/{}", dir.path, suffix))
                .filter(|r| r.has_package_data())
        })
    })
}
