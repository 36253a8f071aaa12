//! Package assembly: from parsed manifests to packages and file ownership.
//!
//! A single installed Conda package is usually described twice: once by the
//! package manager in `conda-meta/<dir>.json` and once by its build recipe in
//! `pkgs/<dir>/info/recipe/meta.yaml`. The [`Assembler`] takes one parsed
//! manifest, finds its sibling through [`siblings`], and produces exactly one
//! [`Package`] for the pair regardless of which of the two it started from.
//!
//! # Policy
//!
//! - **Single-file scan**: the record becomes a package on its own.
//! - **Recipe with a metadata JSON sibling**: the JSON anchors the package;
//!   assembly restarts from it. A recipe the JSON does not find in its own
//!   package directory is merged into the resulting package afterwards.
//! - **Recipe alone**: the recipe anchors the package and its conda root
//!   directory is assigned to it.
//! - **Metadata JSON** (or environment file): the record anchors the package;
//!   every recipe in its package directory is merged into it, then the
//!   installed files listed in the record are assigned.
//!
//! Every manifest folded into a package is reported as
//! [`AssemblyItem::Resource`] so the caller does not assemble it a second
//! time. Nothing here fails: a broken convention just means fewer siblings.
//!
//! # Example
//!
//! ```rust
//! use conda_inspect::assembly::{Assembler, AssemblyItem};
//! use conda_inspect::codebase::{Codebase, ResourceOwnership};
//! use conda_inspect::models::{DatasourceId, PackageData};
//!
//! let mut codebase = Codebase::from_paths(["project/recipe/meta.yaml", "project/recipe/build.sh"]);
//! let mut record = PackageData::new(DatasourceId::CondaMetaYaml);
//! record.name = Some("foo".to_string());
//! record.version = Some("1.0".to_string());
//! codebase.attach_package_data("project/recipe/meta.yaml", vec![record]);
//!
//! let mut ownership = ResourceOwnership::new();
//! let resource = codebase.get_resource("project/recipe/meta.yaml").unwrap();
//! let items = Assembler::new(&codebase, &mut ownership)
//!     .assemble(&resource.package_data[0], resource);
//!
//! assert!(matches!(&items[0], AssemblyItem::Package(p) if p.purl == "pkg:conda/foo@1.0"));
//! assert!(ownership.owner_of("project/recipe/build.sh").is_some());
//! ```

pub mod siblings;

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::codebase::{Codebase, Resource, ResourceOwnership};
use crate::models::{DatasourceId, Dependency, Package, PackageData};

/// One output of an assembly run.
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyItem {
    Package(Package),
    Dependency(Dependency),
    /// A manifest consumed by this run
    Resource(String),
}

/// Runs assembly against a read-only tree, recording ownership.
pub struct Assembler<'a> {
    codebase: &'a Codebase,
    ownership: &'a mut ResourceOwnership,
}

impl<'a> Assembler<'a> {
    pub fn new(codebase: &'a Codebase, ownership: &'a mut ResourceOwnership) -> Self {
        Self {
            codebase,
            ownership,
        }
    }

    /// Assemble `package_data`, parsed from `resource`.
    pub fn assemble(&mut self, package_data: &PackageData, resource: &'a Resource) -> Vec<AssemblyItem> {
        let mut items = Vec::new();

        if self.codebase.has_single_resource() {
            self.assemble_single(package_data, resource, &mut items);
            return items;
        }

        if !resource.has_package_data() {
            trace!("No package data on {}", resource.path);
            return items;
        }

        if package_data.datasource_id == DatasourceId::CondaMetaYaml {
            if let Some(json) = siblings::find_conda_meta_json(self.codebase, resource)
                && let Some(json_data) = json.package_data.first()
            {
                debug!("Assembling recipe {} from metadata JSON {}", resource.path, json.path);
                items = self.assemble(json_data, json);
                let claimed = items
                    .iter()
                    .any(|item| matches!(item, AssemblyItem::Resource(path) if *path == resource.path));
                if !claimed {
                    self.merge_unclaimed_recipe(package_data, resource, &mut items);
                }
            } else {
                self.assemble_recipe_only(package_data, resource, &mut items);
            }
            return items;
        }

        if package_data.purl().is_none() {
            debug!("Manifest {} has no package identity", resource.path);
            items.extend(
                Dependency::from_dependent_packages(
                    &package_data.dependencies,
                    &resource.path,
                    package_data.datasource_id,
                    None,
                )
                .into_iter()
                .map(AssemblyItem::Dependency),
            );
            items.push(AssemblyItem::Resource(resource.path.clone()));
            return items;
        }

        self.assemble_anchor(package_data, resource, &mut items);
        items
    }

    fn assemble_single(
        &mut self,
        package_data: &PackageData,
        resource: &Resource,
        items: &mut Vec<AssemblyItem>,
    ) {
        let package_uid = Package::from_package_data(package_data, &resource.path).map(|package| {
            let uid = package.package_uid.clone();
            items.push(AssemblyItem::Package(package));
            uid
        });
        if let Some(uid) = &package_uid {
            self.ownership.assign(&resource.path, uid);
        }
        items.extend(
            Dependency::from_dependent_packages(
                &package_data.dependencies,
                &resource.path,
                package_data.datasource_id,
                package_uid.as_deref(),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );
        items.push(AssemblyItem::Resource(resource.path.clone()));
    }

    fn assemble_recipe_only(
        &mut self,
        package_data: &PackageData,
        resource: &'a Resource,
        items: &mut Vec<AssemblyItem>,
    ) {
        let Some(package) = Package::from_package_data(package_data, &resource.path) else {
            debug!("Recipe {} has no package identity", resource.path);
            return;
        };
        let uid = package.package_uid.clone();
        items.push(AssemblyItem::Package(package));
        items.extend(
            Dependency::from_dependent_packages(
                &package_data.dependencies,
                &resource.path,
                package_data.datasource_id,
                Some(&uid),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );
        self.assign_conda_root(resource, &uid);
        items.push(AssemblyItem::Resource(resource.path.clone()));
    }

    /// Build the package from a metadata JSON or environment record.
    fn assemble_anchor(
        &mut self,
        package_data: &PackageData,
        resource: &'a Resource,
        items: &mut Vec<AssemblyItem>,
    ) {
        let Some(mut package) = Package::from_package_data(package_data, &resource.path) else {
            return;
        };
        let uid = package.package_uid.clone();

        let recipes: Vec<_> = siblings::package_recipes(self.codebase, resource).collect();
        for recipe in recipes {
            if let Some(recipe_data) = recipe.package_data.first() {
                debug!("Merging recipe {} into {}", recipe.path, package.purl);
                package.update(recipe_data, &recipe.path);
                self.fold_recipe(recipe_data, recipe, &uid, items);
            }
        }

        items.push(AssemblyItem::Package(package));
        items.extend(
            Dependency::from_dependent_packages(
                &package_data.dependencies,
                &resource.path,
                package_data.datasource_id,
                Some(&uid),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );

        self.ownership.assign(&resource.path, &uid);
        items.push(AssemblyItem::Resource(resource.path.clone()));

        self.assign_installed_files(package_data, resource, &uid);
    }

    /// Merge a recipe that the metadata JSON it redirected to did not pick up
    /// from its own package directory.
    fn merge_unclaimed_recipe(
        &mut self,
        recipe_data: &PackageData,
        recipe: &'a Resource,
        items: &mut Vec<AssemblyItem>,
    ) {
        let uid = items.iter_mut().find_map(|item| match item {
            AssemblyItem::Package(package) => {
                debug!("Merging unclaimed recipe {} into {}", recipe.path, package.purl);
                package.update(recipe_data, &recipe.path);
                Some(package.package_uid.clone())
            }
            _ => None,
        });

        match uid {
            Some(uid) => self.fold_recipe(recipe_data, recipe, &uid, items),
            None => self.assemble_recipe_only(recipe_data, recipe, items),
        }
    }

    /// Record the ownership, dependencies and consumption of a recipe merged
    /// into the package `uid`.
    fn fold_recipe(
        &mut self,
        recipe_data: &PackageData,
        recipe: &'a Resource,
        uid: &str,
        items: &mut Vec<AssemblyItem>,
    ) {
        self.assign_conda_root(recipe, uid);
        items.extend(
            Dependency::from_dependent_packages(
                &recipe_data.dependencies,
                &recipe.path,
                recipe_data.datasource_id,
                Some(uid),
            )
            .into_iter()
            .map(AssemblyItem::Dependency),
        );
        items.push(AssemblyItem::Resource(recipe.path.clone()));
    }

    fn assign_conda_root(&mut self, recipe: &'a Resource, uid: &str) {
        let root = siblings::get_conda_root(self.codebase, recipe).unwrap_or(recipe);
        let assigned = self.ownership.assign_tree(self.codebase, root, uid);
        trace!("Assigned {} resources under {}", assigned, root.path);
    }

    /// Assign the extracted package directory, its `.conda` archive and the
    /// installed files listed by a metadata JSON record.
    fn assign_installed_files(&mut self, package_data: &PackageData, resource: &Resource, uid: &str) {
        let Some(extracted_package_dir) =
            package_data.extra_str("extracted_package_dir").filter(|d| !d.is_empty())
        else {
            return;
        };
        let Some(files) = package_data
            .extra_data
            .get("files")
            .and_then(JsonValue::as_array)
            .filter(|f| !f.is_empty())
        else {
            return;
        };

        let Some(install_root) =
            self.codebase.parent(resource).and_then(|conda_meta| self.codebase.parent(conda_meta))
        else {
            return;
        };

        let (root_segment, package_dir) =
            extracted_package_dir.rsplit_once("/pkgs/").unwrap_or(("", extracted_package_dir));
        if !install_root.path.ends_with(root_segment) {
            debug!(
                "Install root {} does not match extraction path {}",
                install_root.path, extracted_package_dir
            );
            return;
        }

        let codebase = self.codebase;
        let package_dir_path = format!("{}/pkgs/{}", install_root.path, package_dir);
        if let Some(dir) = codebase.get_resource(&package_dir_path) {
            self.ownership.assign_tree(codebase, dir, uid);
        }

        let archive_path = format!("{package_dir_path}.conda");
        if let Some(archive) = codebase.get_resource(&archive_path) {
            self.ownership.assign_tree(codebase, archive, uid);
        }

        for file in files.iter().filter_map(JsonValue::as_str) {
            let file_path = format!("{}/{}", install_root.path, file);
            match codebase.get_resource(&file_path) {
                Some(file_resource) => {
                    self.ownership.assign_tree(codebase, file_resource, uid);
                }
                None => trace!("Installed file {} not in codebase", file_path),
            }
        }
    }
}
