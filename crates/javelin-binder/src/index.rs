//! The top-level index.
//!
//! A tree keyed by package name: each package holds a scope of simple name
//! to class symbol for its immediate classes. Source packages are populated
//! eagerly during the preliminary phase; classpath packages are listed
//! lazily on first touch.

use javelin_model::{ClassProvider, ClassSym, Names};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Default)]
struct PackageScope {
    classes: FxHashMap<String, ClassSym>,
    classpath_listed: bool,
}

#[derive(Default)]
pub struct TopIndex {
    packages: FxHashMap<String, PackageScope>,
    /// Packages known not to exist anywhere, to avoid re-probing the
    /// classpath.
    missing: FxHashSet<String>,
}

impl TopIndex {
    pub fn new() -> Self {
        TopIndex::default()
    }

    pub fn insert_source(&mut self, package: &str, simple: &str, sym: ClassSym) {
        self.packages
            .entry(package.to_string())
            .or_default()
            .classes
            .insert(simple.to_string(), sym);
    }

    /// Is `package` a known package (source or classpath)?
    pub fn has_package(&mut self, package: &str, classpath: &dyn ClassProvider) -> bool {
        if self.packages.contains_key(package) {
            return true;
        }
        if self.missing.contains(package) {
            return false;
        }
        if classpath.has_package(package) {
            self.packages.entry(package.to_string()).or_default();
            true
        } else {
            self.missing.insert(package.to_string());
            false
        }
    }

    /// Look up a top-level class by package and simple name, listing the
    /// classpath package on first touch.
    pub fn lookup(
        &mut self,
        package: &str,
        simple: &str,
        names: &Names,
        classpath: &dyn ClassProvider,
    ) -> Option<ClassSym> {
        if !self.has_package(package, classpath) {
            return None;
        }
        let scope = self.packages.get_mut(package).expect("package exists");
        if let Some(&sym) = scope.classes.get(simple) {
            return Some(sym);
        }
        if !scope.classpath_listed {
            scope.classpath_listed = true;
            if let Some(listed) = classpath.list_package(package) {
                for listed_simple in listed {
                    let binary = javelin_common::names::top_level(package, &listed_simple);
                    let sym = names.class(&binary);
                    // Source declarations shadow classpath entries.
                    scope.classes.entry(listed_simple).or_insert(sym);
                }
            }
        }
        scope.classes.get(simple).copied()
    }

    /// All classes currently known in a package (after forcing the
    /// classpath listing). Used by on-demand imports.
    pub fn force_list(
        &mut self,
        package: &str,
        names: &Names,
        classpath: &dyn ClassProvider,
    ) -> Vec<(String, ClassSym)> {
        // Listing happens as a side effect of a lookup miss.
        let _ = self.lookup(package, "", names, classpath);
        match self.packages.get(package) {
            Some(scope) => {
                let mut classes: Vec<_> = scope
                    .classes
                    .iter()
                    .map(|(name, &sym)| (name.clone(), sym))
                    .collect();
                classes.sort();
                classes
            }
            None => Vec::new(),
        }
    }
}
