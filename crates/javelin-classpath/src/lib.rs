//! Lazy classpath reading.
//!
//! A `Classpath` is an ordered list of entries (class directories and
//! jars). Packages are listed on first touch and classes parsed on first
//! load; both are memoised in concurrent maps so the parallel lowering
//! stage can share the reader. Repeated loads are idempotent.

pub mod convert;
pub mod stubs;

use dashmap::DashMap;
use javelin_model::{ClassProvider, Names, TypeBoundClass};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("class file error: {0}")]
    ClassFile(#[from] javelin_classfile::ClassFileError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
}

impl ClasspathEntry {
    /// Guess the entry kind from the path.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("jar" | "zip") => ClasspathEntry::Jar(path.to_path_buf()),
            _ => ClasspathEntry::ClassDir(path.to_path_buf()),
        }
    }
}

pub struct Classpath {
    entries: Vec<ClasspathEntry>,
    /// Binary name -> parsed class; `None` caches misses.
    classes: DashMap<String, Option<Arc<TypeBoundClass>>>,
    /// Package -> simple names of its classes.
    packages: DashMap<String, Option<Vec<String>>>,
}

impl Classpath {
    pub fn new(entries: Vec<ClasspathEntry>) -> Self {
        Classpath {
            entries,
            classes: DashMap::new(),
            packages: DashMap::new(),
        }
    }

    pub fn empty() -> Self {
        Classpath::new(Vec::new())
    }

    fn read_class_bytes(&self, binary_name: &str) -> Option<Vec<u8>> {
        let relative = format!("{binary_name}.class");
        for entry in &self.entries {
            match entry {
                ClasspathEntry::ClassDir(dir) => {
                    let path = dir.join(&relative);
                    if let Ok(bytes) = std::fs::read(&path) {
                        return Some(bytes);
                    }
                }
                ClasspathEntry::Jar(path) => {
                    if let Some(bytes) = read_jar_entry(path, &relative) {
                        return Some(bytes);
                    }
                }
            }
        }
        None
    }

    fn list_package_uncached(&self, package: &str) -> Option<Vec<String>> {
        let mut simple_names: Vec<String> = Vec::new();
        let mut found = false;
        let prefix = if package.is_empty() {
            String::new()
        } else {
            format!("{package}/")
        };
        for entry in &self.entries {
            match entry {
                ClasspathEntry::ClassDir(dir) => {
                    let pkg_dir = if package.is_empty() {
                        dir.clone()
                    } else {
                        dir.join(package)
                    };
                    let Ok(read) = std::fs::read_dir(&pkg_dir) else {
                        continue;
                    };
                    found = true;
                    for file in read.flatten() {
                        let name = file.file_name();
                        let Some(name) = name.to_str() else { continue };
                        if let Some(stem) = name.strip_suffix(".class") {
                            // Nested classes are reached through their
                            // enclosing class, not the package scope.
                            if !stem.contains('$') {
                                simple_names.push(stem.to_string());
                            }
                        }
                    }
                }
                ClasspathEntry::Jar(path) => {
                    let Some(names) = list_jar_package(path, &prefix) else {
                        continue;
                    };
                    if !names.is_empty() {
                        found = true;
                    }
                    simple_names.extend(names);
                }
            }
        }
        if !found && simple_names.is_empty() {
            return None;
        }
        simple_names.sort();
        simple_names.dedup();
        Some(simple_names)
    }
}

impl ClassProvider for Classpath {
    fn load(&self, binary_name: &str, names: &Names) -> Option<Arc<TypeBoundClass>> {
        if let Some(cached) = self.classes.get(binary_name) {
            return cached.clone();
        }
        let loaded = self.read_class_bytes(binary_name).and_then(|bytes| {
            match javelin_classfile::read_class(&bytes) {
                Ok(cf) => Some(Arc::new(convert::to_bound_class(&cf, names))),
                Err(err) => {
                    warn!(class = binary_name, error = %err, "skipping unreadable class file");
                    None
                }
            }
        });
        if loaded.is_some() {
            debug!(class = binary_name, "loaded classpath class");
        }
        // First insert wins so concurrent loads agree.
        self.classes
            .entry(binary_name.to_string())
            .or_insert(loaded)
            .clone()
    }

    fn list_package(&self, package: &str) -> Option<Vec<String>> {
        if let Some(cached) = self.packages.get(package) {
            return cached.clone();
        }
        let listed = self.list_package_uncached(package);
        self.packages
            .entry(package.to_string())
            .or_insert(listed)
            .clone()
    }
}

fn read_jar_entry(jar: &Path, relative: &str) -> Option<Vec<u8>> {
    let file = std::fs::File::open(jar).ok()?;
    let mut archive = zip::ZipArchive::new(file).ok()?;
    let mut entry = archive.by_name(relative).ok()?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

fn list_jar_package(jar: &Path, prefix: &str) -> Option<Vec<String>> {
    let file = std::fs::File::open(jar).ok()?;
    let archive = zip::ZipArchive::new(file).ok()?;
    let mut names = Vec::new();
    for name in archive.file_names() {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(stem) = rest.strip_suffix(".class") else {
            continue;
        };
        if !stem.contains('/') && !stem.contains('$') {
            names.push(stem.to_string());
        }
    }
    Some(names)
}
