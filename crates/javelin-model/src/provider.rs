//! The classpath-facing interface the binder consumes.
//!
//! Implementations load lazily and memoise; repeated idempotent loads must
//! return the same data.

use crate::bound::TypeBoundClass;
use crate::names::Names;
use std::sync::Arc;

pub trait ClassProvider: Send + Sync {
    /// Load a class by binary name, or `None` if no entry provides it.
    fn load(&self, binary_name: &str, names: &Names) -> Option<Arc<TypeBoundClass>>;

    /// The simple names of the classes directly in `package`
    /// (slash-separated; `""` is the default package), or `None` if no
    /// entry contains the package.
    fn list_package(&self, package: &str) -> Option<Vec<String>>;

    fn has_package(&self, package: &str) -> bool {
        self.list_package(package).is_some()
    }
}

/// An empty classpath, for tests and bootstrap-less compilations.
pub struct EmptyClasspath;

impl ClassProvider for EmptyClasspath {
    fn load(&self, _binary_name: &str, _names: &Names) -> Option<Arc<TypeBoundClass>> {
        None
    }

    fn list_package(&self, _package: &str) -> Option<Vec<String>> {
        None
    }
}
