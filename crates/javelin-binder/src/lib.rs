//! The binder: multi-phase symbol resolution.
//!
//! Binding runs in strictly ordered phases over all source classes at once:
//!
//! 1. **preliminary** — allocate class symbols, build import tables, record
//!    enclosing relations, build the top-level index;
//! 2. **header** — resolve supertype/interface/permits *symbols* and access
//!    flags with a restricted scope (no type-parameter bounds or inherited
//!    members yet), then detect and cut inheritance cycles;
//! 3. **hierarchy** — with the full scope available, bind type-parameter
//!    bounds, supertype/interface type arguments, and the inherited
//!    member-type scope;
//! 4. **member** — bind field/method/component types and mint method
//!    symbols with erased descriptors;
//! 5. **constants** — fold every constant field initialiser (on-demand with
//!    cycle detection);
//! 6. **annotations** — evaluate declaration-position annotations, partition
//!    them between declaration and type-use by `@Target`, group repeatable
//!    annotations into containers, and extract annotation metadata.
//!
//! Each phase reads only the previous phase's output; references between
//! classes are symbols resolved through the environment at the point of
//! use, so cyclic class graphs are fine.

pub mod annotations;
pub mod consteval;
pub mod index;
pub mod phases;
pub mod relations;
pub mod resolve;
pub mod sealed;

use indexmap::IndexMap;
use javelin_common::Diagnostics;
use javelin_model::{ClassProvider, ClassSym, Env, Names, TypeBoundClass};
use std::sync::Arc;
use tracing::{debug, info_span};

#[derive(Clone, Copy, Debug, Default)]
pub struct BindOptions {
    /// Report (as warnings) annotations whose `@Target` admits neither the
    /// declaration site nor type use. The default silently drops them.
    pub report_untargeted_annotations: bool,
}

/// The result of binding one source set.
pub struct BindResult {
    /// Source classes in registration order (file order, then declaration
    /// order within a file).
    pub classes: IndexMap<ClassSym, Arc<TypeBoundClass>>,
    pub diagnostics: Diagnostics,
}

impl BindResult {
    /// An environment over the source classes only.
    pub fn source_env(&self) -> impl Env<Arc<TypeBoundClass>> + '_ {
        SourceEnv { result: self }
    }
}

struct SourceEnv<'a> {
    result: &'a BindResult,
}

impl<'a> Env<Arc<TypeBoundClass>> for SourceEnv<'a> {
    fn entry(&self, sym: ClassSym) -> Option<Arc<TypeBoundClass>> {
        self.result.classes.get(&sym).cloned()
    }
}

/// The complete environment: bound source classes over the classpath, with
/// a sentinel for anything unknown so lookups never dead-end.
pub struct FullEnv<'a> {
    pub classes: &'a IndexMap<ClassSym, Arc<TypeBoundClass>>,
    pub classpath: &'a dyn ClassProvider,
    pub names: &'a Names,
}

impl<'a> Env<Arc<TypeBoundClass>> for FullEnv<'a> {
    fn entry(&self, sym: ClassSym) -> Option<Arc<TypeBoundClass>> {
        if let Some(found) = self.classes.get(&sym) {
            return Some(found.clone());
        }
        let name = self.names.binary_name(sym);
        self.classpath.load(&name, self.names)
    }
}

impl<'a> FullEnv<'a> {
    /// Like `entry`, but returns the error sentinel instead of `None`.
    pub fn entry_or_sentinel(&self, sym: ClassSym) -> Arc<TypeBoundClass> {
        self.entry(sym)
            .unwrap_or_else(|| Arc::new(TypeBoundClass::sentinel(sym)))
    }
}

/// Bind a source set against a classpath.
pub fn bind(
    units: &[javelin_parser::ast::CompilationUnit],
    names: &Names,
    classpath: &dyn ClassProvider,
    options: BindOptions,
) -> BindResult {
    let span = info_span!("bind", units = units.len());
    let _enter = span.enter();

    let mut binder = phases::Binder::new(units, names, classpath, options);
    binder.preliminary();
    binder.headers();
    binder.hierarchies();
    sealed::check_sealed(&mut binder);
    binder.members();
    binder.constants();
    binder.annotations();
    debug!(classes = binder.bound.len(), "binding complete");

    let diagnostics = binder.take_diagnostics();
    BindResult {
        classes: binder.bound,
        diagnostics,
    }
}
