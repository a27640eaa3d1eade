//! The symbol and type model.
//!
//! Everything the binder produces and the lowerer consumes lives here:
//! symbols (lightweight interned handles), the type algebra, constant
//! values, and the bound-class records that grow richer phase by phase.
//! The classpath reader produces the same final record shape
//! (`TypeBoundClass`) from compiled class files, so downstream consumers
//! never care where a class came from.

pub mod bound;
pub mod consts;
pub mod env;
pub mod flags;
pub mod names;
pub mod provider;
pub mod sym;
pub mod types;

pub use bound::{
    AnnotationMetadata, ComponentInfo, FieldInfo, MethodInfo, ModuleBound, ParamInfo, Retention,
    SourceHeaderBound, SourceHierarchyBound, SourceKind, TargetSet, TyParam, TypeBoundClass,
};
pub use consts::{AnnoValue, Const};
pub use env::{CompoundEnv, Env, MapEnv};
pub use flags::AccessFlags;
pub use names::Names;
pub use provider::ClassProvider;
pub use sym::{ClassSym, FieldSym, MethodSym, ModuleSym, PackageSym, TyVarOwner, TyVarSym};
pub use types::{ClassTy, PrimTy, SimpleClassTy, Type, WildBoundTy};
