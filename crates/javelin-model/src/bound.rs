//! Bound-class records.
//!
//! Binding is phased: each phase takes the previous phase's record for every
//! class and produces a strictly richer one, keyed by the same symbol.
//! Records are immutable once published; the binder builds the next phase's
//! map rather than mutating in place.
//!
//! `TypeBoundClass` is the terminal shape. The classpath reader parses
//! compiled class files straight into it, so environments mixing source and
//! classpath classes are uniform after member binding.

use crate::consts::{AnnoValue, Const};
use crate::flags::AccessFlags;
use crate::sym::{ClassSym, FieldSym, MethodSym, TyVarSym};
use crate::types::Type;
use bitflags::bitflags;
use indexmap::IndexMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

/// A bound type parameter: its symbol, its upper bounds (an intersection
/// whose first element may be a class, the rest interfaces), and its
/// declaration annotations.
#[derive(Clone, Debug)]
pub struct TyParam {
    pub sym: TyVarSym,
    pub bounds: Vec<Type>,
    pub annotations: Vec<AnnoValue>,
}

/// Phase-2 output: names resolved only far enough to know the shape of the
/// hierarchy. Supertypes are symbols without type arguments; type parameters
/// are names without bounds.
#[derive(Clone, Debug)]
pub struct SourceHeaderBound {
    pub sym: ClassSym,
    pub access: AccessFlags,
    pub kind: SourceKind,
    pub owner: Option<ClassSym>,
    pub type_param_names: Vec<String>,
    pub superclass: Option<ClassSym>,
    pub interfaces: Vec<ClassSym>,
    pub permits: Vec<ClassSym>,
    /// Nested member types by simple name, in source order.
    pub children: IndexMap<String, ClassSym>,
}

/// Phase-3 output: the full scope is available, so type parameters have
/// bounds and supertypes have type arguments.
#[derive(Clone, Debug)]
pub struct SourceHierarchyBound {
    pub header: SourceHeaderBound,
    pub type_params: Vec<TyParam>,
    /// `None` for `java/lang/Object` itself and for module pseudo-classes.
    pub supertype: Option<Type>,
    pub interface_types: Vec<Type>,
    /// Transitive member-type scope: nested-type simple names visible in
    /// this class, including those inherited from supertypes.
    pub member_scope: IndexMap<String, ClassSym>,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub sym: FieldSym,
    pub name: String,
    pub access: AccessFlags,
    pub ty: Type,
    pub annotations: Vec<AnnoValue>,
    pub constant: Option<Const>,
    pub javadoc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub name: String,
    pub access: AccessFlags,
    pub ty: Type,
    pub annotations: Vec<AnnoValue>,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub sym: MethodSym,
    pub name: String,
    pub access: AccessFlags,
    pub type_params: Vec<TyParam>,
    pub return_ty: Type,
    pub params: Vec<ParamInfo>,
    /// Annotated receiver type, kept for its type annotations.
    pub receiver: Option<Type>,
    pub throws: Vec<Type>,
    /// Annotation-element default.
    pub default_value: Option<Const>,
    pub annotations: Vec<AnnoValue>,
    pub javadoc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ComponentInfo {
    pub name: String,
    pub ty: Type,
    pub annotations: Vec<AnnoValue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retention {
    Source,
    Class,
    Runtime,
}

bitflags! {
    /// `@Target` element kinds.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TargetSet: u16 {
        const TYPE = 1 << 0;
        const FIELD = 1 << 1;
        const METHOD = 1 << 2;
        const PARAMETER = 1 << 3;
        const CONSTRUCTOR = 1 << 4;
        const LOCAL_VARIABLE = 1 << 5;
        const ANNOTATION_TYPE = 1 << 6;
        const PACKAGE = 1 << 7;
        const TYPE_PARAMETER = 1 << 8;
        const TYPE_USE = 1 << 9;
        const MODULE = 1 << 10;
        const RECORD_COMPONENT = 1 << 11;
    }
}

impl TargetSet {
    /// The implicit target set of an annotation with no `@Target`.
    pub fn default_targets() -> Self {
        TargetSet::all() - TargetSet::TYPE_PARAMETER - TargetSet::TYPE_USE
    }

    /// Can this annotation sit on a declaration of the given kind?
    pub fn allows_declaration(self, kind: TargetSet) -> bool {
        self.intersects(kind)
    }

    pub fn allows_type_use(self) -> bool {
        self.contains(TargetSet::TYPE_USE)
    }
}

/// Metadata peculiar to annotation declarations.
#[derive(Clone, Debug)]
pub struct AnnotationMetadata {
    pub retention: Retention,
    pub targets: TargetSet,
    pub inherited: bool,
    /// The container class, when `@Repeatable`.
    pub repeatable: Option<ClassSym>,
}

impl Default for AnnotationMetadata {
    fn default() -> Self {
        AnnotationMetadata {
            retention: Retention::Class,
            targets: TargetSet::default_targets(),
            inherited: false,
            repeatable: None,
        }
    }
}

/// A bound module declaration, carried on the `module-info` pseudo-class.
#[derive(Clone, Debug)]
pub struct ModuleBound {
    pub name: String,
    pub open: bool,
    pub requires: Vec<(String, bool, bool)>,
    pub exports: Vec<(String, Vec<String>)>,
    pub opens: Vec<(String, Vec<String>)>,
    pub uses: Vec<String>,
    pub provides: Vec<(String, Vec<String>)>,
}

/// The terminal bound-class shape (phases 4-6 complete for source classes;
/// direct parse result for classpath classes).
#[derive(Clone, Debug)]
pub struct TypeBoundClass {
    pub sym: ClassSym,
    pub access: AccessFlags,
    pub kind: SourceKind,
    pub owner: Option<ClassSym>,
    pub type_params: Vec<TyParam>,
    pub supertype: Option<Type>,
    pub interfaces: Vec<Type>,
    pub permits: Vec<ClassSym>,
    pub children: IndexMap<String, ClassSym>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub components: Vec<ComponentInfo>,
    pub annotations: Vec<AnnoValue>,
    pub anno_meta: Option<AnnotationMetadata>,
    pub module: Option<ModuleBound>,
    pub javadoc: Option<String>,
}

impl TypeBoundClass {
    /// A sentinel for classes that could not be found or parsed: operations
    /// return empty collections and the supertype is the error marker.
    pub fn sentinel(sym: ClassSym) -> Self {
        TypeBoundClass {
            sym,
            access: AccessFlags::PUBLIC,
            kind: SourceKind::Class,
            owner: None,
            type_params: Vec::new(),
            supertype: Some(Type::Error),
            interfaces: Vec::new(),
            permits: Vec::new(),
            children: IndexMap::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            components: Vec::new(),
            annotations: Vec::new(),
            anno_meta: None,
            module: None,
            javadoc: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.supertype, Some(Type::Error))
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn child(&self, name: &str) -> Option<ClassSym> {
        self.children.get(name).copied()
    }
}
