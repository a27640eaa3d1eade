//! The declaration-level AST.
//!
//! Nodes are created by the parser and never mutated afterwards. Statements
//! never appear here; expressions appear only where the language admits
//! compile-time constants (annotation arguments, field initialisers,
//! annotation-element defaults).

use bitflags::bitflags;
use javelin_common::Span;

/// An identifier with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

/// A dotted name (`java.util.List`), one `Ident` per segment.
pub type QualIdent = Vec<Ident>;

pub fn qual_ident_text(name: &[Ident]) -> String {
    name.iter()
        .map(|id| id.name.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

bitflags! {
    /// Declaration modifiers as written in source. `SEALED`/`NON_SEALED`
    /// have no class-file bit; they survive to binding and influence flags
    /// and `PermittedSubclasses` emission there.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Mods: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const ABSTRACT = 1 << 4;
        const FINAL = 1 << 5;
        const NATIVE = 1 << 6;
        const SYNCHRONIZED = 1 << 7;
        const TRANSIENT = 1 << 8;
        const VOLATILE = 1 << 9;
        const STRICTFP = 1 << 10;
        const DEFAULT = 1 << 11;
        const SEALED = 1 << 12;
        const NON_SEALED = 1 << 13;
    }
}

// ---------------------------------------------------------------------------
// Compilation units
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CompilationUnit {
    /// Path the unit was read from, for diagnostics.
    pub file: String,
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
    pub module: Option<ModuleDecl>,
}

#[derive(Debug)]
pub struct PackageDecl {
    pub annotations: Vec<Anno>,
    pub name: QualIdent,
    pub span: Span,
}

#[derive(Debug)]
pub struct ImportDecl {
    pub is_static: bool,
    /// `import a.b.*;`
    pub on_demand: bool,
    pub name: QualIdent,
    pub span: Span,
}

#[derive(Debug)]
pub struct ModuleDecl {
    pub open: bool,
    pub name: QualIdent,
    pub directives: Vec<ModuleDirective>,
    pub annotations: Vec<Anno>,
    pub span: Span,
}

#[derive(Debug)]
pub enum ModuleDirective {
    Requires {
        transitive: bool,
        is_static: bool,
        module: QualIdent,
    },
    Exports {
        package: QualIdent,
        to: Vec<QualIdent>,
    },
    Opens {
        package: QualIdent,
        to: Vec<QualIdent>,
    },
    Uses {
        service: QualIdent,
    },
    Provides {
        service: QualIdent,
        with: Vec<QualIdent>,
    },
}

// ---------------------------------------------------------------------------
// Type declarations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Annotation,
    Record,
}

#[derive(Debug)]
pub struct TypeDecl {
    pub javadoc: Option<String>,
    pub annotations: Vec<Anno>,
    pub mods: Mods,
    pub kind: TypeKind,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    /// For interfaces the `extends` list lands in `interfaces`.
    pub superclass: Option<Ty>,
    pub interfaces: Vec<Ty>,
    pub permits: Vec<Ty>,
    /// Record header components, in source order.
    pub components: Vec<Param>,
    pub constants: Vec<EnumConstant>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug)]
pub enum Member {
    Type(TypeDecl),
    Field(FieldDecl),
    Method(MethodDecl),
}

#[derive(Debug)]
pub struct TypeParam {
    pub annotations: Vec<Anno>,
    pub name: Ident,
    /// Written bounds, first may be a class, rest interfaces.
    pub bounds: Vec<Ty>,
}

#[derive(Debug)]
pub struct EnumConstant {
    pub javadoc: Option<String>,
    pub annotations: Vec<Anno>,
    pub name: Ident,
    /// Constructor arguments and constant bodies are tokenised past; only
    /// their presence is recorded.
    pub has_args: bool,
    pub has_body: bool,
}

#[derive(Debug)]
pub struct FieldDecl {
    pub javadoc: Option<String>,
    pub annotations: Vec<Anno>,
    pub mods: Mods,
    pub ty: Ty,
    pub name: Ident,
    /// Extra C-style declarator dimensions (`int x[][]`).
    pub extra_dims: Vec<Vec<Anno>>,
    /// Initialiser, present only when it parsed as a constant expression.
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub javadoc: Option<String>,
    pub annotations: Vec<Anno>,
    pub mods: Mods,
    pub type_params: Vec<TypeParam>,
    /// `None` for constructors.
    pub return_ty: Option<Ty>,
    pub name: Ident,
    /// Annotated receiver parameter type (`void f(@A Foo this)`), kept only
    /// for its type annotations.
    pub receiver: Option<Ty>,
    pub params: Vec<Param>,
    /// Extra C-style dimensions after the parameter list (`int f()[]`).
    pub extra_dims: Vec<Vec<Anno>>,
    pub throws: Vec<Ty>,
    /// Annotation-element default (`int value() default 3;`).
    pub default_value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Param {
    pub annotations: Vec<Anno>,
    pub mods: Mods,
    pub ty: Ty,
    pub name: Ident,
    pub varargs: bool,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Types (unresolved)
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

/// A type as written, before binding. Type annotations stay attached to the
/// node they annotate.
#[derive(Clone, Debug)]
pub enum Ty {
    Primitive {
        kind: PrimKind,
        annotations: Vec<Anno>,
        span: Span,
    },
    Void {
        span: Span,
    },
    Array {
        element: Box<Ty>,
        annotations: Vec<Anno>,
        span: Span,
    },
    /// A (possibly qualified) class type; type arguments and annotations
    /// attach per segment.
    Named {
        segments: Vec<TySeg>,
        span: Span,
    },
    Wildcard {
        bound: WildBound,
        annotations: Vec<Anno>,
        span: Span,
    },
}

impl Ty {
    pub fn span(&self) -> Span {
        match self {
            Ty::Primitive { span, .. }
            | Ty::Void { span }
            | Ty::Array { span, .. }
            | Ty::Named { span, .. }
            | Ty::Wildcard { span, .. } => *span,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TySeg {
    pub name: Ident,
    pub args: Vec<Ty>,
    pub annotations: Vec<Anno>,
}

#[derive(Clone, Debug)]
pub enum WildBound {
    None,
    Extends(Box<Ty>),
    Super(Box<Ty>),
}

// ---------------------------------------------------------------------------
// Constant expressions
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum Lit {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// UTF-16 code unit.
    Char(u16),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Literal {
        value: Lit,
        span: Span,
    },
    /// A dotted name; resolution decides whether it is a constant field.
    Name {
        segments: QualIdent,
        span: Span,
    },
    /// `T.class`, `int[].class`.
    ClassLit {
        ty: Ty,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        span: Span,
    },
    Cast {
        ty: Ty,
        operand: Box<Expr>,
        span: Span,
    },
    /// `{a, b, c}` in annotation values and array field initialisers.
    ArrayInit {
        elements: Vec<Expr>,
        span: Span,
    },
    Annotation(Anno),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Name { span, .. }
            | Expr::ClassLit { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Cast { span, .. }
            | Expr::ArrayInit { span, .. } => *span,
            Expr::Annotation(anno) => anno.span,
        }
    }
}

/// An annotation use: `@Name`, `@Name(value)` or `@Name(k = v, ...)`.
#[derive(Clone, Debug)]
pub struct Anno {
    pub name: QualIdent,
    /// Element name (None for the single-`value` shorthand) and value.
    pub args: Vec<(Option<Ident>, Expr)>,
    pub span: Span,
}
