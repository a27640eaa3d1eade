//! The class-file level model.
//!
//! Everything here is already in wire terms: binary names, descriptors,
//! 16-bit access masks. The lowerer produces these from bound classes; the
//! reader produces them from bytes.

/// A whole class file, method bodies excluded.
#[derive(Clone, Debug, Default)]
pub struct ClassFile {
    pub minor: u16,
    pub major: u16,
    pub access: u16,
    /// Binary name (`com/example/Foo$Bar`).
    pub name: String,
    /// Absent for `java/lang/Object` and module-info.
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldItem>,
    pub methods: Vec<MethodItem>,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationItem>,
    pub type_annotations: Vec<TypeAnnotationItem>,
    pub inner_classes: Vec<InnerClassItem>,
    pub permitted_subclasses: Vec<String>,
    pub nest_host: Option<String>,
    pub nest_members: Vec<String>,
    pub record_components: Vec<RecordComponentItem>,
    pub module: Option<ModuleItem>,
    pub deprecated: bool,
}

#[derive(Clone, Debug)]
pub struct FieldItem {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub constant: Option<ElemConst>,
    pub annotations: Vec<AnnotationItem>,
    pub type_annotations: Vec<TypeAnnotationItem>,
    pub deprecated: bool,
}

#[derive(Clone, Debug)]
pub struct MethodItem {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub exceptions: Vec<String>,
    pub annotations: Vec<AnnotationItem>,
    /// One inner list per declared (non-synthetic) parameter; empty inner
    /// lists are retained so indices line up.
    pub parameter_annotations: Option<Vec<Vec<AnnotationItem>>>,
    pub type_annotations: Vec<TypeAnnotationItem>,
    /// `MethodParameters` entries: name (None for synthetic) and flags.
    pub method_parameters: Vec<(Option<String>, u16)>,
    pub annotation_default: Option<ElementValue>,
    pub deprecated: bool,
}

#[derive(Clone, Debug)]
pub struct RecordComponentItem {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationItem>,
    pub type_annotations: Vec<TypeAnnotationItem>,
}

#[derive(Clone, Debug)]
pub struct InnerClassItem {
    /// Binary name of the nested class.
    pub inner: String,
    /// Binary name of the immediately enclosing class.
    pub outer: Option<String>,
    /// Simple name; `None` for anonymous classes.
    pub inner_name: Option<String>,
    /// Original (pre-promotion) access flags.
    pub access: u16,
}

#[derive(Clone, Debug)]
pub struct ModuleItem {
    pub name: String,
    pub flags: u16,
    pub requires: Vec<(String, u16)>,
    pub exports: Vec<(String, u16, Vec<String>)>,
    pub opens: Vec<(String, u16, Vec<String>)>,
    /// Service class binary names.
    pub uses: Vec<String>,
    /// Service binary name and implementation binary names.
    pub provides: Vec<(String, Vec<String>)>,
}

/// An annotation with its element values.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationItem {
    /// Field descriptor of the annotation type (`Lcom/example/A;`).
    pub type_descriptor: String,
    pub values: Vec<(String, ElementValue)>,
    /// Chooses the `RuntimeVisible*` or `RuntimeInvisible*` table.
    pub visible: bool,
}

/// A constant usable in `ConstantValue` and annotation element values. The
/// original primitive kind is preserved because the element-value tag
/// depends on it even though `byte`/`short`/`char`/`boolean` all share the
/// `CONSTANT_Integer` pool shape.
#[derive(Clone, Debug, PartialEq)]
pub enum ElemConst {
    Byte(i8),
    Char(u16),
    Double(f64),
    Float(f32),
    Int(i32),
    Long(i64),
    Short(i16),
    Bool(bool),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
    Const(ElemConst),
    EnumConst {
        /// Field descriptor of the enum type.
        type_descriptor: String,
        const_name: String,
    },
    /// A class literal, as a field or `V` descriptor.
    ClassInfo(String),
    Annotation(Box<AnnotationItem>),
    Array(Vec<ElementValue>),
}

/// Where a type annotation attaches (the `target_type` + `target_info`
/// pair, restricted to the targets that occur outside method bodies).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetInfo {
    /// 0x00
    ClassTypeParameter(u8),
    /// 0x01
    MethodTypeParameter(u8),
    /// 0x10; 65535 denotes the superclass, `i` the i-th interface.
    Supertype(u16),
    /// 0x11
    ClassTypeParameterBound(u8, u8),
    /// 0x12
    MethodTypeParameterBound(u8, u8),
    /// 0x13
    Field,
    /// 0x14
    MethodReturn,
    /// 0x15
    MethodReceiver,
    /// 0x16
    MethodFormalParameter(u8),
    /// 0x17
    Throws(u16),
}

impl TargetInfo {
    pub fn tag(self) -> u8 {
        match self {
            TargetInfo::ClassTypeParameter(_) => 0x00,
            TargetInfo::MethodTypeParameter(_) => 0x01,
            TargetInfo::Supertype(_) => 0x10,
            TargetInfo::ClassTypeParameterBound(..) => 0x11,
            TargetInfo::MethodTypeParameterBound(..) => 0x12,
            TargetInfo::Field => 0x13,
            TargetInfo::MethodReturn => 0x14,
            TargetInfo::MethodReceiver => 0x15,
            TargetInfo::MethodFormalParameter(_) => 0x16,
            TargetInfo::Throws(_) => 0x17,
        }
    }
}

/// One step of a type path locating an annotated sub-type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypePathStep {
    /// kind 0: into the element type of an array.
    Array,
    /// kind 1: into a nested (inner) type.
    Nested,
    /// kind 2: into the bound of a wildcard.
    Wildcard,
    /// kind 3: into the i-th type argument.
    TypeArgument(u8),
}

impl TypePathStep {
    pub fn encode(self) -> (u8, u8) {
        match self {
            TypePathStep::Array => (0, 0),
            TypePathStep::Nested => (1, 0),
            TypePathStep::Wildcard => (2, 0),
            TypePathStep::TypeArgument(i) => (3, i),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeAnnotationItem {
    pub target: TargetInfo,
    pub path: Vec<TypePathStep>,
    pub annotation: AnnotationItem,
}
