//! Lowering: bound classes to class files.
//!
//! The lowerer erases types to descriptors, synthesizes generic signatures
//! only where they carry information beyond the descriptor, computes type
//! annotation targets and paths, collects the inner-class and nest tables,
//! and post-processes access flags (nested classes lose `static`,
//! `private` and `strictfp` at the class level and have `protected`
//! promoted to `public`; the original flags live in the `InnerClasses`
//! attribute).

pub mod signatures;
pub mod type_annos;

use javelin_binder::FullEnv;
use javelin_binder::relations::TypeOps;
use javelin_classfile::{
    AnnotationItem, ClassFile, ElemConst, ElementValue, FieldItem, InnerClassItem, MethodItem,
    ModuleItem, RecordComponentItem, TargetInfo, TypeAnnotationItem,
};
use javelin_common::names as bn;
use javelin_model::{
    AccessFlags, AnnoValue, ClassSym, Const, Env, FieldInfo, MethodInfo, ModuleBound, Retention,
    Type, TypeBoundClass,
};
use std::cell::RefCell;
use tracing::trace;

// Module attribute flag bits.
const ACC_OPEN: u16 = 0x0020;
const ACC_TRANSITIVE: u16 = 0x0020;
const ACC_STATIC_PHASE: u16 = 0x0040;
const ACC_MANDATED: u16 = 0x8000;

/// Lower one bound class to its class-file form.
pub fn lower_class(class: &TypeBoundClass, env: &FullEnv<'_>, major: u16) -> ClassFile {
    let lowerer = Lowerer {
        env,
        ops: TypeOps::new(env),
        refs: RefCell::new(Vec::new()),
    };
    lowerer.lower(class, major)
}

pub(crate) struct Lowerer<'e> {
    pub(crate) env: &'e FullEnv<'e>,
    pub(crate) ops: TypeOps<'e>,
    /// Class symbols referenced by emitted descriptors and signatures, in
    /// discovery order; feeds the inner-class table.
    refs: RefCell<Vec<ClassSym>>,
}

impl<'e> Lowerer<'e> {
    pub(crate) fn names(&self) -> &javelin_model::Names {
        self.env.names
    }

    pub(crate) fn touch(&self, sym: ClassSym) {
        let mut refs = self.refs.borrow_mut();
        if !refs.contains(&sym) {
            refs.push(sym);
        }
    }

    fn lower(&self, class: &TypeBoundClass, major: u16) -> ClassFile {
        if let Some(module) = &class.module {
            return self.lower_module(module, major);
        }
        let name = self.names().binary_name(class.sym);
        trace!(class = %name, "lowering");

        let super_name = if name == bn::OBJECT {
            None
        } else {
            Some(self.superclass_name(class))
        };
        let mut cf = ClassFile {
            major,
            minor: 0,
            access: self.class_access_bits(class),
            name: name.clone(),
            super_name,
            ..ClassFile::default()
        };
        for iface in &class.interfaces {
            if let Some(sym) = self.erased_sym(iface) {
                self.touch(sym);
                cf.interfaces.push(self.names().binary_name(sym));
            }
        }

        cf.signature = signatures::class_signature(self, class);
        cf.deprecated = is_deprecated(&class.annotations, class.javadoc.as_deref(), self);
        cf.annotations = self.annotation_items(&class.annotations);
        cf.type_annotations = type_annos::class_type_annotations(self, class);

        for field in &class.fields {
            if field.access.is_private() {
                continue;
            }
            cf.fields.push(self.lower_field(field));
        }
        for method in &class.methods {
            if method.access.is_private() {
                continue;
            }
            cf.methods.push(self.lower_method(method));
        }
        for component in &class.components {
            cf.record_components.push(self.lower_component(component));
        }

        if !class.permits.is_empty() {
            for &permitted in &class.permits {
                self.touch(permitted);
                cf.permitted_subclasses
                    .push(self.names().binary_name(permitted));
            }
        }
        self.nest_attributes(class, &mut cf);
        cf.inner_classes = self.inner_class_table(class);
        cf
    }

    /// Class-level flag post-processing for nested classes.
    fn class_access_bits(&self, class: &TypeBoundClass) -> u16 {
        let mut access = class.access;
        if class.owner.is_some() {
            access -= AccessFlags::STATIC | AccessFlags::PRIVATE | AccessFlags::STRICT;
            if access.contains(AccessFlags::PROTECTED) {
                access -= AccessFlags::PROTECTED;
                access |= AccessFlags::PUBLIC;
            }
        }
        access.classfile_bits()
    }

    fn superclass_name(&self, class: &TypeBoundClass) -> String {
        let sym = class
            .supertype
            .as_ref()
            .and_then(|ty| self.erased_sym(ty))
            .unwrap_or_else(|| self.names().class(bn::OBJECT));
        self.touch(sym);
        self.names().binary_name(sym)
    }

    fn erased_sym(&self, ty: &Type) -> Option<ClassSym> {
        match self.ops.erasure(ty) {
            Type::Class(class_ty) => Some(class_ty.sym()),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    fn lower_field(&self, field: &FieldInfo) -> FieldItem {
        FieldItem {
            access: field.access.classfile_bits(),
            name: field.name.clone(),
            descriptor: self.descriptor(&field.ty),
            signature: signatures::field_signature(self, &field.ty),
            constant: field.constant.as_ref().and_then(constant_value),
            annotations: self.annotation_items(&field.annotations),
            type_annotations: type_annos::field_type_annotations(self, &field.ty),
            deprecated: is_deprecated(&field.annotations, field.javadoc.as_deref(), self),
        }
    }

    fn lower_method(&self, method: &MethodInfo) -> MethodItem {
        let mut exceptions = Vec::new();
        for thrown in &method.throws {
            if let Some(sym) = self.erased_sym(thrown) {
                self.touch(sym);
                exceptions.push(self.names().binary_name(sym));
            }
        }
        let has_param_annotations = method.params.iter().any(|p| !p.annotations.is_empty());
        let parameter_annotations = has_param_annotations.then(|| {
            method
                .params
                .iter()
                .map(|p| self.annotation_items(&p.annotations))
                .collect()
        });
        let method_parameters = method
            .params
            .iter()
            .map(|p| (Some(p.name.clone()), p.access.classfile_bits()))
            .collect();
        MethodItem {
            access: (method.access
                - (AccessFlags::DEFAULT_METHOD | AccessFlags::COMPACT_RECORD_CTOR))
                .classfile_bits(),
            name: method.name.clone(),
            descriptor: self.method_descriptor(method),
            signature: signatures::method_signature(self, method),
            exceptions,
            annotations: self.annotation_items(&method.annotations),
            parameter_annotations,
            type_annotations: type_annos::method_type_annotations(self, method),
            method_parameters,
            annotation_default: method
                .default_value
                .as_ref()
                .map(|value| self.element_value(value, true)),
            deprecated: is_deprecated(&method.annotations, method.javadoc.as_deref(), self),
        }
    }

    fn lower_component(&self, component: &javelin_model::ComponentInfo) -> RecordComponentItem {
        RecordComponentItem {
            name: component.name.clone(),
            descriptor: self.descriptor(&component.ty),
            signature: signatures::field_signature(self, &component.ty),
            annotations: self.annotation_items(&component.annotations),
            type_annotations: {
                let mut out = Vec::new();
                type_annos::collect(
                    self,
                    &component.ty,
                    TargetInfo::Field,
                    &mut Vec::new(),
                    &mut out,
                );
                out
            },
        }
    }

    // ------------------------------------------------------------------
    // Descriptors
    // ------------------------------------------------------------------

    pub(crate) fn descriptor(&self, ty: &Type) -> String {
        let mut out = String::new();
        self.write_descriptor(ty, &mut out);
        out
    }

    fn method_descriptor(&self, method: &MethodInfo) -> String {
        let mut out = String::from("(");
        for param in &method.params {
            self.write_descriptor(&param.ty, &mut out);
        }
        out.push(')');
        self.write_descriptor(&method.return_ty, &mut out);
        out
    }

    pub(crate) fn write_descriptor(&self, ty: &Type, out: &mut String) {
        match self.ops.erasure(ty) {
            Type::Primitive(kind, _) => out.push(kind.descriptor()),
            Type::Void => out.push('V'),
            Type::Array(element, _) => {
                out.push('[');
                self.write_descriptor(&element, out);
            }
            Type::Class(class_ty) => {
                let sym = class_ty.sym();
                self.touch(sym);
                out.push('L');
                out.push_str(&self.names().binary_name(sym));
                out.push(';');
            }
            _ => {
                let object = self.names().class(bn::OBJECT);
                self.touch(object);
                out.push('L');
                out.push_str(bn::OBJECT);
                out.push(';');
            }
        }
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    fn retention_of(&self, sym: ClassSym) -> Retention {
        self.env
            .entry(sym)
            .and_then(|bound| bound.anno_meta.as_ref().map(|meta| meta.retention))
            .unwrap_or(Retention::Class)
    }

    /// Source-retention annotations are dropped; the rest pick their table
    /// by retention.
    pub(crate) fn annotation_items(&self, annotations: &[AnnoValue]) -> Vec<AnnotationItem> {
        annotations
            .iter()
            .filter_map(|anno| self.annotation_item(anno))
            .collect()
    }

    pub(crate) fn annotation_item(&self, anno: &AnnoValue) -> Option<AnnotationItem> {
        let retention = self.retention_of(anno.sym);
        if retention == Retention::Source {
            return None;
        }
        let visible = retention == Retention::Runtime;
        Some(self.annotation_item_with_visibility(anno, visible))
    }

    fn annotation_item_with_visibility(&self, anno: &AnnoValue, visible: bool) -> AnnotationItem {
        self.touch(anno.sym);
        AnnotationItem {
            type_descriptor: format!("L{};", self.names().binary_name(anno.sym)),
            values: anno
                .values
                .iter()
                .map(|(name, value)| (name.clone(), self.element_value(value, visible)))
                .collect(),
            visible,
        }
    }

    fn element_value(&self, value: &Const, visible: bool) -> ElementValue {
        match value {
            Const::Bool(v) => ElementValue::Const(ElemConst::Bool(*v)),
            Const::Byte(v) => ElementValue::Const(ElemConst::Byte(*v)),
            Const::Short(v) => ElementValue::Const(ElemConst::Short(*v)),
            Const::Char(v) => ElementValue::Const(ElemConst::Char(*v)),
            Const::Int(v) => ElementValue::Const(ElemConst::Int(*v)),
            Const::Long(v) => ElementValue::Const(ElemConst::Long(*v)),
            Const::Float(v) => ElementValue::Const(ElemConst::Float(*v)),
            Const::Double(v) => ElementValue::Const(ElemConst::Double(*v)),
            Const::Str(v) => ElementValue::Const(ElemConst::Str(v.clone())),
            Const::Class(ty) => ElementValue::ClassInfo(match ty {
                Type::Void => "V".to_string(),
                other => self.descriptor(other),
            }),
            Const::EnumConst(field) => {
                self.touch(field.owner);
                ElementValue::EnumConst {
                    type_descriptor: format!("L{};", self.names().binary_name(field.owner)),
                    const_name: self.names().resolve(field.name),
                }
            }
            Const::Annotation(anno) => ElementValue::Annotation(Box::new(
                self.annotation_item_with_visibility(anno, visible),
            )),
            Const::Array(values) => ElementValue::Array(
                values
                    .iter()
                    .map(|v| self.element_value(v, visible))
                    .collect(),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Nest and inner-class tables
    // ------------------------------------------------------------------

    fn nest_attributes(&self, class: &TypeBoundClass, cf: &mut ClassFile) {
        match class.owner {
            Some(_) => {
                let mut host = class.sym;
                while let Some(outer) = self
                    .env
                    .entry(host)
                    .and_then(|b| b.owner)
                    .or_else(|| self.enclosing_sym(host))
                {
                    host = outer;
                }
                cf.nest_host = Some(self.names().binary_name(host));
            }
            None => {
                let mut members = Vec::new();
                self.collect_nest_members(class.sym, &mut members);
                cf.nest_members = members
                    .into_iter()
                    .map(|sym| self.names().binary_name(sym))
                    .collect();
            }
        }
    }

    fn collect_nest_members(&self, sym: ClassSym, out: &mut Vec<ClassSym>) {
        let Some(bound) = self.env.entry(sym) else {
            return;
        };
        for &child in bound.children.values() {
            out.push(child);
            self.collect_nest_members(child, out);
        }
    }

    fn enclosing_sym(&self, sym: ClassSym) -> Option<ClassSym> {
        let binary = self.names().binary_name(sym);
        bn::enclosing_of(&binary).map(|outer| self.names().class(outer))
    }

    /// The inner-class table: this class's own nesting chain, its member
    /// classes, then every nested class referenced by an emitted descriptor
    /// or signature, each with its transitive enclosing classes, ordered
    /// outer-before-inner.
    fn inner_class_table(&self, class: &TypeBoundClass) -> Vec<InnerClassItem> {
        let mut ordered: Vec<ClassSym> = Vec::new();
        let mut add = |sym: ClassSym, ordered: &mut Vec<ClassSym>| {
            // Add the full enclosing chain, outermost first.
            let mut chain = vec![sym];
            let mut current = sym;
            while let Some(outer) = self.enclosing_sym(current) {
                chain.push(outer);
                current = outer;
            }
            for &link in chain.iter().rev() {
                if self.enclosing_sym(link).is_some() && !ordered.contains(&link) {
                    ordered.push(link);
                }
            }
        };
        add(class.sym, &mut ordered);
        for &child in class.children.values() {
            add(child, &mut ordered);
        }
        for &referenced in self.refs.borrow().iter() {
            add(referenced, &mut ordered);
        }
        ordered
            .into_iter()
            .map(|sym| {
                let binary = self.names().binary_name(sym);
                let access = self
                    .env
                    .entry(sym)
                    .map(|bound| bound.access.classfile_bits())
                    .unwrap_or((AccessFlags::PUBLIC | AccessFlags::STATIC).classfile_bits());
                InnerClassItem {
                    outer: bn::enclosing_of(&binary).map(|s| s.to_string()),
                    inner_name: Some(bn::simple_name_of(&binary).to_string()),
                    inner: binary,
                    access,
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    fn lower_module(&self, module: &ModuleBound, major: u16) -> ClassFile {
        ClassFile {
            major,
            minor: 0,
            access: AccessFlags::MODULE.classfile_bits(),
            name: "module-info".to_string(),
            super_name: None,
            module: Some(ModuleItem {
                name: module.name.clone(),
                flags: if module.open { ACC_OPEN } else { 0 },
                requires: module
                    .requires
                    .iter()
                    .map(|(name, transitive, is_static)| {
                        let mut flags = 0u16;
                        if *transitive {
                            flags |= ACC_TRANSITIVE;
                        }
                        if *is_static {
                            flags |= ACC_STATIC_PHASE;
                        }
                        if name == "java.base" {
                            flags |= ACC_MANDATED;
                        }
                        (name.clone(), flags)
                    })
                    .collect(),
                exports: module
                    .exports
                    .iter()
                    .map(|(package, to)| (package.clone(), 0, to.clone()))
                    .collect(),
                opens: module
                    .opens
                    .iter()
                    .map(|(package, to)| (package.clone(), 0, to.clone()))
                    .collect(),
                uses: module.uses.clone(),
                provides: module.provides.clone(),
            }),
            ..ClassFile::default()
        }
    }
}

/// `@Deprecated` or a javadoc `@deprecated` tag set the attribute.
fn is_deprecated(annotations: &[AnnoValue], javadoc: Option<&str>, lowerer: &Lowerer<'_>) -> bool {
    annotations
        .iter()
        .any(|anno| lowerer.names().binary_name(anno.sym) == bn::DEPRECATED)
        || javadoc.is_some_and(|doc| doc.contains("@deprecated"))
}

/// A `ConstantValue` payload; only primitives and strings qualify.
fn constant_value(value: &Const) -> Option<ElemConst> {
    Some(match value {
        Const::Bool(v) => ElemConst::Bool(*v),
        Const::Byte(v) => ElemConst::Byte(*v),
        Const::Short(v) => ElemConst::Short(*v),
        Const::Char(v) => ElemConst::Char(*v),
        Const::Int(v) => ElemConst::Int(*v),
        Const::Long(v) => ElemConst::Long(*v),
        Const::Float(v) => ElemConst::Float(*v),
        Const::Double(v) => ElemConst::Double(*v),
        Const::Str(v) => ElemConst::Str(v.clone()),
        _ => return None,
    })
}

