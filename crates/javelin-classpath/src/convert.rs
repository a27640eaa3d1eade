//! Class-file to bound-class conversion.
//!
//! Produces the same `TypeBoundClass` shape the binder produces for source
//! classes, so the rest of the compiler never cares where a class came
//! from. Generic types are rebuilt from signatures when present and from
//! erased descriptors otherwise. Type variables referencing an enclosing
//! class's parameters (possible in signatures of inner classes) degrade to
//! the error type rather than guessing.

use javelin_classfile::{
    AnnotationItem, ClassFile, ElemConst, ElementValue, FieldItem, FieldType, MethodItem,
    SigTypeParam, TypeArgSig, TypeSig, descriptor, signature,
};
use javelin_model::{
    AccessFlags, AnnoValue, AnnotationMetadata, ClassSym, ClassTy, ComponentInfo, Const,
    FieldInfo, FieldSym, MethodInfo, MethodSym, Names, ParamInfo, PrimTy, Retention,
    SimpleClassTy, SourceKind, TargetSet, TyParam, TyVarOwner, TyVarSym, Type, TypeBoundClass,
    WildBoundTy, types::WildTy,
};
use std::collections::HashMap;

pub fn to_bound_class(cf: &ClassFile, names: &Names) -> TypeBoundClass {
    let sym = names.class(&cf.name);
    let access = AccessFlags::from_classfile_bits(cf.access);
    let kind = kind_of(cf, access);

    let mut scope: HashMap<String, TyVarSym> = HashMap::new();
    let (type_params, supertype, interfaces) = match cf
        .signature
        .as_deref()
        .and_then(|sig| signature::parse_class_signature(sig).ok())
    {
        Some(sig) => {
            let type_params =
                convert_type_params(&sig.type_params, TyVarOwner::Class(sym), names, &mut scope);
            let supertype = Some(sig_to_type(&sig.superclass, &scope, names));
            let interfaces = sig
                .interfaces
                .iter()
                .map(|iface| sig_to_type(iface, &scope, names))
                .collect();
            (type_params, supertype, interfaces)
        }
        None => {
            let supertype = cf
                .super_name
                .as_deref()
                .map(|name| Type::class(names.class(name)));
            let interfaces = cf
                .interfaces
                .iter()
                .map(|name| Type::class(names.class(name)))
                .collect();
            (Vec::new(), supertype, interfaces)
        }
    };

    let mut access = access;
    if !cf.permitted_subclasses.is_empty() {
        access |= AccessFlags::SEALED;
    }

    let fields = cf
        .fields
        .iter()
        .map(|field| convert_field(field, sym, &scope, names))
        .collect();
    let methods = cf
        .methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.name != "<clinit>")
        .map(|(index, method)| convert_method(method, sym, index as u32, &scope, names))
        .collect();
    let components = cf
        .record_components
        .iter()
        .map(|component| ComponentInfo {
            name: component.name.clone(),
            ty: component
                .signature
                .as_deref()
                .and_then(|sig| signature::parse_type_signature(sig).ok())
                .map(|sig| sig_to_type(&sig, &scope, names))
                .unwrap_or_else(|| descriptor_type(&component.descriptor, names)),
            annotations: convert_annotations(&component.annotations, names),
        })
        .collect();

    let annotations = convert_annotations(&cf.annotations, names);
    let anno_meta = if kind == SourceKind::Annotation {
        Some(extract_metadata(&annotations, names))
    } else {
        None
    };

    let mut children = indexmap::IndexMap::new();
    for entry in &cf.inner_classes {
        if entry.outer.as_deref() == Some(cf.name.as_str()) {
            if let Some(simple) = &entry.inner_name {
                children.insert(simple.clone(), names.class(&entry.inner));
            }
        }
    }

    TypeBoundClass {
        sym,
        access,
        kind,
        owner: javelin_common::names::enclosing_of(&cf.name).map(|outer| names.class(outer)),
        type_params,
        supertype,
        interfaces,
        permits: cf
            .permitted_subclasses
            .iter()
            .map(|name| names.class(name))
            .collect(),
        children,
        fields,
        methods,
        components,
        annotations,
        anno_meta,
        module: None,
        javadoc: None,
    }
}

fn kind_of(cf: &ClassFile, access: AccessFlags) -> SourceKind {
    if access.contains(AccessFlags::ANNOTATION) {
        SourceKind::Annotation
    } else if access.contains(AccessFlags::INTERFACE) {
        SourceKind::Interface
    } else if access.contains(AccessFlags::ENUM) {
        SourceKind::Enum
    } else if cf.super_name.as_deref() == Some(javelin_common::names::RECORD)
        || !cf.record_components.is_empty()
    {
        SourceKind::Record
    } else {
        SourceKind::Class
    }
}

fn convert_field(
    field: &FieldItem,
    owner: ClassSym,
    scope: &HashMap<String, TyVarSym>,
    names: &Names,
) -> FieldInfo {
    let ty = field
        .signature
        .as_deref()
        .and_then(|sig| signature::parse_type_signature(sig).ok())
        .map(|sig| sig_to_type(&sig, scope, names))
        .unwrap_or_else(|| descriptor_type(&field.descriptor, names));
    FieldInfo {
        sym: FieldSym {
            owner,
            name: names.intern(&field.name),
        },
        name: field.name.clone(),
        access: AccessFlags::from_classfile_bits(field.access),
        ty,
        annotations: convert_annotations(&field.annotations, names),
        constant: field.constant.as_ref().map(|c| elem_const_to_const(c)),
        javadoc: None,
    }
}

fn convert_method(
    method: &MethodItem,
    owner: ClassSym,
    index: u32,
    class_scope: &HashMap<String, TyVarSym>,
    names: &Names,
) -> MethodInfo {
    let mut scope = class_scope.clone();
    let parsed = method
        .signature
        .as_deref()
        .and_then(|sig| signature::parse_method_signature(sig).ok());
    let (type_params, param_types, return_ty, throws) = match parsed {
        Some(sig) => {
            let type_params = convert_type_params(
                &sig.type_params,
                TyVarOwner::Method(owner, index),
                names,
                &mut scope,
            );
            let params: Vec<Type> = sig
                .params
                .iter()
                .map(|p| sig_to_type(p, &scope, names))
                .collect();
            let ret = sig_to_type(&sig.ret, &scope, names);
            let throws: Vec<Type> = if sig.throws.is_empty() {
                method
                    .exceptions
                    .iter()
                    .map(|name| Type::class(names.class(name)))
                    .collect()
            } else {
                sig.throws
                    .iter()
                    .map(|t| sig_to_type(t, &scope, names))
                    .collect()
            };
            (type_params, params, ret, throws)
        }
        None => {
            let parsed = descriptor::parse_method_descriptor(&method.descriptor).ok();
            let (params, ret) = match parsed {
                Some(desc) => (
                    desc.params
                        .iter()
                        .map(|p| field_type_to_type(p, names))
                        .collect(),
                    desc.ret
                        .as_ref()
                        .map(|r| field_type_to_type(r, names))
                        .unwrap_or(Type::Void),
                ),
                None => (Vec::new(), Type::Error),
            };
            let throws = method
                .exceptions
                .iter()
                .map(|name| Type::class(names.class(name)))
                .collect();
            (Vec::new(), params, ret, throws)
        }
    };

    let params: Vec<ParamInfo> = param_types
        .into_iter()
        .enumerate()
        .map(|(i, ty)| {
            let (name, flags) = method
                .method_parameters
                .get(i)
                .map(|(n, f)| (n.clone(), *f))
                .unwrap_or((None, 0));
            let annotations = method
                .parameter_annotations
                .as_ref()
                .and_then(|per_param| per_param.get(i))
                .map(|annos| convert_annotations(annos, names))
                .unwrap_or_default();
            ParamInfo {
                name: name.unwrap_or_else(|| format!("arg{i}")),
                access: AccessFlags::from_classfile_bits(flags),
                ty,
                annotations,
            }
        })
        .collect();

    MethodInfo {
        sym: MethodSym {
            owner,
            name: names.intern(&method.name),
            descriptor: names.intern(&method.descriptor),
        },
        name: method.name.clone(),
        access: AccessFlags::from_classfile_bits(method.access),
        type_params,
        return_ty,
        params,
        receiver: None,
        throws,
        default_value: method
            .annotation_default
            .as_ref()
            .map(|v| element_value_to_const(v, names)),
        annotations: convert_annotations(&method.annotations, names),
        javadoc: None,
    }
}

fn convert_type_params(
    params: &[SigTypeParam],
    owner: TyVarOwner,
    names: &Names,
    scope: &mut HashMap<String, TyVarSym>,
) -> Vec<TyParam> {
    // Mint all symbols first so bounds can reference one another.
    let syms: Vec<TyVarSym> = params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let sym = TyVarSym {
                owner,
                name: names.intern(&param.name),
                index: index as u32,
            };
            scope.insert(param.name.clone(), sym);
            sym
        })
        .collect();
    params
        .iter()
        .zip(syms)
        .map(|(param, sym)| {
            let mut bounds = Vec::new();
            if let Some(class_bound) = &param.class_bound {
                bounds.push(sig_to_type(class_bound, scope, names));
            }
            for iface in &param.iface_bounds {
                bounds.push(sig_to_type(iface, scope, names));
            }
            TyParam {
                sym,
                bounds,
                annotations: Vec::new(),
            }
        })
        .collect()
}

pub fn sig_to_type(sig: &TypeSig, scope: &HashMap<String, TyVarSym>, names: &Names) -> Type {
    match sig {
        TypeSig::Base(c) => Type::Primitive(prim_of_descriptor(*c), Vec::new()),
        TypeSig::Void => Type::Void,
        TypeSig::Array(element) => {
            Type::Array(Box::new(sig_to_type(element, scope, names)), Vec::new())
        }
        TypeSig::TyVar(name) => match scope.get(name) {
            Some(&sym) => Type::TyVar(sym, Vec::new()),
            None => Type::Error,
        },
        TypeSig::Class(class) => {
            let mut path = vec![SimpleClassTy {
                sym: names.class(&class.binary),
                args: class
                    .args
                    .iter()
                    .map(|arg| arg_to_type(arg, scope, names))
                    .collect(),
                annotations: Vec::new(),
            }];
            let mut binary = class.binary.clone();
            for (simple, args) in &class.nested {
                binary.push('$');
                binary.push_str(simple);
                path.push(SimpleClassTy {
                    sym: names.class(&binary),
                    args: args.iter().map(|arg| arg_to_type(arg, scope, names)).collect(),
                    annotations: Vec::new(),
                });
            }
            Type::Class(ClassTy { path })
        }
    }
}

fn arg_to_type(arg: &TypeArgSig, scope: &HashMap<String, TyVarSym>, names: &Names) -> Type {
    match arg {
        TypeArgSig::Unbounded => Type::Wildcard(WildTy {
            bound: WildBoundTy::None,
            annotations: Vec::new(),
        }),
        TypeArgSig::Exact(sig) => sig_to_type(sig, scope, names),
        TypeArgSig::Extends(sig) => Type::Wildcard(WildTy {
            bound: WildBoundTy::Upper(Box::new(sig_to_type(sig, scope, names))),
            annotations: Vec::new(),
        }),
        TypeArgSig::Super(sig) => Type::Wildcard(WildTy {
            bound: WildBoundTy::Lower(Box::new(sig_to_type(sig, scope, names))),
            annotations: Vec::new(),
        }),
    }
}

pub fn descriptor_type(text: &str, names: &Names) -> Type {
    match descriptor::parse_field_descriptor(text) {
        Ok(parsed) => field_type_to_type(&parsed, names),
        Err(_) => Type::Error,
    }
}

fn field_type_to_type(field_type: &FieldType, names: &Names) -> Type {
    match field_type {
        FieldType::Base(c) => Type::Primitive(prim_of_descriptor(*c), Vec::new()),
        FieldType::Object(name) => Type::class(names.class(name)),
        FieldType::Array(element) => {
            Type::Array(Box::new(field_type_to_type(element, names)), Vec::new())
        }
    }
}

fn prim_of_descriptor(c: char) -> PrimTy {
    match c {
        'Z' => PrimTy::Boolean,
        'B' => PrimTy::Byte,
        'S' => PrimTy::Short,
        'I' => PrimTy::Int,
        'J' => PrimTy::Long,
        'C' => PrimTy::Char,
        'F' => PrimTy::Float,
        'D' => PrimTy::Double,
        _ => PrimTy::Int,
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

pub fn convert_annotations(annotations: &[AnnotationItem], names: &Names) -> Vec<AnnoValue> {
    annotations
        .iter()
        .map(|anno| annotation_to_value(anno, names))
        .collect()
}

fn annotation_to_value(anno: &AnnotationItem, names: &Names) -> AnnoValue {
    AnnoValue {
        sym: names.class(strip_descriptor(&anno.type_descriptor)),
        values: anno
            .values
            .iter()
            .map(|(name, value)| (name.clone(), element_value_to_const(value, names)))
            .collect(),
    }
}

fn element_value_to_const(value: &ElementValue, names: &Names) -> Const {
    match value {
        ElementValue::Const(c) => elem_const_to_const(c),
        ElementValue::EnumConst {
            type_descriptor,
            const_name,
        } => Const::EnumConst(FieldSym {
            owner: names.class(strip_descriptor(type_descriptor)),
            name: names.intern(const_name),
        }),
        ElementValue::ClassInfo(descriptor) => Const::Class(if descriptor == "V" {
            Type::Void
        } else {
            descriptor_type(descriptor, names)
        }),
        ElementValue::Annotation(anno) => Const::Annotation(annotation_to_value(anno, names)),
        ElementValue::Array(values) => Const::Array(
            values
                .iter()
                .map(|v| element_value_to_const(v, names))
                .collect(),
        ),
    }
}

fn elem_const_to_const(c: &ElemConst) -> Const {
    match c {
        ElemConst::Byte(v) => Const::Byte(*v),
        ElemConst::Char(v) => Const::Char(*v),
        ElemConst::Double(v) => Const::Double(*v),
        ElemConst::Float(v) => Const::Float(*v),
        ElemConst::Int(v) => Const::Int(*v),
        ElemConst::Long(v) => Const::Long(*v),
        ElemConst::Short(v) => Const::Short(*v),
        ElemConst::Bool(v) => Const::Bool(*v),
        ElemConst::Str(v) => Const::Str(v.clone()),
    }
}

fn strip_descriptor(descriptor: &str) -> &str {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .unwrap_or(descriptor)
}

/// Annotation metadata from a compiled annotation class's own annotations.
fn extract_metadata(annotations: &[AnnoValue], names: &Names) -> AnnotationMetadata {
    let mut meta = AnnotationMetadata::default();
    for anno in annotations {
        let name = names.binary_name(anno.sym);
        match name.as_str() {
            javelin_common::names::RETENTION => {
                if let Some(Const::EnumConst(field)) = anno.value("value") {
                    meta.retention = names.with(field.name, |n| match n {
                        "SOURCE" => Retention::Source,
                        "RUNTIME" => Retention::Runtime,
                        _ => Retention::Class,
                    });
                }
            }
            javelin_common::names::TARGET => {
                let mut targets = TargetSet::empty();
                let values: Vec<&Const> = match anno.value("value") {
                    Some(Const::Array(values)) => values.iter().collect(),
                    Some(single) => vec![single],
                    None => Vec::new(),
                };
                for value in values {
                    if let Const::EnumConst(field) = value {
                        names.with(field.name, |n| targets |= target_of(n));
                    }
                }
                meta.targets = targets;
            }
            javelin_common::names::INHERITED => meta.inherited = true,
            javelin_common::names::REPEATABLE => {
                if let Some(Const::Class(Type::Class(container))) = anno.value("value") {
                    meta.repeatable = Some(container.sym());
                }
            }
            _ => {}
        }
    }
    meta
}

fn target_of(name: &str) -> TargetSet {
    match name {
        "TYPE" => TargetSet::TYPE,
        "FIELD" => TargetSet::FIELD,
        "METHOD" => TargetSet::METHOD,
        "PARAMETER" => TargetSet::PARAMETER,
        "CONSTRUCTOR" => TargetSet::CONSTRUCTOR,
        "LOCAL_VARIABLE" => TargetSet::LOCAL_VARIABLE,
        "ANNOTATION_TYPE" => TargetSet::ANNOTATION_TYPE,
        "PACKAGE" => TargetSet::PACKAGE,
        "TYPE_PARAMETER" => TargetSet::TYPE_PARAMETER,
        "TYPE_USE" => TargetSet::TYPE_USE,
        "MODULE" => TargetSet::MODULE,
        "RECORD_COMPONENT" => TargetSet::RECORD_COMPONENT,
        _ => TargetSet::empty(),
    }
}
