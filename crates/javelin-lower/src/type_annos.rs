//! Type-annotation target and path computation.
//!
//! Every type annotation surviving binding sits on a type node. Lowering
//! walks each emitted type, accumulating a type path, and emits one table
//! entry per annotation at the path where its node sits. C-style array
//! dimensions were already flattened during binding, so the outermost
//! written array is the shallowest path.

use crate::Lowerer;
use crate::signatures::bound_is_interface;
use javelin_classfile::{TargetInfo, TypeAnnotationItem, TypePathStep};
use javelin_model::{AnnoValue, MethodInfo, TyParam, Type, TypeBoundClass, WildBoundTy};

pub(crate) fn class_type_annotations(
    lowerer: &Lowerer<'_>,
    class: &TypeBoundClass,
) -> Vec<TypeAnnotationItem> {
    let mut out = Vec::new();
    if let Some(supertype) = &class.supertype {
        collect(
            lowerer,
            supertype,
            TargetInfo::Supertype(65535),
            &mut Vec::new(),
            &mut out,
        );
    }
    for (index, iface) in class.interfaces.iter().enumerate() {
        collect(
            lowerer,
            iface,
            TargetInfo::Supertype(index as u16),
            &mut Vec::new(),
            &mut out,
        );
    }
    type_param_annotations(
        lowerer,
        &class.type_params,
        TargetInfo::ClassTypeParameter,
        TargetInfo::ClassTypeParameterBound,
        &mut out,
    );
    out
}

pub(crate) fn method_type_annotations(
    lowerer: &Lowerer<'_>,
    method: &MethodInfo,
) -> Vec<TypeAnnotationItem> {
    let mut out = Vec::new();
    type_param_annotations(
        lowerer,
        &method.type_params,
        TargetInfo::MethodTypeParameter,
        TargetInfo::MethodTypeParameterBound,
        &mut out,
    );
    collect(
        lowerer,
        &method.return_ty,
        TargetInfo::MethodReturn,
        &mut Vec::new(),
        &mut out,
    );
    if let Some(receiver) = &method.receiver {
        collect(
            lowerer,
            receiver,
            TargetInfo::MethodReceiver,
            &mut Vec::new(),
            &mut out,
        );
    }
    for (index, param) in method.params.iter().enumerate() {
        collect(
            lowerer,
            &param.ty,
            TargetInfo::MethodFormalParameter(index as u8),
            &mut Vec::new(),
            &mut out,
        );
    }
    for (index, thrown) in method.throws.iter().enumerate() {
        collect(
            lowerer,
            thrown,
            TargetInfo::Throws(index as u16),
            &mut Vec::new(),
            &mut out,
        );
    }
    out
}

pub(crate) fn field_type_annotations(
    lowerer: &Lowerer<'_>,
    ty: &Type,
) -> Vec<TypeAnnotationItem> {
    let mut out = Vec::new();
    collect(lowerer, ty, TargetInfo::Field, &mut Vec::new(), &mut out);
    out
}

fn type_param_annotations(
    lowerer: &Lowerer<'_>,
    params: &[TyParam],
    param_target: fn(u8) -> TargetInfo,
    bound_target: fn(u8, u8) -> TargetInfo,
    out: &mut Vec<TypeAnnotationItem>,
) {
    for (index, param) in params.iter().enumerate() {
        emit(
            lowerer,
            &param.annotations,
            param_target(index as u8),
            &[],
            out,
        );
        // Bound index 0 is reserved for a class bound: when the first
        // written bound is an interface, interface bounds start at 1.
        let start = match param.bounds.first() {
            Some(first) if bound_is_interface(lowerer, first) => 1u8,
            _ => 0u8,
        };
        for (bound_index, bound) in param.bounds.iter().enumerate() {
            collect(
                lowerer,
                bound,
                bound_target(index as u8, start + bound_index as u8),
                &mut Vec::new(),
                out,
            );
        }
    }
}

/// The recursive walk: emit annotations at the current path, then descend.
pub(crate) fn collect(
    lowerer: &Lowerer<'_>,
    ty: &Type,
    target: TargetInfo,
    path: &mut Vec<TypePathStep>,
    out: &mut Vec<TypeAnnotationItem>,
) {
    match ty {
        Type::Array(element, annotations) => {
            emit(lowerer, annotations, target, path, out);
            path.push(TypePathStep::Array);
            collect(lowerer, element, target, path, out);
            path.pop();
        }
        Type::Class(class_ty) => {
            let mut nested_depth = 0usize;
            for (link_index, link) in class_ty.path.iter().enumerate() {
                if link_index > 0 {
                    path.push(TypePathStep::Nested);
                    nested_depth += 1;
                }
                emit(lowerer, &link.annotations, target, path, out);
                for (arg_index, arg) in link.args.iter().enumerate() {
                    path.push(TypePathStep::TypeArgument(arg_index as u8));
                    collect(lowerer, arg, target, path, out);
                    path.pop();
                }
            }
            for _ in 0..nested_depth {
                path.pop();
            }
        }
        Type::Wildcard(wild) => {
            emit(lowerer, &wild.annotations, target, path, out);
            let bound = match &wild.bound {
                WildBoundTy::Upper(bound) | WildBoundTy::Lower(bound) => Some(bound),
                WildBoundTy::None => None,
            };
            if let Some(bound) = bound {
                path.push(TypePathStep::Wildcard);
                collect(lowerer, bound, target, path, out);
                path.pop();
            }
        }
        Type::TyVar(_, annotations) => emit(lowerer, annotations, target, path, out),
        Type::Primitive(_, annotations) => emit(lowerer, annotations, target, path, out),
        Type::Void | Type::Error | Type::Intersection(_) => {}
    }
}

fn emit(
    lowerer: &Lowerer<'_>,
    annotations: &[AnnoValue],
    target: TargetInfo,
    path: &[TypePathStep],
    out: &mut Vec<TypeAnnotationItem>,
) {
    for anno in annotations {
        if let Some(item) = lowerer.annotation_item(anno) {
            out.push(TypeAnnotationItem {
                target,
                path: path.to_vec(),
                annotation: item,
            });
        }
    }
}
