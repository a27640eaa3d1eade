//! Generic-signature synthesis.
//!
//! A signature is emitted only when it says more than the descriptor: the
//! declaration has type parameters, or a type somewhere in it mentions a
//! type variable or a parameterized class. The grammar is the standard
//! class-file form (`TK;`, `Ljava/util/List<+TT;>;`, `[I`).

use crate::Lowerer;
use javelin_common::names as bn;
use javelin_model::{Env, MethodInfo, SourceKind, TyParam, Type, TypeBoundClass, WildBoundTy};

pub(crate) fn class_signature(lowerer: &Lowerer<'_>, class: &TypeBoundClass) -> Option<String> {
    let needs = !class.type_params.is_empty()
        || class.supertype.as_ref().is_some_and(is_generic)
        || class.interfaces.iter().any(is_generic);
    if !needs {
        return None;
    }
    let mut out = String::new();
    write_type_params(lowerer, &class.type_params, &mut out);
    match &class.supertype {
        Some(ty) => write_type(lowerer, ty, &mut out),
        None => out.push_str("Ljava/lang/Object;"),
    }
    for iface in &class.interfaces {
        write_type(lowerer, iface, &mut out);
    }
    Some(out)
}

pub(crate) fn method_signature(lowerer: &Lowerer<'_>, method: &MethodInfo) -> Option<String> {
    let generic_throws = method.throws.iter().any(is_generic);
    let needs = !method.type_params.is_empty()
        || method.params.iter().any(|p| is_generic(&p.ty))
        || is_generic(&method.return_ty)
        || generic_throws;
    if !needs {
        return None;
    }
    let mut out = String::new();
    write_type_params(lowerer, &method.type_params, &mut out);
    out.push('(');
    for param in &method.params {
        write_type(lowerer, &param.ty, &mut out);
    }
    out.push(')');
    write_type(lowerer, &method.return_ty, &mut out);
    if generic_throws {
        for thrown in &method.throws {
            out.push('^');
            write_type(lowerer, thrown, &mut out);
        }
    }
    Some(out)
}

pub(crate) fn field_signature(lowerer: &Lowerer<'_>, ty: &Type) -> Option<String> {
    if !is_generic(ty) {
        return None;
    }
    let mut out = String::new();
    write_type(lowerer, ty, &mut out);
    Some(out)
}

/// Does this type carry information the erased descriptor loses?
pub(crate) fn is_generic(ty: &Type) -> bool {
    match ty {
        Type::TyVar(..) | Type::Wildcard(_) | Type::Intersection(_) => true,
        Type::Array(element, _) => is_generic(element),
        Type::Class(class_ty) => class_ty.path.iter().any(|link| !link.args.is_empty()),
        _ => false,
    }
}

/// Is a type-parameter bound an interface? Decides whether bound index 0
/// (reserved for a class bound) is skipped.
pub(crate) fn bound_is_interface(lowerer: &Lowerer<'_>, bound: &Type) -> bool {
    match bound {
        Type::Class(class_ty) => lowerer
            .env
            .entry(class_ty.sym())
            .map(|b| matches!(b.kind, SourceKind::Interface | SourceKind::Annotation))
            .unwrap_or(false),
        _ => false,
    }
}

fn write_type_params(lowerer: &Lowerer<'_>, params: &[TyParam], out: &mut String) {
    if params.is_empty() {
        return;
    }
    out.push('<');
    for param in params {
        lowerer.names().with(param.sym.name, |name| out.push_str(name));
        out.push(':');
        match param.bounds.first() {
            None => out.push_str("Ljava/lang/Object;"),
            Some(first) if bound_is_interface(lowerer, first) => {
                // Interface-first bound lists leave the class bound empty.
                out.push(':');
                write_type(lowerer, first, out);
            }
            Some(first) => write_type(lowerer, first, out),
        }
        for bound in param.bounds.iter().skip(1) {
            out.push(':');
            write_type(lowerer, bound, out);
        }
    }
    out.push('>');
}

pub(crate) fn write_type(lowerer: &Lowerer<'_>, ty: &Type, out: &mut String) {
    match ty {
        Type::Primitive(kind, _) => out.push(kind.descriptor()),
        Type::Void => out.push('V'),
        Type::Array(element, _) => {
            out.push('[');
            write_type(lowerer, element, out);
        }
        Type::TyVar(sym, _) => {
            out.push('T');
            lowerer.names().with(sym.name, |name| out.push_str(name));
            out.push(';');
        }
        Type::Class(class_ty) => {
            // Fuse the longest argument-free prefix into a binary name;
            // later links use the dotted nested form.
            let split = class_ty
                .path
                .iter()
                .position(|link| !link.args.is_empty())
                .unwrap_or(class_ty.path.len() - 1);
            let head = &class_ty.path[split];
            lowerer.touch(head.sym);
            out.push('L');
            out.push_str(&lowerer.names().binary_name(head.sym));
            write_type_args(lowerer, &head.args, out);
            for link in &class_ty.path[split + 1..] {
                lowerer.touch(link.sym);
                out.push('.');
                let binary = lowerer.names().binary_name(link.sym);
                out.push_str(bn::simple_name_of(&binary));
                write_type_args(lowerer, &link.args, out);
            }
            out.push(';');
        }
        Type::Wildcard(wild) => match &wild.bound {
            // A bare wildcard outside an argument list cannot happen in
            // well-formed input; degrade to its bound.
            WildBoundTy::Upper(bound) => write_type(lowerer, bound, out),
            _ => out.push_str("Ljava/lang/Object;"),
        },
        Type::Intersection(bounds) => match bounds.first() {
            Some(first) => write_type(lowerer, first, out),
            None => out.push_str("Ljava/lang/Object;"),
        },
        Type::Error => out.push_str("Ljava/lang/Object;"),
    }
}

fn write_type_args(lowerer: &Lowerer<'_>, args: &[Type], out: &mut String) {
    if args.is_empty() {
        return;
    }
    out.push('<');
    for arg in args {
        match arg {
            Type::Wildcard(wild) => match &wild.bound {
                WildBoundTy::None => out.push('*'),
                WildBoundTy::Upper(bound) => {
                    out.push('+');
                    write_type(lowerer, bound, out);
                }
                WildBoundTy::Lower(bound) => {
                    out.push('-');
                    write_type(lowerer, bound, out);
                }
            },
            other => write_type(lowerer, other, out),
        }
    }
    out.push('>');
}
