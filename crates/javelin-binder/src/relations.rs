//! Erasure, descriptors, and type relations.
//!
//! The relation predicates back the annotation-processing bridge
//! (`isSameType`, `isSubtype`, `isAssignable`, `contains`,
//! `isSubsignature`, `erasure`, `asMemberOf`, `directSupertypes`,
//! `capture`, `boxedClass`, `unboxedType`). They operate on bound types
//! through a complete environment; unresolvable pieces degrade to the
//! error type, which relates leniently so processors are not flooded with
//! secondary failures.

use crate::FullEnv;
use crate::phases::Binder;
use javelin_common::names as bn;
use javelin_model::{
    ClassSym, ClassTy, Env, MethodInfo, Names, PrimTy, SimpleClassTy, TyParam, TyVarOwner,
    TyVarSym, Type, WildBoundTy, types::WildTy,
};
use rustc_hash::{FxHashMap, FxHashSet};

// ---------------------------------------------------------------------------
// Erased descriptors (binder-internal, used while minting method symbols)
// ---------------------------------------------------------------------------

pub fn erased_descriptor_of(binder: &Binder<'_>, ty: &Type) -> String {
    let mut out = String::new();
    write_erased(binder, &[], ty, &mut out);
    out
}

pub fn erased_method_descriptor(
    binder: &Binder<'_>,
    local_typarams: &[TyParam],
    params: &[Type],
    ret: &Type,
) -> String {
    let mut out = String::from("(");
    for param in params {
        write_erased(binder, local_typarams, param, &mut out);
    }
    out.push(')');
    write_erased(binder, local_typarams, ret, &mut out);
    out
}

fn write_erased(binder: &Binder<'_>, local: &[TyParam], ty: &Type, out: &mut String) {
    match ty {
        Type::Primitive(kind, _) => out.push(kind.descriptor()),
        Type::Void => out.push('V'),
        Type::Array(element, _) => {
            out.push('[');
            write_erased(binder, local, element, out);
        }
        Type::Class(class_ty) => {
            out.push('L');
            out.push_str(&binder.names.binary_name(class_ty.sym()));
            out.push(';');
        }
        Type::TyVar(sym, _) => {
            let bound = binder_tyvar_bound(binder, local, *sym)
                .unwrap_or_else(|| Type::class(binder.names.class(bn::OBJECT)));
            write_erased(binder, local, &bound, out);
        }
        Type::Intersection(bounds) => match bounds.first() {
            Some(first) => write_erased(binder, local, first, out),
            None => {
                out.push('L');
                out.push_str(bn::OBJECT);
                out.push(';');
            }
        },
        Type::Wildcard(_) | Type::Error => {
            out.push('L');
            out.push_str(bn::OBJECT);
            out.push(';');
        }
    }
}

/// The first upper bound of a type variable, looking at the local
/// (in-flight) list first, then the phase maps.
fn binder_tyvar_bound(binder: &Binder<'_>, local: &[TyParam], sym: TyVarSym) -> Option<Type> {
    if let Some(param) = local.iter().find(|p| p.sym == sym) {
        return param.bounds.first().cloned();
    }
    let class = sym.owner.class();
    match sym.owner {
        TyVarOwner::Class(_) => {
            if let Some(hierarchy) = binder.hierarchies.get(&class) {
                return hierarchy
                    .type_params
                    .iter()
                    .find(|p| p.sym == sym)
                    .and_then(|p| p.bounds.first().cloned());
            }
            let loaded = binder.classpath_class(class)?;
            loaded
                .type_params
                .iter()
                .find(|p| p.sym == sym)
                .and_then(|p| p.bounds.first().cloned())
        }
        TyVarOwner::Method(..) => {
            let bound = binder.bound.get(&class).cloned().or_else(|| binder.classpath_class(class))?;
            for method in &bound.methods {
                if let Some(param) = method.type_params.iter().find(|p| p.sym == sym) {
                    return param.bounds.first().cloned();
                }
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Type operations over a complete environment
// ---------------------------------------------------------------------------

pub struct TypeOps<'e> {
    pub env: &'e FullEnv<'e>,
}

impl<'e> TypeOps<'e> {
    pub fn new(env: &'e FullEnv<'e>) -> Self {
        TypeOps { env }
    }

    fn names(&self) -> &Names {
        self.env.names
    }

    fn object(&self) -> Type {
        Type::class(self.names().class(bn::OBJECT))
    }

    fn tyvar_bounds(&self, sym: TyVarSym) -> Vec<Type> {
        let class = sym.owner.class();
        let Some(bound) = self.env.entry(class) else {
            return Vec::new();
        };
        match sym.owner {
            TyVarOwner::Class(_) => bound
                .type_params
                .iter()
                .find(|p| p.sym == sym)
                .map(|p| p.bounds.clone())
                .unwrap_or_default(),
            TyVarOwner::Method(..) => {
                for method in &bound.methods {
                    if let Some(param) = method.type_params.iter().find(|p| p.sym == sym) {
                        return param.bounds.clone();
                    }
                }
                Vec::new()
            }
        }
    }

    // -- erasure -------------------------------------------------------

    pub fn erasure(&self, ty: &Type) -> Type {
        match ty {
            Type::Primitive(kind, _) => Type::Primitive(*kind, Vec::new()),
            Type::Void => Type::Void,
            Type::Error => Type::Error,
            Type::Array(element, _) => Type::Array(Box::new(self.erasure(element)), Vec::new()),
            Type::Class(class_ty) => Type::class(class_ty.sym()),
            Type::TyVar(sym, _) => match self.tyvar_bounds(*sym).first() {
                Some(bound) => self.erasure(bound),
                None => self.object(),
            },
            Type::Intersection(bounds) => match bounds.first() {
                Some(first) => self.erasure(first),
                None => self.object(),
            },
            Type::Wildcard(wild) => match &wild.bound {
                WildBoundTy::Upper(bound) => self.erasure(bound),
                _ => self.object(),
            },
        }
    }

    // -- identity ------------------------------------------------------

    /// `isSameType`; wildcards are never the same type as anything,
    /// including themselves.
    pub fn is_same_type(&self, a: &Type, b: &Type) -> bool {
        if matches!(a, Type::Wildcard(_)) || matches!(b, Type::Wildcard(_)) {
            return false;
        }
        a.same_type(b)
    }

    // -- supertypes ----------------------------------------------------

    /// Instantiated direct supertypes of a type.
    pub fn direct_supertypes(&self, ty: &Type) -> Vec<Type> {
        match ty {
            Type::Class(class_ty) => {
                let sym = class_ty.sym();
                let Some(bound) = self.env.entry(sym) else {
                    return vec![self.object()];
                };
                let subst = self.substitution(class_ty, &bound.type_params);
                let raw = class_ty.is_raw() && !bound.type_params.is_empty();
                let mut supers = Vec::new();
                for parent in bound.supertype.iter().chain(bound.interfaces.iter()) {
                    let instantiated = if raw {
                        self.erasure(parent)
                    } else {
                        substitute(parent, &subst)
                    };
                    if !matches!(instantiated, Type::Error) {
                        supers.push(instantiated);
                    }
                }
                supers
            }
            Type::Array(element, _) => {
                let mut supers = vec![
                    self.object(),
                    Type::class(self.names().class("java/lang/Cloneable")),
                    Type::class(self.names().class("java/io/Serializable")),
                ];
                for parent in self.direct_supertypes(element) {
                    supers.push(Type::Array(Box::new(parent), Vec::new()));
                }
                supers
            }
            Type::TyVar(sym, _) => {
                let bounds = self.tyvar_bounds(*sym);
                if bounds.is_empty() {
                    vec![self.object()]
                } else {
                    bounds
                }
            }
            Type::Intersection(bounds) => bounds.clone(),
            _ => Vec::new(),
        }
    }

    // -- subtyping -----------------------------------------------------

    pub fn is_subtype(&self, a: &Type, b: &Type) -> bool {
        if a.is_error() || b.is_error() {
            return true;
        }
        if self.is_same_type(a, b) {
            return true;
        }
        match (a, b) {
            (Type::Primitive(pa, _), Type::Primitive(pb, _)) => primitive_subtype(*pa, *pb),
            (Type::Primitive(..), _) | (_, Type::Primitive(..)) => false,
            (Type::Array(ea, _), Type::Array(eb, _)) => match (ea.as_ref(), eb.as_ref()) {
                (Type::Primitive(pa, _), Type::Primitive(pb, _)) => pa == pb,
                (sa, sb) => self.is_subtype(sa, sb),
            },
            (_, Type::Class(target)) if self.is_object(target) => {
                !matches!(a, Type::Primitive(..) | Type::Void)
            }
            (_, Type::Class(target)) => self.class_supertype_matches(a, target, &mut FxHashSet::default()),
            (Type::TyVar(sym, _), _) => self
                .tyvar_bounds(*sym)
                .iter()
                .any(|bound| self.is_subtype(bound, b)),
            _ => false,
        }
    }

    fn is_object(&self, ty: &ClassTy) -> bool {
        self.names().binary_name(ty.sym()) == bn::OBJECT
    }

    /// Walk `a`'s supertype closure looking for an instantiation of
    /// `target`'s class whose arguments are contained by `target`'s.
    fn class_supertype_matches(
        &self,
        a: &Type,
        target: &ClassTy,
        seen: &mut FxHashSet<ClassSym>,
    ) -> bool {
        if let Type::Class(from) = a {
            if from.sym() == target.sym() {
                return self.args_contained(from, target);
            }
            if !seen.insert(from.sym()) {
                return false;
            }
        }
        self.direct_supertypes(a)
            .iter()
            .any(|parent| self.class_supertype_matches(parent, target, seen))
    }

    /// Do `target`'s type arguments contain `from`'s, link by link?
    fn args_contained(&self, from: &ClassTy, target: &ClassTy) -> bool {
        // Raw target accepts anything (unchecked); raw source only matches
        // raw target.
        if target.is_raw() {
            return true;
        }
        if from.is_raw() {
            return false;
        }
        let from_args: Vec<&Type> = from.path.iter().flat_map(|s| s.args.iter()).collect();
        let target_args: Vec<&Type> = target.path.iter().flat_map(|s| s.args.iter()).collect();
        if from_args.len() != target_args.len() {
            return false;
        }
        from_args
            .iter()
            .zip(&target_args)
            .all(|(f, t)| self.contains(t, f))
    }

    // -- containment ---------------------------------------------------

    /// `contains` (JLS 4.5.1): does type argument `a` contain `b`?
    pub fn contains(&self, a: &Type, b: &Type) -> bool {
        match a {
            Type::Wildcard(wild) => match &wild.bound {
                WildBoundTy::None => true,
                WildBoundTy::Upper(upper) => match b {
                    Type::Wildcard(inner) => match &inner.bound {
                        WildBoundTy::Upper(inner_upper) => self.is_subtype(inner_upper, upper),
                        WildBoundTy::None => self.is_same_type(upper.as_ref(), &self.object()),
                        WildBoundTy::Lower(_) => self.is_same_type(upper.as_ref(), &self.object()),
                    },
                    other => self.is_subtype(other, upper),
                },
                WildBoundTy::Lower(lower) => match b {
                    Type::Wildcard(inner) => match &inner.bound {
                        WildBoundTy::Lower(inner_lower) => self.is_subtype(lower, inner_lower),
                        _ => false,
                    },
                    other => self.is_subtype(lower, other),
                },
            },
            _ => self.is_same_type(a, b),
        }
    }

    // -- assignability -------------------------------------------------

    pub fn is_assignable(&self, a: &Type, b: &Type) -> bool {
        if self.is_subtype(a, b) {
            return true;
        }
        match (a, b) {
            // Boxing.
            (Type::Primitive(prim, _), Type::Class(_)) => {
                let boxed = Type::class(self.boxed_class(*prim));
                self.is_subtype(&boxed, b)
            }
            // Unboxing plus widening.
            (Type::Class(class_ty), Type::Primitive(target, _)) => {
                match self.unboxed_type(class_ty.sym()) {
                    Some(prim) => prim == *target || primitive_subtype(prim, *target),
                    None => false,
                }
            }
            _ => false,
        }
    }

    // -- signatures ----------------------------------------------------

    /// `isSubsignature`: the erasure of `m1`'s parameter list equals
    /// `m2`'s (the type-parameter-adaptation case collapses to this after
    /// erasure).
    pub fn is_subsignature(&self, m1: &MethodInfo, m2: &MethodInfo) -> bool {
        if m1.name != m2.name || m1.params.len() != m2.params.len() {
            return false;
        }
        m1.params.iter().zip(&m2.params).all(|(p1, p2)| {
            self.is_same_type(&self.erasure(&p1.ty), &self.erasure(&p2.ty))
        })
    }

    // -- capture -------------------------------------------------------

    /// Capture conversion: fresh type variables for wildcard arguments.
    pub fn capture(&self, ty: &Type) -> Type {
        let Type::Class(class_ty) = ty else {
            return ty.clone();
        };
        if !class_ty
            .path
            .iter()
            .any(|s| s.args.iter().any(|arg| matches!(arg, Type::Wildcard(_))))
        {
            return ty.clone();
        }
        let owner = class_ty.sym();
        let mut fresh_index = 0u32;
        let path = class_ty
            .path
            .iter()
            .map(|simple| SimpleClassTy {
                sym: simple.sym,
                annotations: simple.annotations.clone(),
                args: simple
                    .args
                    .iter()
                    .map(|arg| match arg {
                        Type::Wildcard(_) => {
                            // Fresh variables use indices counting down from
                            // the top so they never collide with declared
                            // parameters.
                            let sym = TyVarSym {
                                owner: TyVarOwner::Class(owner),
                                name: self.names().intern("CAP"),
                                index: u32::MAX - fresh_index,
                            };
                            fresh_index += 1;
                            Type::TyVar(sym, Vec::new())
                        }
                        other => {
                            fresh_index += 1;
                            other.clone()
                        }
                    })
                    .collect(),
            })
            .collect();
        Type::Class(ClassTy { path })
    }

    // -- members -------------------------------------------------------

    /// `asMemberOf`: view a member's type with the receiver's type
    /// arguments substituted in.
    pub fn as_member_of(&self, receiver: &ClassTy, member_owner: ClassSym, ty: &Type) -> Type {
        // Find the instantiation of `member_owner` in the receiver's
        // supertype closure, then substitute.
        let mut queue = vec![Type::Class(receiver.clone())];
        let mut seen = FxHashSet::default();
        while let Some(current) = queue.pop() {
            if let Type::Class(class_ty) = &current {
                if !seen.insert(class_ty.sym()) {
                    continue;
                }
                if class_ty.sym() == member_owner {
                    let Some(bound) = self.env.entry(member_owner) else {
                        return ty.clone();
                    };
                    let subst = self.substitution(class_ty, &bound.type_params);
                    return substitute(ty, &subst);
                }
            }
            queue.extend(self.direct_supertypes(&current));
        }
        ty.clone()
    }

    // -- boxing --------------------------------------------------------

    pub fn boxed_class(&self, prim: PrimTy) -> ClassSym {
        self.names().class(prim.boxed_binary_name())
    }

    pub fn unboxed_type(&self, sym: ClassSym) -> Option<PrimTy> {
        let name = self.names().binary_name(sym);
        Some(match name.as_str() {
            "java/lang/Boolean" => PrimTy::Boolean,
            "java/lang/Byte" => PrimTy::Byte,
            "java/lang/Short" => PrimTy::Short,
            "java/lang/Integer" => PrimTy::Int,
            "java/lang/Long" => PrimTy::Long,
            "java/lang/Character" => PrimTy::Char,
            "java/lang/Float" => PrimTy::Float,
            "java/lang/Double" => PrimTy::Double,
            _ => return None,
        })
    }

    // -- substitution --------------------------------------------------

    fn substitution(
        &self,
        class_ty: &ClassTy,
        type_params: &[TyParam],
    ) -> FxHashMap<TyVarSym, Type> {
        let args: Vec<&Type> = class_ty.path.iter().flat_map(|s| s.args.iter()).collect();
        type_params
            .iter()
            .zip(args)
            .map(|(param, arg)| (param.sym, arg.clone()))
            .collect()
    }
}

/// Apply a type-variable substitution.
pub fn substitute(ty: &Type, subst: &FxHashMap<TyVarSym, Type>) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TyVar(sym, annos) => match subst.get(sym) {
            Some(replacement) => replacement.clone(),
            None => Type::TyVar(*sym, annos.clone()),
        },
        Type::Array(element, annos) => {
            Type::Array(Box::new(substitute(element, subst)), annos.clone())
        }
        Type::Class(class_ty) => Type::Class(ClassTy {
            path: class_ty
                .path
                .iter()
                .map(|simple| SimpleClassTy {
                    sym: simple.sym,
                    annotations: simple.annotations.clone(),
                    args: simple.args.iter().map(|arg| substitute(arg, subst)).collect(),
                })
                .collect(),
        }),
        Type::Wildcard(wild) => Type::Wildcard(WildTy {
            bound: match &wild.bound {
                WildBoundTy::None => WildBoundTy::None,
                WildBoundTy::Upper(upper) => {
                    WildBoundTy::Upper(Box::new(substitute(upper, subst)))
                }
                WildBoundTy::Lower(lower) => {
                    WildBoundTy::Lower(Box::new(substitute(lower, subst)))
                }
            },
            annotations: wild.annotations.clone(),
        }),
        Type::Intersection(bounds) => Type::Intersection(
            bounds.iter().map(|bound| substitute(bound, subst)).collect(),
        ),
        other => other.clone(),
    }
}

/// Primitive subtyping per JLS 4.10.1.
fn primitive_subtype(a: PrimTy, b: PrimTy) -> bool {
    use PrimTy::*;
    if a == b {
        return true;
    }
    let order = |p: PrimTy| -> Option<u8> {
        Some(match p {
            Byte => 0,
            Short => 1,
            Int => 2,
            Long => 3,
            Float => 4,
            Double => 5,
            Char | Boolean => return None,
        })
    };
    match (a, b) {
        (Char, Int | Long | Float | Double) => true,
        _ => match (order(a), order(b)) {
            (Some(x), Some(y)) => x < y,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::primitive_subtype;
    use javelin_model::PrimTy::*;

    #[test]
    fn primitive_widening_chain() {
        assert!(primitive_subtype(Byte, Int));
        assert!(primitive_subtype(Int, Double));
        assert!(primitive_subtype(Char, Int));
        assert!(!primitive_subtype(Int, Char));
        assert!(!primitive_subtype(Boolean, Int));
        assert!(!primitive_subtype(Long, Int));
        assert!(primitive_subtype(Long, Long));
    }
}
