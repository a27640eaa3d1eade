//! Constant evaluation.
//!
//! Compile-time constants fold with Java semantics: binary numeric
//! promotion, wrapping integer arithmetic, masked shifts, left-to-right
//! string concatenation, and assignment narrowing of in-range `int`
//! constants to `byte`/`short`/`char`. Cross-class constant references are
//! resolved on demand through a memo; a "being evaluated" set turns cycles
//! into `CyclicConstant` diagnostics instead of stack overflows.
//!
//! Anything non-constant simply evaluates to `None` — a field initialiser
//! that is not a constant expression is an ordinary run-time initialiser,
//! not an error.

use crate::phases::Binder;
use crate::resolve::{ResolvedName, ScopeCtx};
use javelin_common::DiagnosticKind;
use javelin_common::names as bn;
use javelin_model::{ClassSym, Const, FieldSym, PrimTy, Type};
use javelin_parser::ast::{self, BinOp, Expr, Lit, UnaryOp};
use rustc_hash::FxHashSet;
use tracing::trace;

impl<'a> Binder<'a> {
    /// Phase 5 driver: force every source field initialiser.
    pub fn constants(&mut self) {
        let mut results: Vec<(ClassSym, usize, Const)> = Vec::new();
        for (&sym, bound) in &self.bound {
            for (field_idx, field) in bound.fields.iter().enumerate() {
                if let Some(value) = self.field_constant(field.sym) {
                    results.push((sym, field_idx, value));
                }
            }
        }
        for (sym, field_idx, value) in results {
            let bound = self.bound.get_mut(&sym).expect("bound class");
            let class = std::sync::Arc::make_mut(bound);
            class.fields[field_idx].constant = Some(value);
        }
        trace!("constant evaluation complete");
    }

    /// The folded value of a field, if it is a compile-time constant.
    /// Memoised; safe to call from any phase at or after hierarchy binding.
    pub fn field_constant(&self, field: FieldSym) -> Option<Const> {
        if let Some(found) = self.const_memo.borrow().get(&field) {
            return found.clone();
        }
        // Classpath constants come pre-folded.
        if !self.decls.contains_key(&field.owner) && !self.field_inits.contains_key(&field) {
            let loaded = self.classpath_class(field.owner)?;
            let name = self.names.resolve(field.name);
            return loaded.field(&name).and_then(|f| f.constant.clone());
        }
        if !self.const_stack.borrow_mut().insert(field) {
            let init = self.field_inits.get(&field)?;
            self.report(
                init.unit,
                init.decl.name.span,
                DiagnosticKind::CyclicConstant(init.decl.name.name.clone()),
            );
            self.const_memo.borrow_mut().insert(field, None);
            return None;
        }
        let result = self.evaluate_field(field);
        self.const_stack.borrow_mut().remove(&field);
        self.const_memo.borrow_mut().insert(field, result.clone());
        result
    }

    fn evaluate_field(&self, field: FieldSym) -> Option<Const> {
        let init = self.field_inits.get(&field)?.clone();
        let expr = init.decl.init.as_ref()?;
        let ctx = ScopeCtx::of(init.class, init.unit);
        let value = self.eval_expr(&ctx, expr)?;
        // The folded value's type is the declared type, after conversion.
        let declared = self.declared_const_type(field)?;
        convert_assignment(value, declared)
    }

    /// The declared type of a potentially-constant field, as a primitive or
    /// `String`. Falls back to a lightweight AST read when the owner has
    /// not reached member binding yet.
    fn declared_const_type(&self, field: FieldSym) -> Option<ConstTarget> {
        if let Some(bound) = self.bound.get(&field.owner) {
            let name = self.names.resolve(field.name);
            if let Some(info) = bound.field(&name) {
                return const_target_of(&info.ty, self);
            }
        }
        let init = self.field_inits.get(&field)?;
        if !init.decl.extra_dims.is_empty() {
            return None;
        }
        match &init.decl.ty {
            ast::Ty::Primitive { kind, .. } => Some(ConstTarget::Prim(crate::resolve::prim_of(*kind))),
            ast::Ty::Named { segments, .. } => {
                let last = segments.last()?;
                if last.name.name == "String" {
                    Some(ConstTarget::Str)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Expression evaluation
    // ------------------------------------------------------------------

    pub fn eval_expr(&self, ctx: &ScopeCtx<'_>, expr: &Expr) -> Option<Const> {
        match expr {
            Expr::Literal { value, .. } => literal_const(value),
            Expr::Name { segments, .. } => self.eval_name(ctx, segments),
            Expr::ClassLit { ty, .. } => {
                let resolved = self.resolve_type(ctx, ty);
                if resolved.is_error() {
                    return None;
                }
                Some(Const::Class(resolved))
            }
            Expr::Unary { op, operand, .. } => {
                let value = self.eval_expr(ctx, operand)?;
                eval_unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let left = self.eval_expr(ctx, lhs)?;
                let right = self.eval_expr(ctx, rhs)?;
                eval_binary(*op, left, right)
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
                ..
            } => {
                let cond = self.eval_expr(ctx, cond)?;
                let then = self.eval_expr(ctx, then)?;
                let otherwise = self.eval_expr(ctx, otherwise)?;
                match cond {
                    Const::Bool(true) => Some(then),
                    Const::Bool(false) => Some(otherwise),
                    _ => None,
                }
            }
            Expr::Cast { ty, operand, .. } => {
                let value = self.eval_expr(ctx, operand)?;
                self.eval_cast(ctx, ty, value)
            }
            Expr::ArrayInit { elements, .. } => {
                let values: Option<Vec<Const>> = elements
                    .iter()
                    .map(|element| self.eval_expr(ctx, element))
                    .collect();
                Some(Const::Array(values?))
            }
            Expr::Annotation(anno) => self.eval_annotation(ctx, anno).map(Const::Annotation),
        }
    }

    /// A dotted name in constant position: a constant field of this class,
    /// a static import, or a `Type.FIELD` reference (including enum
    /// constants).
    fn eval_name(&self, ctx: &ScopeCtx<'_>, segments: &[ast::Ident]) -> Option<Const> {
        if segments.len() == 1 {
            let simple = &segments[0].name;
            if let Some(field) = self.find_field(ctx.class, simple) {
                return self.field_value(field);
            }
            return self.static_import_field(ctx, simple);
        }
        // Longest type prefix, then a field of it.
        let (class_part, field_name) = segments.split_at(segments.len() - 1);
        let field_name = &field_name[0].name;
        if let Some(ResolvedName::Class(owner)) = self.resolve_name(ctx, class_part) {
            if let Some(field) = self.find_field(owner, field_name) {
                return self.field_value(field);
            }
        }
        None
    }

    /// The value of a resolved field: its constant, or an enum-constant
    /// reference (usable in annotation values though not foldable).
    fn field_value(&self, field: FieldSym) -> Option<Const> {
        if let Some(value) = self.field_constant(field) {
            return Some(value);
        }
        if self.field_is_enum_constant(field) {
            return Some(Const::EnumConst(field));
        }
        None
    }

    fn field_is_enum_constant(&self, field: FieldSym) -> bool {
        let name = self.names.resolve(field.name);
        if let Some(bound) = self.bound.get(&field.owner) {
            return bound
                .field(&name)
                .is_some_and(|f| f.access.contains(javelin_model::AccessFlags::ENUM));
        }
        if let Some(source) = self.decls.get(&field.owner) {
            return source.decl.constants.iter().any(|c| c.name.name == name);
        }
        if let Some(loaded) = self.classpath_class(field.owner) {
            return loaded
                .field(&name)
                .is_some_and(|f| f.access.contains(javelin_model::AccessFlags::ENUM));
        }
        false
    }

    /// Find a static field by walking the class and its supertypes.
    fn find_field(&self, class: ClassSym, name: &str) -> Option<FieldSym> {
        let mut seen = FxHashSet::default();
        let mut queue = vec![class];
        let atom = self.names.intern(name);
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            let field = FieldSym {
                owner: current,
                name: atom,
            };
            if self.field_inits.contains_key(&field) {
                return Some(field);
            }
            if let Some(source) = self.decls.get(&current) {
                let declares = source.decl.constants.iter().any(|c| c.name.name == name)
                    || source.decl.members.iter().any(|m| match m {
                        ast::Member::Field(f) => f.name.name == name,
                        _ => false,
                    });
                if declares {
                    return Some(field);
                }
            } else if let Some(loaded) = self.classpath_class(current) {
                if loaded.field(name).is_some() {
                    return Some(field);
                }
            }
            queue.extend(self.direct_super_syms(current));
        }
        None
    }

    fn static_import_field(&self, ctx: &ScopeCtx<'_>, name: &str) -> Option<Const> {
        let imports = &self.imports[ctx.unit];
        for (simple, segments) in &imports.static_single {
            if simple != name {
                continue;
            }
            let owner = self.resolve_absolute(&segments[..segments.len() - 1])?;
            let field = self.find_field(owner, name)?;
            return self.field_value(field);
        }
        for segments in &imports.static_on_demand {
            if let Some(owner) = self.resolve_absolute(segments) {
                if let Some(field) = self.find_field(owner, name) {
                    if let Some(value) = self.field_value(field) {
                        return Some(value);
                    }
                }
            }
        }
        None
    }

    /// Only casts to a primitive type or to `String` preserve constancy.
    fn eval_cast(&self, ctx: &ScopeCtx<'_>, ty: &ast::Ty, value: Const) -> Option<Const> {
        match ty {
            ast::Ty::Primitive { kind, .. } => {
                cast_primitive(crate::resolve::prim_of(*kind), value)
            }
            ast::Ty::Named { segments, .. } => {
                let resolved = self.resolve_type(ctx, ty);
                let _ = segments;
                match resolved.class_sym() {
                    Some(sym) if self.names.binary_name(sym) == bn::STRING => match value {
                        Const::Str(_) => Some(value),
                        _ => None,
                    },
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// The assignment-context target for constant fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstTarget {
    Prim(PrimTy),
    Str,
}

fn const_target_of(ty: &Type, binder: &Binder<'_>) -> Option<ConstTarget> {
    match ty {
        Type::Primitive(kind, _) => Some(ConstTarget::Prim(*kind)),
        Type::Class(class_ty) => {
            if binder.names.binary_name(class_ty.sym()) == bn::STRING {
                Some(ConstTarget::Str)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn literal_const(lit: &Lit) -> Option<Const> {
    Some(match lit {
        Lit::Int(v) => Const::Int(*v),
        Lit::Long(v) => Const::Long(*v),
        Lit::Float(v) => Const::Float(*v),
        Lit::Double(v) => Const::Double(*v),
        Lit::Char(v) => Const::Char(*v),
        Lit::Str(v) => Const::Str(v.clone()),
        Lit::Bool(v) => Const::Bool(*v),
        Lit::Null => return None,
    })
}

// ---------------------------------------------------------------------------
// Promotion and folding
// ---------------------------------------------------------------------------

/// Unary numeric promotion: byte/short/char to int.
fn promote_unary(value: Const) -> Const {
    match value {
        Const::Byte(v) => Const::Int(v as i32),
        Const::Short(v) => Const::Int(v as i32),
        Const::Char(v) => Const::Int(v as i32),
        other => other,
    }
}

fn as_f64(value: &Const) -> Option<f64> {
    Some(match value {
        Const::Int(v) => *v as f64,
        Const::Long(v) => *v as f64,
        Const::Float(v) => *v as f64,
        Const::Double(v) => *v,
        _ => return None,
    })
}

fn as_f32(value: &Const) -> Option<f32> {
    Some(match value {
        Const::Int(v) => *v as f32,
        Const::Long(v) => *v as f32,
        Const::Float(v) => *v,
        _ => return None,
    })
}

fn as_i64(value: &Const) -> Option<i64> {
    Some(match value {
        Const::Int(v) => *v as i64,
        Const::Long(v) => *v,
        _ => return None,
    })
}

fn eval_unary(op: UnaryOp, value: Const) -> Option<Const> {
    let value = promote_unary(value);
    Some(match (op, value) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Neg, Const::Int(v)) => Const::Int(v.wrapping_neg()),
        (UnaryOp::Neg, Const::Long(v)) => Const::Long(v.wrapping_neg()),
        (UnaryOp::Neg, Const::Float(v)) => Const::Float(-v),
        (UnaryOp::Neg, Const::Double(v)) => Const::Double(-v),
        (UnaryOp::Not, Const::Bool(v)) => Const::Bool(!v),
        (UnaryOp::BitNot, Const::Int(v)) => Const::Int(!v),
        (UnaryOp::BitNot, Const::Long(v)) => Const::Long(!v),
        _ => return None,
    })
}

/// Render a constant the way Java's string concatenation would.
fn java_string_of(value: &Const) -> Option<String> {
    Some(match value {
        Const::Bool(v) => v.to_string(),
        Const::Byte(v) => v.to_string(),
        Const::Short(v) => v.to_string(),
        Const::Int(v) => v.to_string(),
        Const::Long(v) => v.to_string(),
        Const::Char(v) => char::from_u32(*v as u32).unwrap_or('\u{FFFD}').to_string(),
        Const::Float(v) => java_float_string(*v as f64),
        Const::Double(v) => java_float_string(*v),
        Const::Str(v) => v.clone(),
        _ => return None,
    })
}

/// Approximates `Double.toString`: integral values print with a trailing
/// `.0`.
fn java_float_string(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e7 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn eval_binary(op: BinOp, left: Const, right: Const) -> Option<Const> {
    // String concatenation wins before numeric promotion.
    if op == BinOp::Add {
        if matches!(left, Const::Str(_)) || matches!(right, Const::Str(_)) {
            let mut out = java_string_of(&left)?;
            out.push_str(&java_string_of(&right)?);
            return Some(Const::Str(out));
        }
    }
    match op {
        BinOp::And | BinOp::Or => {
            let (Const::Bool(l), Const::Bool(r)) = (&left, &right) else {
                return None;
            };
            return Some(Const::Bool(if op == BinOp::And {
                *l && *r
            } else {
                *l || *r
            }));
        }
        BinOp::Shl | BinOp::Shr | BinOp::Ushr => return eval_shift(op, left, right),
        _ => {}
    }
    // Boolean bitwise ops.
    if let (Const::Bool(l), Const::Bool(r)) = (&left, &right) {
        return Some(match op {
            BinOp::BitAnd => Const::Bool(*l & *r),
            BinOp::BitOr => Const::Bool(*l | *r),
            BinOp::BitXor => Const::Bool(*l ^ *r),
            BinOp::Eq => Const::Bool(l == r),
            BinOp::Ne => Const::Bool(l != r),
            _ => return None,
        });
    }
    if let (Const::Str(l), Const::Str(r)) = (&left, &right) {
        return Some(match op {
            BinOp::Eq => Const::Bool(l == r),
            BinOp::Ne => Const::Bool(l != r),
            _ => return None,
        });
    }
    let left = promote_unary(left);
    let right = promote_unary(right);
    // Binary numeric promotion, widest first.
    if matches!(left, Const::Double(_)) || matches!(right, Const::Double(_)) {
        let l = as_f64(&left)?;
        let r = as_f64(&right)?;
        return fold_double(op, l, r);
    }
    if matches!(left, Const::Float(_)) || matches!(right, Const::Float(_)) {
        let l = as_f32(&left)?;
        let r = as_f32(&right)?;
        return fold_float(op, l, r);
    }
    if matches!(left, Const::Long(_)) || matches!(right, Const::Long(_)) {
        let l = as_i64(&left)?;
        let r = as_i64(&right)?;
        return fold_long(op, l, r);
    }
    let (Const::Int(l), Const::Int(r)) = (left, right) else {
        return None;
    };
    fold_int(op, l, r)
}

fn eval_shift(op: BinOp, left: Const, right: Const) -> Option<Const> {
    // Shift operands promote independently; the distance is masked.
    let left = promote_unary(left);
    let distance = match promote_unary(right) {
        Const::Int(v) => v as i64,
        Const::Long(v) => v,
        _ => return None,
    };
    Some(match left {
        Const::Int(v) => {
            let d = (distance & 0x1F) as u32;
            Const::Int(match op {
                BinOp::Shl => v.wrapping_shl(d),
                BinOp::Shr => v.wrapping_shr(d),
                BinOp::Ushr => ((v as u32).wrapping_shr(d)) as i32,
                _ => return None,
            })
        }
        Const::Long(v) => {
            let d = (distance & 0x3F) as u32;
            Const::Long(match op {
                BinOp::Shl => v.wrapping_shl(d),
                BinOp::Shr => v.wrapping_shr(d),
                BinOp::Ushr => ((v as u64).wrapping_shr(d)) as i64,
                _ => return None,
            })
        }
        _ => return None,
    })
}

fn fold_int(op: BinOp, l: i32, r: i32) -> Option<Const> {
    Some(match op {
        BinOp::Add => Const::Int(l.wrapping_add(r)),
        BinOp::Sub => Const::Int(l.wrapping_sub(r)),
        BinOp::Mul => Const::Int(l.wrapping_mul(r)),
        BinOp::Div => {
            if r == 0 {
                return None;
            }
            Const::Int(l.wrapping_div(r))
        }
        BinOp::Rem => {
            if r == 0 {
                return None;
            }
            Const::Int(l.wrapping_rem(r))
        }
        BinOp::BitAnd => Const::Int(l & r),
        BinOp::BitOr => Const::Int(l | r),
        BinOp::BitXor => Const::Int(l ^ r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Ge => Const::Bool(l >= r),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::Ne => Const::Bool(l != r),
        _ => return None,
    })
}

fn fold_long(op: BinOp, l: i64, r: i64) -> Option<Const> {
    Some(match op {
        BinOp::Add => Const::Long(l.wrapping_add(r)),
        BinOp::Sub => Const::Long(l.wrapping_sub(r)),
        BinOp::Mul => Const::Long(l.wrapping_mul(r)),
        BinOp::Div => {
            if r == 0 {
                return None;
            }
            Const::Long(l.wrapping_div(r))
        }
        BinOp::Rem => {
            if r == 0 {
                return None;
            }
            Const::Long(l.wrapping_rem(r))
        }
        BinOp::BitAnd => Const::Long(l & r),
        BinOp::BitOr => Const::Long(l | r),
        BinOp::BitXor => Const::Long(l ^ r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Ge => Const::Bool(l >= r),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::Ne => Const::Bool(l != r),
        _ => return None,
    })
}

fn fold_float(op: BinOp, l: f32, r: f32) -> Option<Const> {
    Some(match op {
        BinOp::Add => Const::Float(l + r),
        BinOp::Sub => Const::Float(l - r),
        BinOp::Mul => Const::Float(l * r),
        BinOp::Div => Const::Float(l / r),
        BinOp::Rem => Const::Float(l % r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Ge => Const::Bool(l >= r),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::Ne => Const::Bool(l != r),
        _ => return None,
    })
}

fn fold_double(op: BinOp, l: f64, r: f64) -> Option<Const> {
    Some(match op {
        BinOp::Add => Const::Double(l + r),
        BinOp::Sub => Const::Double(l - r),
        BinOp::Mul => Const::Double(l * r),
        BinOp::Div => Const::Double(l / r),
        BinOp::Rem => Const::Double(l % r),
        BinOp::Lt => Const::Bool(l < r),
        BinOp::Gt => Const::Bool(l > r),
        BinOp::Le => Const::Bool(l <= r),
        BinOp::Ge => Const::Bool(l >= r),
        BinOp::Eq => Const::Bool(l == r),
        BinOp::Ne => Const::Bool(l != r),
        _ => return None,
    })
}

/// Java casts to a primitive type.
pub fn cast_primitive(target: PrimTy, value: Const) -> Option<Const> {
    if target == PrimTy::Boolean {
        return match value {
            Const::Bool(_) => Some(value),
            _ => None,
        };
    }
    // Via double for floating sources, via i64 for integral ones.
    let as_long: i64 = match value {
        Const::Byte(v) => v as i64,
        Const::Short(v) => v as i64,
        Const::Char(v) => v as i64,
        Const::Int(v) => v as i64,
        Const::Long(v) => v,
        Const::Float(v) => return float_to(target, v as f64),
        Const::Double(v) => return float_to(target, v),
        _ => return None,
    };
    Some(match target {
        PrimTy::Byte => Const::Byte(as_long as i8),
        PrimTy::Short => Const::Short(as_long as i16),
        PrimTy::Char => Const::Char(as_long as u16),
        PrimTy::Int => Const::Int(as_long as i32),
        PrimTy::Long => Const::Long(as_long),
        PrimTy::Float => Const::Float(as_long as f32),
        PrimTy::Double => Const::Double(as_long as f64),
        PrimTy::Boolean => unreachable!("handled above"),
    })
}

/// A floating value cast to `target`, with Java's saturating
/// float-to-integral conversion.
fn float_to(target: PrimTy, value: f64) -> Option<Const> {
    Some(match target {
        PrimTy::Float => Const::Float(value as f32),
        PrimTy::Double => Const::Double(value),
        PrimTy::Long => Const::Long(value as i64),
        PrimTy::Int => Const::Int(value as i32),
        PrimTy::Byte => Const::Byte((value as i32) as i8),
        PrimTy::Short => Const::Short((value as i32) as i16),
        PrimTy::Char => Const::Char((value as i32) as u16),
        PrimTy::Boolean => return None,
    })
}

/// Assignment conversion of a folded value to the declared field type:
/// widening always, narrowing only for in-range `int`-family constants.
pub fn convert_assignment(value: Const, target: ConstTarget) -> Option<Const> {
    let target = match target {
        ConstTarget::Str => {
            return match value {
                Const::Str(_) => Some(value),
                _ => None,
            };
        }
        ConstTarget::Prim(p) => p,
    };
    if target == PrimTy::Boolean {
        return match value {
            Const::Bool(_) => Some(value),
            _ => None,
        };
    }
    let int_value = match &value {
        Const::Byte(v) => Some(*v as i64),
        Const::Short(v) => Some(*v as i64),
        Const::Char(v) => Some(*v as i64),
        Const::Int(v) => Some(*v as i64),
        _ => None,
    };
    match target {
        PrimTy::Byte => {
            let v = int_value?;
            (i8::MIN as i64..=i8::MAX as i64)
                .contains(&v)
                .then(|| Const::Byte(v as i8))
        }
        PrimTy::Short => {
            let v = int_value?;
            (i16::MIN as i64..=i16::MAX as i64)
                .contains(&v)
                .then(|| Const::Short(v as i16))
        }
        PrimTy::Char => {
            let v = int_value?;
            (0..=u16::MAX as i64).contains(&v).then(|| Const::Char(v as u16))
        }
        PrimTy::Int => Some(Const::Int(int_value? as i32)),
        PrimTy::Long => match value {
            Const::Long(_) => Some(value),
            _ => Some(Const::Long(int_value?)),
        },
        PrimTy::Float => Some(match value {
            Const::Float(_) => value,
            Const::Long(v) => Const::Float(v as f32),
            _ => Const::Float(int_value? as f32),
        }),
        PrimTy::Double => Some(match value {
            Const::Double(_) => value,
            Const::Float(v) => Const::Double(v as f64),
            Const::Long(v) => Const::Double(v as f64),
            _ => Const::Double(int_value? as f64),
        }),
        PrimTy::Boolean => None,
    }
}
