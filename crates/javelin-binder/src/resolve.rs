//! Name and type resolution.
//!
//! The scope visible inside a class `C` cascades: type parameters of `C`
//! and its enclosing classes, then member types of `C` and its supertypes,
//! then single-type imports, then same-package siblings, then on-demand
//! imports (including the implicit `java.lang.*`). The header phase uses a
//! restricted variant of the cascade that ignores type parameters and
//! inherited members, because neither exists yet at that point.

use crate::phases::Binder;
use javelin_common::names as bn;
use javelin_common::{DiagnosticKind, Span};
use javelin_model::{
    AnnoValue, ClassSym, ClassTy, PrimTy, SimpleClassTy, TyParam, TyVarSym, Type, WildBoundTy,
    types::WildTy,
};
use javelin_parser::ast;
use rustc_hash::FxHashSet;

/// Per-compilation-unit import tables, in their four variants.
#[derive(Debug, Default)]
pub struct ImportTable {
    /// `import a.b.C;` — simple name to full dotted segments.
    pub single: Vec<(String, Vec<String>)>,
    /// `import a.b.*;`
    pub on_demand: Vec<Vec<String>>,
    /// `import static a.b.C.F;`
    pub static_single: Vec<(String, Vec<String>)>,
    /// `import static a.b.C.*;`
    pub static_on_demand: Vec<Vec<String>>,
}

impl ImportTable {
    pub fn build(unit: &ast::CompilationUnit) -> Self {
        let mut table = ImportTable::default();
        for import in &unit.imports {
            let segments: Vec<String> = import.name.iter().map(|id| id.name.clone()).collect();
            match (import.is_static, import.on_demand) {
                (false, false) => {
                    let simple = segments.last().cloned().unwrap_or_default();
                    table.single.push((simple, segments));
                }
                (false, true) => table.on_demand.push(segments),
                (true, false) => {
                    let simple = segments.last().cloned().unwrap_or_default();
                    table.static_single.push((simple, segments));
                }
                (true, true) => table.static_on_demand.push(segments),
            }
        }
        table
    }
}

/// The lexical context a name is resolved in.
#[derive(Clone, Copy)]
pub struct ScopeCtx<'s> {
    pub class: ClassSym,
    pub unit: usize,
    /// Type parameters of the enclosing method, when binding inside one.
    pub method_typarams: &'s [TyParam],
    /// Class type parameters still being defined (the F-bounded case), used
    /// during the hierarchy phase before they land in the hierarchy map.
    pub pending_typarams: &'s [TyParam],
    /// Header phase: no type parameters, no inherited members.
    pub restricted: bool,
}

impl<'s> ScopeCtx<'s> {
    pub fn of(class: ClassSym, unit: usize) -> Self {
        ScopeCtx {
            class,
            unit,
            method_typarams: &[],
            pending_typarams: &[],
            restricted: false,
        }
    }

    pub fn restricted(class: ClassSym, unit: usize) -> Self {
        ScopeCtx {
            class,
            unit,
            method_typarams: &[],
            pending_typarams: &[],
            restricted: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedName {
    Class(ClassSym),
    TyVar(TyVarSym),
}

impl<'a> Binder<'a> {
    // ------------------------------------------------------------------
    // Simple-name resolution
    // ------------------------------------------------------------------

    /// Resolve a simple name through the full cascade. Reports ambiguity;
    /// the caller reports outright misses.
    pub fn resolve_simple(&self, ctx: &ScopeCtx<'_>, name: &str) -> Option<ResolvedName> {
        // Method type parameters shadow everything.
        if !ctx.restricted {
            for param in ctx.method_typarams {
                if self.names.with(param.sym.name, |n| n == name) {
                    return Some(ResolvedName::TyVar(param.sym));
                }
            }
        }
        // Enclosing class chain: pending/bound type parameters, the class's
        // own simple name, then member types.
        let mut current = Some(ctx.class);
        let mut first = true;
        while let Some(c) = current {
            if !ctx.restricted {
                let pending = if first { ctx.pending_typarams } else { &[] };
                for param in pending {
                    if self.names.with(param.sym.name, |n| n == name) {
                        return Some(ResolvedName::TyVar(param.sym));
                    }
                }
                if let Some(hierarchy) = self.hierarchies.get(&c) {
                    for param in &hierarchy.type_params {
                        if self.names.with(param.sym.name, |n| n == name) {
                            return Some(ResolvedName::TyVar(param.sym));
                        }
                    }
                }
            }
            let binary = self.names.binary_name(c);
            if bn::simple_name_of(&binary) == name {
                return Some(ResolvedName::Class(c));
            }
            if let Some(member) = self.member_type(c, name, ctx.restricted) {
                return Some(ResolvedName::Class(member));
            }
            current = self.owner_of(c);
            first = false;
        }
        // Single-type imports.
        let imports = &self.imports[ctx.unit];
        for (simple, segments) in &imports.single {
            if simple == name {
                if let Some(sym) = self.resolve_absolute(segments) {
                    return Some(ResolvedName::Class(sym));
                }
            }
        }
        // Same package.
        let package = self.unit_package(ctx.unit);
        if let Some(sym) = self.lookup_top(&package, name) {
            return Some(ResolvedName::Class(sym));
        }
        // On-demand imports, plus the implicit java.lang.
        let mut hits: Vec<ClassSym> = Vec::new();
        for prefix in &imports.on_demand {
            if let Some(sym) = self.on_demand_member(prefix, name) {
                if !hits.contains(&sym) {
                    hits.push(sym);
                }
            }
        }
        if let Some(sym) = self.lookup_top("java/lang", name) {
            if !hits.contains(&sym) {
                hits.push(sym);
            }
        }
        match hits.len() {
            0 => None,
            1 => Some(ResolvedName::Class(hits[0])),
            _ => {
                self.report(
                    ctx.unit,
                    Span::synthetic(),
                    DiagnosticKind::AmbiguousReference(name.to_string()),
                );
                Some(ResolvedName::Class(hits[0]))
            }
        }
    }

    fn on_demand_member(&self, prefix: &[String], name: &str) -> Option<ClassSym> {
        // A prefix is either a package or a class whose members are
        // imported.
        let package = prefix.join("/");
        if let Some(sym) = self.lookup_top(&package, name) {
            return Some(sym);
        }
        let class = self.resolve_absolute(prefix)?;
        self.member_type(class, name, false)
    }

    /// Resolve a fully qualified dotted name: longest known package prefix,
    /// then a class chain.
    pub fn resolve_absolute(&self, segments: &[String]) -> Option<ClassSym> {
        for split in (0..segments.len()).rev() {
            let package = segments[..split].join("/");
            if !self.has_package(&package) {
                continue;
            }
            let Some(mut sym) = self.lookup_top(&package, &segments[split]) else {
                continue;
            };
            let mut ok = true;
            for segment in &segments[split + 1..] {
                match self.member_type(sym, segment, false) {
                    Some(next) => sym = next,
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if ok {
                return Some(sym);
            }
        }
        None
    }

    /// Resolve a possibly-qualified name appearing in a scope.
    pub fn resolve_name(&self, ctx: &ScopeCtx<'_>, name: &[ast::Ident]) -> Option<ResolvedName> {
        let first = &name[0].name;
        if let Some(resolved) = self.resolve_simple(ctx, first) {
            match resolved {
                ResolvedName::TyVar(tv) => {
                    if name.len() == 1 {
                        return Some(ResolvedName::TyVar(tv));
                    }
                    return None;
                }
                ResolvedName::Class(mut sym) => {
                    for segment in &name[1..] {
                        sym = self.member_type(sym, &segment.name, ctx.restricted)?;
                    }
                    return Some(ResolvedName::Class(sym));
                }
            }
        }
        let segments: Vec<String> = name.iter().map(|id| id.name.clone()).collect();
        self.resolve_absolute(&segments).map(ResolvedName::Class)
    }

    /// Resolve a name and report `CannotResolve` on failure.
    pub fn resolve_name_or_report(
        &self,
        ctx: &ScopeCtx<'_>,
        name: &[ast::Ident],
    ) -> Option<ResolvedName> {
        let resolved = self.resolve_name(ctx, name);
        if resolved.is_none() {
            let span = name
                .first()
                .map(|id| id.span.merge(name.last().expect("non-empty").span))
                .unwrap_or(Span::synthetic());
            self.report(
                ctx.unit,
                span,
                DiagnosticKind::CannotResolve(ast::qual_ident_text(name)),
            );
        }
        resolved
    }

    // ------------------------------------------------------------------
    // Member-type lookup
    // ------------------------------------------------------------------

    /// A nested type of `sym` by simple name. The restricted form sees only
    /// declared members; the full form also walks supertypes.
    pub fn member_type(&self, sym: ClassSym, name: &str, restricted: bool) -> Option<ClassSym> {
        if restricted {
            return self.declared_child(sym, name);
        }
        if let Some(hierarchy) = self.hierarchies.get(&sym) {
            return hierarchy.member_scope.get(name).copied();
        }
        // Walk the supertype closure over headers/classpath.
        let mut seen = FxHashSet::default();
        let mut queue = vec![sym];
        while let Some(current) = queue.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(found) = self.declared_child(current, name) {
                return Some(found);
            }
            for parent in self.direct_super_syms(current) {
                queue.push(parent);
            }
        }
        None
    }

    /// A directly declared nested type.
    pub fn declared_child(&self, sym: ClassSym, name: &str) -> Option<ClassSym> {
        if let Some(header) = self.headers.get(&sym) {
            return header.children.get(name).copied();
        }
        if let Some(source) = self.decls.get(&sym) {
            // Pre-header: consult the AST directly.
            for member in &source.decl.members {
                if let ast::Member::Type(nested) = member {
                    if nested.name.name == name {
                        let binary = self.names.binary_name(sym);
                        return Some(self.names.class(&bn::nested(&binary, name)));
                    }
                }
            }
            return None;
        }
        let loaded = self.classpath_class(sym)?;
        loaded.child(name)
    }

    /// Superclass and interface symbols, from whatever phase data exists.
    pub fn direct_super_syms(&self, sym: ClassSym) -> Vec<ClassSym> {
        if let Some(header) = self.headers.get(&sym) {
            let mut supers = Vec::new();
            if let Some(superclass) = header.superclass {
                supers.push(superclass);
            }
            supers.extend(header.interfaces.iter().copied());
            return supers;
        }
        if let Some(loaded) = self.classpath_class(sym) {
            let mut supers = Vec::new();
            if let Some(Type::Class(super_ty)) = &loaded.supertype {
                supers.push(super_ty.sym());
            }
            for iface in &loaded.interfaces {
                if let Type::Class(ty) = iface {
                    supers.push(ty.sym());
                }
            }
            return supers;
        }
        Vec::new()
    }

    // ------------------------------------------------------------------
    // Type resolution
    // ------------------------------------------------------------------

    pub fn resolve_type(&self, ctx: &ScopeCtx<'_>, ty: &ast::Ty) -> Type {
        match ty {
            ast::Ty::Primitive {
                kind, annotations, ..
            } => Type::Primitive(prim_of(*kind), self.eval_annotations(ctx, annotations)),
            ast::Ty::Void { .. } => Type::Void,
            ast::Ty::Array {
                element,
                annotations,
                ..
            } => Type::Array(
                Box::new(self.resolve_type(ctx, element)),
                self.eval_annotations(ctx, annotations),
            ),
            ast::Ty::Wildcard {
                bound, annotations, ..
            } => {
                let bound = match bound {
                    ast::WildBound::None => WildBoundTy::None,
                    ast::WildBound::Extends(inner) => {
                        WildBoundTy::Upper(Box::new(self.resolve_type(ctx, inner)))
                    }
                    ast::WildBound::Super(inner) => {
                        WildBoundTy::Lower(Box::new(self.resolve_type(ctx, inner)))
                    }
                };
                Type::Wildcard(WildTy {
                    bound,
                    annotations: self.eval_annotations(ctx, annotations),
                })
            }
            ast::Ty::Named { segments, span } => self.resolve_named(ctx, segments, *span),
        }
    }

    fn resolve_named(&self, ctx: &ScopeCtx<'_>, segments: &[ast::TySeg], span: Span) -> Type {
        let first = &segments[0];
        match self.resolve_simple(ctx, &first.name.name) {
            Some(ResolvedName::TyVar(tv)) => {
                if segments.len() > 1 || !first.args.is_empty() {
                    self.report(
                        ctx.unit,
                        span,
                        DiagnosticKind::CannotResolve(first.name.name.clone()),
                    );
                    return Type::Error;
                }
                Type::TyVar(tv, self.eval_annotations(ctx, &first.annotations))
            }
            Some(ResolvedName::Class(sym)) => self.finish_class_path(ctx, sym, segments, 0, span),
            None => {
                // Package-qualified: find the longest package prefix.
                let names: Vec<String> = segments.iter().map(|s| s.name.name.clone()).collect();
                for split in (1..segments.len()).rev() {
                    let package = names[..split].join("/");
                    if !self.has_package(&package) {
                        continue;
                    }
                    if let Some(sym) = self.lookup_top(&package, &names[split]) {
                        self.check_cross_package_access(ctx, sym, span);
                        return self.finish_class_path(ctx, sym, segments, split, span);
                    }
                }
                self.report(
                    ctx.unit,
                    span,
                    DiagnosticKind::CannotResolve(names.join(".")),
                );
                Type::Error
            }
        }
    }

    /// Build the `Outer.Inner` chain from `segments[start..]`, with
    /// `segments[start]` already resolved to `sym`.
    fn finish_class_path(
        &self,
        ctx: &ScopeCtx<'_>,
        sym: ClassSym,
        segments: &[ast::TySeg],
        start: usize,
        span: Span,
    ) -> Type {
        let mut path = vec![SimpleClassTy {
            sym,
            args: self.resolve_type_args(ctx, &segments[start].args),
            annotations: self.eval_annotations(ctx, &segments[start].annotations),
        }];
        let mut current = sym;
        for segment in &segments[start + 1..] {
            match self.member_type(current, &segment.name.name, ctx.restricted) {
                Some(next) => {
                    path.push(SimpleClassTy {
                        sym: next,
                        args: self.resolve_type_args(ctx, &segment.args),
                        annotations: self.eval_annotations(ctx, &segment.annotations),
                    });
                    current = next;
                }
                None => {
                    self.report(
                        ctx.unit,
                        span,
                        DiagnosticKind::CannotResolve(segment.name.name.clone()),
                    );
                    return Type::Error;
                }
            }
        }
        Type::Class(ClassTy { path })
    }

    fn resolve_type_args(&self, ctx: &ScopeCtx<'_>, args: &[ast::Ty]) -> Vec<Type> {
        args.iter().map(|arg| self.resolve_type(ctx, arg)).collect()
    }

    /// A package-qualified reference to a non-public top-level class from
    /// another package is reported; resolution continues with the symbol so
    /// one mistake produces one diagnostic.
    fn check_cross_package_access(&self, ctx: &ScopeCtx<'_>, sym: ClassSym, span: Span) {
        let binary = self.names.binary_name(sym);
        if bn::package_of(&binary) == self.unit_package(ctx.unit) {
            return;
        }
        let is_public = if let Some(header) = self.headers.get(&sym) {
            header.access.contains(javelin_model::AccessFlags::PUBLIC)
        } else if let Some(source) = self.decls.get(&sym) {
            source
                .decl
                .mods
                .contains(javelin_parser::ast::Mods::PUBLIC)
        } else if let Some(loaded) = self.classpath_class(sym) {
            loaded.access.contains(javelin_model::AccessFlags::PUBLIC)
        } else {
            true
        };
        if !is_public {
            self.report(
                ctx.unit,
                span,
                DiagnosticKind::SymbolNotAccessible(bn::display_name(&binary)),
            );
        }
    }

    /// Resolve a type and require a class type, degrading to `None` with a
    /// diagnostic otherwise. Used for supertypes and throws clauses.
    pub fn resolve_class_type(&self, ctx: &ScopeCtx<'_>, ty: &ast::Ty) -> Option<ClassTy> {
        match self.resolve_type(ctx, ty) {
            Type::Class(class_ty) => Some(class_ty),
            Type::Error => None,
            other => {
                let _ = other;
                self.report(
                    ctx.unit,
                    ty.span(),
                    DiagnosticKind::CannotResolve("class type expected".to_string()),
                );
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Annotation uses
    // ------------------------------------------------------------------

    /// Evaluate annotation uses appearing in a type position.
    pub fn eval_annotations(&self, ctx: &ScopeCtx<'_>, annos: &[ast::Anno]) -> Vec<AnnoValue> {
        annos
            .iter()
            .filter_map(|anno| self.eval_annotation(ctx, anno))
            .collect()
    }

    pub fn eval_annotation(&self, ctx: &ScopeCtx<'_>, anno: &ast::Anno) -> Option<AnnoValue> {
        let resolved = self.resolve_name_or_report(ctx, &anno.name)?;
        let ResolvedName::Class(sym) = resolved else {
            self.report(
                ctx.unit,
                anno.span,
                DiagnosticKind::CannotResolve(ast::qual_ident_text(&anno.name)),
            );
            return None;
        };
        let mut values = Vec::new();
        for (key, expr) in &anno.args {
            let name = key
                .as_ref()
                .map(|id| id.name.clone())
                .unwrap_or_else(|| "value".to_string());
            // Missing or non-constant arguments become missing-value
            // markers, i.e. the pair is dropped.
            if let Some(value) = self.eval_expr(ctx, expr) {
                let value = self.coerce_element_value(sym, &name, value);
                values.push((name, value));
            }
        }
        Some(AnnoValue { sym, values })
    }
}

pub fn prim_of(kind: ast::PrimKind) -> PrimTy {
    match kind {
        ast::PrimKind::Boolean => PrimTy::Boolean,
        ast::PrimKind::Byte => PrimTy::Byte,
        ast::PrimKind::Short => PrimTy::Short,
        ast::PrimKind::Int => PrimTy::Int,
        ast::PrimKind::Long => PrimTy::Long,
        ast::PrimKind::Char => PrimTy::Char,
        ast::PrimKind::Float => PrimTy::Float,
        ast::PrimKind::Double => PrimTy::Double,
    }
}
