//! The phase driver and phases 1-4.
//!
//! The `Binder` owns all inter-phase state. Phases run in order over every
//! source class; each phase writes a fresh map and never mutates the
//! previous phase's records. Interior mutability is confined to the
//! diagnostics sink, the lazily-populated top-level index, and the
//! constant-evaluation memo, none of which are observable mid-update.

use crate::index::TopIndex;
use crate::resolve::{ImportTable, ResolvedName, ScopeCtx};
use crate::{BindOptions, relations};
use indexmap::IndexMap;
use javelin_common::names as bn;
use javelin_common::{DiagnosticKind, Diagnostics, Span};
use javelin_model::{
    AccessFlags, ClassProvider, ClassSym, ClassTy, ComponentInfo, Const, FieldInfo, FieldSym,
    MethodInfo, MethodSym, ModuleBound, Names, ParamInfo, SimpleClassTy, SourceHeaderBound,
    SourceHierarchyBound, SourceKind, TyParam, TyVarOwner, TyVarSym, Type, TypeBoundClass,
};
use javelin_parser::ast;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

/// Where a source class came from.
#[derive(Clone)]
pub struct SourceDecl<'a> {
    pub unit: usize,
    pub decl: &'a ast::TypeDecl,
    pub owner: Option<ClassSym>,
}

/// A field initialiser expression waiting for constant evaluation.
#[derive(Clone)]
pub struct FieldInit<'a> {
    pub class: ClassSym,
    pub unit: usize,
    pub decl: &'a ast::FieldDecl,
}

/// Declaration-position annotation sources, kept aside for phase 6. Indices
/// refer into the bound class's field/method/component vectors.
#[derive(Default)]
pub struct AnnoSources<'a> {
    pub class: &'a [ast::Anno],
    pub fields: Vec<(usize, &'a [ast::Anno], Span)>,
    pub methods: Vec<(usize, &'a [ast::Anno], Vec<&'a [ast::Anno]>, Span)>,
    pub components: Vec<(usize, &'a [ast::Anno], Span)>,
}

pub struct Binder<'a> {
    pub units: &'a [ast::CompilationUnit],
    pub names: &'a Names,
    pub classpath: &'a dyn ClassProvider,
    pub options: BindOptions,
    diags: RefCell<Diagnostics>,
    index: RefCell<TopIndex>,

    // Phase 1.
    pub decls: FxHashMap<ClassSym, SourceDecl<'a>>,
    pub order: Vec<ClassSym>,
    pub imports: Vec<ImportTable>,
    pub packages: Vec<String>,
    pub modules: Vec<(usize, &'a ast::ModuleDecl)>,

    // Phase 2.
    pub headers: FxHashMap<ClassSym, Arc<SourceHeaderBound>>,

    // Phase 3.
    pub hierarchies: FxHashMap<ClassSym, Arc<SourceHierarchyBound>>,

    // Phase 4 onwards; plain values until binding finishes, then frozen.
    pub bound: IndexMap<ClassSym, Arc<TypeBoundClass>>,
    pub field_inits: FxHashMap<FieldSym, FieldInit<'a>>,
    pub anno_sources: FxHashMap<ClassSym, AnnoSources<'a>>,

    // Constant-evaluation memo (phase 5, on-demand from phase 3 onwards).
    pub(crate) const_memo: RefCell<FxHashMap<FieldSym, Option<Const>>>,
    pub(crate) const_stack: RefCell<FxHashSet<FieldSym>>,
}

impl<'a> Binder<'a> {
    pub fn new(
        units: &'a [ast::CompilationUnit],
        names: &'a Names,
        classpath: &'a dyn ClassProvider,
        options: BindOptions,
    ) -> Self {
        Binder {
            units,
            names,
            classpath,
            options,
            diags: RefCell::new(Diagnostics::new()),
            index: RefCell::new(TopIndex::new()),
            decls: FxHashMap::default(),
            order: Vec::new(),
            imports: Vec::new(),
            packages: Vec::new(),
            modules: Vec::new(),
            headers: FxHashMap::default(),
            hierarchies: FxHashMap::default(),
            bound: IndexMap::new(),
            field_inits: FxHashMap::default(),
            anno_sources: FxHashMap::default(),
            const_memo: RefCell::new(FxHashMap::default()),
            const_stack: RefCell::new(FxHashSet::default()),
        }
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    pub fn report(&self, unit: usize, span: Span, kind: DiagnosticKind) {
        let file = self
            .units
            .get(unit)
            .map(|u| u.file.as_str())
            .unwrap_or("<unknown>");
        self.diags.borrow_mut().report(file, span, kind);
    }

    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut *self.diags.borrow_mut())
    }

    pub fn unit_package(&self, unit: usize) -> String {
        self.packages.get(unit).cloned().unwrap_or_default()
    }

    pub fn lookup_top(&self, package: &str, simple: &str) -> Option<ClassSym> {
        self.index
            .borrow_mut()
            .lookup(package, simple, self.names, self.classpath)
    }

    pub fn has_package(&self, package: &str) -> bool {
        self.index.borrow_mut().has_package(package, self.classpath)
    }

    pub fn classpath_class(&self, sym: ClassSym) -> Option<Arc<TypeBoundClass>> {
        let name = self.names.binary_name(sym);
        self.classpath.load(&name, self.names)
    }

    pub fn owner_of(&self, sym: ClassSym) -> Option<ClassSym> {
        if let Some(source) = self.decls.get(&sym) {
            return source.owner;
        }
        let binary = self.names.binary_name(sym);
        bn::enclosing_of(&binary).map(|outer| self.names.class(outer))
    }

    fn object_sym(&self) -> ClassSym {
        self.names.class(bn::OBJECT)
    }

    // ------------------------------------------------------------------
    // Phase 1: preliminary
    // ------------------------------------------------------------------

    pub fn preliminary(&mut self) {
        for (unit_idx, unit) in self.units.iter().enumerate() {
            let package = unit
                .package
                .as_ref()
                .map(|p| {
                    p.name
                        .iter()
                        .map(|id| id.name.as_str())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default();
            self.packages.push(package.clone());
            self.imports.push(ImportTable::build(unit));
            if let Some(module) = &unit.module {
                self.modules.push((unit_idx, module));
            }
            for decl in &unit.types {
                let binary = bn::top_level(&package, &decl.name.name);
                self.register(unit_idx, &package, &binary, decl, None);
            }
        }
        debug!(classes = self.order.len(), "preliminary phase complete");
    }

    fn register(
        &mut self,
        unit: usize,
        package: &str,
        binary: &str,
        decl: &'a ast::TypeDecl,
        owner: Option<ClassSym>,
    ) {
        let sym = self.names.class(binary);
        if owner.is_none() {
            self.index
                .borrow_mut()
                .insert_source(package, &decl.name.name, sym);
        }
        self.decls.insert(
            sym,
            SourceDecl {
                unit,
                decl,
                owner,
            },
        );
        self.order.push(sym);
        for member in &decl.members {
            match member {
                ast::Member::Type(nested) => {
                    let nested_binary = bn::nested(binary, &nested.name.name);
                    self.register(unit, package, &nested_binary, nested, Some(sym));
                }
                ast::Member::Field(field) if field.init.is_some() => {
                    self.field_inits.insert(
                        FieldSym {
                            owner: sym,
                            name: self.names.intern(&field.name.name),
                        },
                        FieldInit {
                            class: sym,
                            unit,
                            decl: field,
                        },
                    );
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: headers
    // ------------------------------------------------------------------

    pub fn headers(&mut self) {
        let order = self.order.clone();
        for sym in order {
            let source = self.decls.get(&sym).expect("registered").clone();
            let header = self.bind_header(sym, &source);
            self.headers.insert(sym, Arc::new(header));
        }
        self.cut_inheritance_cycles();
        debug!("header phase complete");
    }

    fn bind_header(&self, sym: ClassSym, source: &SourceDecl<'a>) -> SourceHeaderBound {
        let decl = source.decl;
        let ctx = ScopeCtx::restricted(sym, source.unit);
        let kind = kind_of(decl.kind);
        let access = self.class_access(source);

        let mut superclass = match kind {
            SourceKind::Class => {
                if self.names.binary_name(sym) == bn::OBJECT {
                    None
                } else {
                    Some(self.object_sym())
                }
            }
            SourceKind::Interface | SourceKind::Annotation => Some(self.object_sym()),
            SourceKind::Enum => Some(self.names.class(bn::ENUM)),
            SourceKind::Record => Some(self.names.class(bn::RECORD)),
        };
        if let Some(extends) = &decl.superclass {
            if let Some(resolved) = self.header_class_ref(&ctx, extends) {
                superclass = Some(resolved);
            }
        }
        let mut interfaces: Vec<ClassSym> = decl
            .interfaces
            .iter()
            .filter_map(|ty| self.header_class_ref(&ctx, ty))
            .collect();
        if kind == SourceKind::Annotation {
            interfaces.push(self.names.class(bn::ANNOTATION));
        }
        let permits = decl
            .permits
            .iter()
            .filter_map(|ty| self.header_class_ref(&ctx, ty))
            .collect();

        let binary = self.names.binary_name(sym);
        let mut children = IndexMap::new();
        for member in &decl.members {
            if let ast::Member::Type(nested) = member {
                children.insert(
                    nested.name.name.clone(),
                    self.names.class(&bn::nested(&binary, &nested.name.name)),
                );
            }
        }

        SourceHeaderBound {
            sym,
            access,
            kind,
            owner: source.owner,
            type_param_names: decl
                .type_params
                .iter()
                .map(|p| p.name.name.clone())
                .collect(),
            superclass,
            interfaces,
            permits,
            children,
        }
    }

    /// Resolve a supertype reference to its symbol, header-phase scope.
    fn header_class_ref(&self, ctx: &ScopeCtx<'_>, ty: &ast::Ty) -> Option<ClassSym> {
        let ast::Ty::Named { segments, span } = ty else {
            self.report(
                ctx.unit,
                ty.span(),
                DiagnosticKind::CannotResolve("class type expected".to_string()),
            );
            return None;
        };
        let name: Vec<ast::Ident> = segments.iter().map(|s| s.name.clone()).collect();
        match self.resolve_name(ctx, &name) {
            Some(ResolvedName::Class(sym)) => Some(sym),
            _ => {
                self.report(
                    ctx.unit,
                    *span,
                    DiagnosticKind::CannotResolve(
                        segments
                            .iter()
                            .map(|s| s.name.name.as_str())
                            .collect::<Vec<_>>()
                            .join("."),
                    ),
                );
                None
            }
        }
    }

    fn class_access(&self, source: &SourceDecl<'a>) -> AccessFlags {
        let decl = source.decl;
        let mut access = mods_to_flags(decl.mods);
        // Top-level classes admit no membership modifiers.
        if source.owner.is_none() {
            for (flag, text) in [
                (AccessFlags::PRIVATE, "private"),
                (AccessFlags::PROTECTED, "protected"),
                (AccessFlags::STATIC, "static"),
            ] {
                if access.contains(flag) {
                    self.report(
                        source.unit,
                        decl.name.span,
                        DiagnosticKind::UnexpectedModifier(text.to_string()),
                    );
                    access -= flag;
                }
            }
        }
        match decl.kind {
            ast::TypeKind::Interface => {
                access |= AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
            }
            ast::TypeKind::Annotation => {
                access |=
                    AccessFlags::INTERFACE | AccessFlags::ABSTRACT | AccessFlags::ANNOTATION;
            }
            ast::TypeKind::Enum => {
                access |= AccessFlags::ENUM | AccessFlags::SUPER;
                if decl.constants.iter().all(|c| !c.has_body) {
                    access |= AccessFlags::FINAL;
                }
            }
            ast::TypeKind::Record => {
                access |= AccessFlags::FINAL | AccessFlags::SUPER;
            }
            ast::TypeKind::Class => {
                access |= AccessFlags::SUPER;
            }
        }
        // Implicitly static kinds, and members of interfaces.
        if source.owner.is_some() {
            if matches!(
                decl.kind,
                ast::TypeKind::Interface
                    | ast::TypeKind::Enum
                    | ast::TypeKind::Annotation
                    | ast::TypeKind::Record
            ) {
                access |= AccessFlags::STATIC;
            }
            if let Some(owner_decl) = source.owner.and_then(|o| self.decls.get(&o)) {
                if matches!(
                    owner_decl.decl.kind,
                    ast::TypeKind::Interface | ast::TypeKind::Annotation
                ) {
                    access |= AccessFlags::PUBLIC | AccessFlags::STATIC;
                }
            }
        }
        access
    }

    /// Detect cycles in the `extends`/`implements` symbol graph and cut
    /// them by rewriting the offending header to extend `Object`.
    fn cut_inheritance_cycles(&mut self) {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Grey,
            Black,
        }
        let mut colors: FxHashMap<ClassSym, Color> = FxHashMap::default();
        let order = self.order.clone();
        let mut cyclic: Vec<ClassSym> = Vec::new();
        for &root in &order {
            if colors.get(&root).copied().unwrap_or(Color::White) != Color::White {
                continue;
            }
            // Iterative DFS with an explicit stack of (node, next-child).
            let mut stack: Vec<(ClassSym, Vec<ClassSym>, usize)> = Vec::new();
            colors.insert(root, Color::Grey);
            stack.push((root, self.source_super_syms(root), 0));
            while !stack.is_empty() {
                let (node, child) = {
                    let (node, supers, next) = stack.last_mut().expect("stack is non-empty");
                    if *next >= supers.len() {
                        (*node, None)
                    } else {
                        let child = supers[*next];
                        *next += 1;
                        (*node, Some(child))
                    }
                };
                let Some(child) = child else {
                    colors.insert(node, Color::Black);
                    stack.pop();
                    continue;
                };
                match colors.get(&child).copied().unwrap_or(Color::White) {
                    Color::White => {
                        colors.insert(child, Color::Grey);
                        let grand = self.source_super_syms(child);
                        stack.push((child, grand, 0));
                    }
                    Color::Grey => {
                        if !cyclic.contains(&node) {
                            cyclic.push(node);
                        }
                    }
                    Color::Black => {}
                }
            }
        }
        for sym in cyclic {
            let unit = self.decls.get(&sym).map(|s| s.unit).unwrap_or(0);
            let span = self
                .decls
                .get(&sym)
                .map(|s| s.decl.name.span)
                .unwrap_or(Span::synthetic());
            let name = self.names.binary_name(sym);
            self.report(
                unit,
                span,
                DiagnosticKind::CyclicInheritance(bn::display_name(&name)),
            );
            if let Some(header) = self.headers.get(&sym) {
                let mut fixed = (**header).clone();
                fixed.superclass = Some(self.object_sym());
                fixed.interfaces.clear();
                self.headers.insert(sym, Arc::new(fixed));
            }
        }
    }

    /// Supertype symbols of a *source* class (classpath classes cannot
    /// participate in source cycles).
    fn source_super_syms(&self, sym: ClassSym) -> Vec<ClassSym> {
        let Some(header) = self.headers.get(&sym) else {
            return Vec::new();
        };
        let mut supers = Vec::new();
        if let Some(superclass) = header.superclass {
            if self.decls.contains_key(&superclass) {
                supers.push(superclass);
            }
        }
        for &iface in &header.interfaces {
            if self.decls.contains_key(&iface) {
                supers.push(iface);
            }
        }
        supers
    }

    // ------------------------------------------------------------------
    // Phase 3: hierarchy
    // ------------------------------------------------------------------

    pub fn hierarchies(&mut self) {
        let order = self.order.clone();
        for sym in order {
            let source = self.decls.get(&sym).expect("registered").clone();
            let hierarchy = self.bind_hierarchy(sym, &source);
            self.hierarchies.insert(sym, Arc::new(hierarchy));
        }
        debug!("hierarchy phase complete");
    }

    fn bind_hierarchy(&self, sym: ClassSym, source: &SourceDecl<'a>) -> SourceHierarchyBound {
        let decl = source.decl;
        let header = self.headers.get(&sym).expect("header bound").clone();

        // The transitive member-type scope: own children shadow inherited.
        let mut member_scope = IndexMap::new();
        let mut seen = FxHashSet::default();
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(sym);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(h) = self.headers.get(&current) {
                for (name, &child) in &h.children {
                    member_scope.entry(name.clone()).or_insert(child);
                }
                if let Some(superclass) = h.superclass {
                    queue.push_back(superclass);
                }
                queue.extend(h.interfaces.iter().copied());
            } else if let Some(loaded) = self.classpath_class(current) {
                for (name, &child) in &loaded.children {
                    member_scope.entry(name.clone()).or_insert(child);
                }
                if let Some(Type::Class(super_ty)) = &loaded.supertype {
                    queue.push_back(super_ty.sym());
                }
                for iface in &loaded.interfaces {
                    if let Type::Class(ty) = iface {
                        queue.push_back(ty.sym());
                    }
                }
            } else {
                // Resolved to a symbol, but no class file backs it; the
                // symbol keeps its sentinel binding.
                let name = self.names.binary_name(current);
                self.report(
                    source.unit,
                    decl.name.span,
                    DiagnosticKind::ClassFileNotFound(bn::display_name(&name)),
                );
            }
        }

        let type_params =
            self.bind_type_params(sym, source.unit, TyVarOwner::Class(sym), &decl.type_params);
        let ctx = ScopeCtx {
            class: sym,
            unit: source.unit,
            method_typarams: &[],
            pending_typarams: &type_params,
            restricted: false,
        };

        let supertype = match header.kind {
            SourceKind::Enum => Some(Type::Class(ClassTy {
                path: vec![SimpleClassTy {
                    sym: self.names.class(bn::ENUM),
                    args: vec![Type::class(sym)],
                    annotations: Vec::new(),
                }],
            })),
            _ => match &decl.superclass {
                Some(extends) => self
                    .resolve_class_type(&ctx, extends)
                    .map(Type::Class)
                    .or_else(|| header.superclass.map(Type::class)),
                None => header.superclass.map(Type::class),
            },
        };

        let mut interface_types: Vec<Type> = decl
            .interfaces
            .iter()
            .filter_map(|ty| self.resolve_class_type(&ctx, ty).map(Type::Class))
            .collect();
        if header.kind == SourceKind::Annotation {
            interface_types.push(Type::class(self.names.class(bn::ANNOTATION)));
        }

        SourceHierarchyBound {
            header: (*header).clone(),
            type_params,
            supertype,
            interface_types,
            member_scope,
        }
    }

    /// Bind a type-parameter list: mint symbols first so F-bounded
    /// parameters can see each other, then resolve bounds.
    pub fn bind_type_params(
        &self,
        class: ClassSym,
        unit: usize,
        owner: TyVarOwner,
        params: &[ast::TypeParam],
    ) -> Vec<TyParam> {
        let mut minted: Vec<TyParam> = params
            .iter()
            .enumerate()
            .map(|(index, param)| TyParam {
                sym: TyVarSym {
                    owner,
                    name: self.names.intern(&param.name.name),
                    index: index as u32,
                },
                bounds: Vec::new(),
                annotations: Vec::new(),
            })
            .collect();
        for (index, param) in params.iter().enumerate() {
            let ctx = ScopeCtx {
                class,
                unit,
                method_typarams: if matches!(owner, TyVarOwner::Method(..)) {
                    &minted
                } else {
                    &[]
                },
                pending_typarams: if matches!(owner, TyVarOwner::Class(_)) {
                    &minted
                } else {
                    &[]
                },
                restricted: false,
            };
            let bounds: Vec<Type> = param
                .bounds
                .iter()
                .map(|bound| self.resolve_type(&ctx, bound))
                .collect();
            let annotations = self.eval_annotations(&ctx, &param.annotations);
            minted[index].bounds = bounds;
            minted[index].annotations = annotations;
        }
        minted
    }

    // ------------------------------------------------------------------
    // Phase 4: members
    // ------------------------------------------------------------------

    pub fn members(&mut self) {
        let order = self.order.clone();
        for sym in order {
            let source = self.decls.get(&sym).expect("registered").clone();
            let (bound, sources) = self.bind_members(sym, &source);
            self.anno_sources.insert(sym, sources);
            self.bound.insert(sym, Arc::new(bound));
        }
        let modules = self.modules.clone();
        for (unit, module) in modules {
            let (sym, bound) = self.bind_module(unit, module);
            self.bound.insert(sym, Arc::new(bound));
        }
        debug!(classes = self.bound.len(), "member phase complete");
    }

    fn bind_members(
        &self,
        sym: ClassSym,
        source: &SourceDecl<'a>,
    ) -> (TypeBoundClass, AnnoSources<'a>) {
        let decl = source.decl;
        let hierarchy = self.hierarchies.get(&sym).expect("hierarchy bound").clone();
        let header = &hierarchy.header;
        let kind = header.kind;
        let ctx = ScopeCtx::of(sym, source.unit);
        let in_interface = matches!(kind, SourceKind::Interface | SourceKind::Annotation);

        let mut sources = AnnoSources {
            class: &decl.annotations,
            ..AnnoSources::default()
        };
        let mut fields: Vec<FieldInfo> = Vec::new();
        let mut methods: Vec<MethodInfo> = Vec::new();
        let mut components: Vec<ComponentInfo> = Vec::new();
        let mut method_index = 0u32;

        // Enum constants become public static final fields of the enum type.
        for constant in &decl.constants {
            let field_sym = FieldSym {
                owner: sym,
                name: self.names.intern(&constant.name.name),
            };
            sources
                .fields
                .push((fields.len(), &constant.annotations, constant.name.span));
            fields.push(FieldInfo {
                sym: field_sym,
                name: constant.name.name.clone(),
                access: AccessFlags::PUBLIC
                    | AccessFlags::STATIC
                    | AccessFlags::FINAL
                    | AccessFlags::ENUM,
                ty: Type::class(sym),
                annotations: Vec::new(),
                constant: None,
                javadoc: constant.javadoc.clone(),
            });
        }

        // Record components: the component list, its backing fields, and
        // later the accessor methods.
        for component in &decl.components {
            let ty = self.resolve_type(&ctx, &component.ty);
            let ty = if component.varargs {
                Type::Array(Box::new(ty), Vec::new())
            } else {
                ty
            };
            sources
                .components
                .push((components.len(), &component.annotations, component.span));
            components.push(ComponentInfo {
                name: component.name.name.clone(),
                ty: ty.clone(),
                annotations: Vec::new(),
            });
            fields.push(FieldInfo {
                sym: FieldSym {
                    owner: sym,
                    name: self.names.intern(&component.name.name),
                },
                name: component.name.name.clone(),
                access: AccessFlags::PRIVATE | AccessFlags::FINAL,
                ty,
                annotations: Vec::new(),
                constant: None,
                javadoc: None,
            });
        }

        let mut saw_constructor = false;
        for member in &decl.members {
            match member {
                ast::Member::Type(_) => {}
                ast::Member::Field(field) => {
                    let mut access = mods_to_flags(field.mods);
                    if in_interface {
                        access |= AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL;
                    }
                    let ty = self.resolve_type(&ctx, &field.ty);
                    let ty = apply_extra_dims(ty, &field.extra_dims, self, &ctx);
                    let field_sym = FieldSym {
                        owner: sym,
                        name: self.names.intern(&field.name.name),
                    };
                    sources
                        .fields
                        .push((fields.len(), &field.annotations, field.name.span));
                    fields.push(FieldInfo {
                        sym: field_sym,
                        name: field.name.name.clone(),
                        access,
                        ty,
                        annotations: Vec::new(),
                        constant: None,
                        javadoc: field.javadoc.clone(),
                    });
                }
                ast::Member::Method(method) => {
                    let is_constructor = method.return_ty.is_none();
                    saw_constructor |= is_constructor;
                    let bound = self.bind_method(sym, source, method, method_index, kind);
                    method_index += 1;
                    sources.methods.push((
                        methods.len(),
                        &method.annotations,
                        method.params.iter().map(|p| p.annotations.as_slice()).collect(),
                        method.name.span,
                    ));
                    methods.push(bound);
                }
            }
        }

        self.synthesize_members(
            sym,
            decl,
            kind,
            header.access,
            &components,
            saw_constructor,
            &mut methods,
        );

        let bound = TypeBoundClass {
            sym,
            access: header.access,
            kind,
            owner: header.owner,
            type_params: hierarchy.type_params.clone(),
            supertype: hierarchy.supertype.clone(),
            interfaces: hierarchy.interface_types.clone(),
            permits: header.permits.clone(),
            children: header.children.clone(),
            fields,
            methods,
            components,
            annotations: Vec::new(),
            anno_meta: None,
            module: None,
            javadoc: decl.javadoc.clone(),
        };
        (bound, sources)
    }

    fn bind_method(
        &self,
        owner: ClassSym,
        source: &SourceDecl<'a>,
        method: &ast::MethodDecl,
        method_index: u32,
        kind: SourceKind,
    ) -> MethodInfo {
        let is_constructor = method.return_ty.is_none();
        let type_params = self.bind_type_params(
            owner,
            source.unit,
            TyVarOwner::Method(owner, method_index),
            &method.type_params,
        );
        let ctx = ScopeCtx {
            class: owner,
            unit: source.unit,
            method_typarams: &type_params,
            pending_typarams: &[],
            restricted: false,
        };

        let mut access = mods_to_flags(method.mods);
        match kind {
            SourceKind::Interface => {
                access |= AccessFlags::PUBLIC;
                if method.mods.contains(ast::Mods::DEFAULT) {
                    access |= AccessFlags::DEFAULT_METHOD;
                } else if !method.mods.contains(ast::Mods::STATIC)
                    && !method.mods.contains(ast::Mods::PRIVATE)
                {
                    access |= AccessFlags::ABSTRACT;
                }
                if method.mods.contains(ast::Mods::PRIVATE) {
                    access -= AccessFlags::PUBLIC;
                }
            }
            SourceKind::Annotation => {
                access |= AccessFlags::PUBLIC | AccessFlags::ABSTRACT;
            }
            _ => {}
        }
        if method.params.last().is_some_and(|p| p.varargs) {
            access |= AccessFlags::VARARGS;
        }

        let return_ty = match &method.return_ty {
            Some(ty) => {
                let ty = self.resolve_type(&ctx, ty);
                apply_extra_dims(ty, &method.extra_dims, self, &ctx)
            }
            None => Type::Void,
        };
        let params: Vec<ParamInfo> = method
            .params
            .iter()
            .map(|param| {
                let mut ty = self.resolve_type(&ctx, &param.ty);
                if param.varargs {
                    ty = Type::Array(Box::new(ty), Vec::new());
                }
                ParamInfo {
                    name: param.name.name.clone(),
                    access: if param.mods.contains(ast::Mods::FINAL) {
                        AccessFlags::FINAL
                    } else {
                        AccessFlags::empty()
                    },
                    ty,
                    annotations: Vec::new(),
                }
            })
            .collect();
        let receiver = method.receiver.as_ref().map(|ty| self.resolve_type(&ctx, ty));
        let throws: Vec<Type> = method
            .throws
            .iter()
            .map(|ty| self.resolve_type(&ctx, ty))
            .collect();
        let default_value = method
            .default_value
            .as_ref()
            .and_then(|expr| self.eval_expr(&ctx, expr));

        let name = if is_constructor {
            "<init>".to_string()
        } else {
            method.name.name.clone()
        };
        let descriptor = relations::erased_method_descriptor(
            self,
            &type_params,
            &params.iter().map(|p| p.ty.clone()).collect::<Vec<_>>(),
            &return_ty,
        );
        MethodInfo {
            sym: MethodSym {
                owner,
                name: self.names.intern(&name),
                descriptor: self.names.intern(&descriptor),
            },
            name,
            access,
            type_params,
            return_ty,
            params,
            receiver,
            throws,
            default_value,
            annotations: Vec::new(),
            javadoc: method.javadoc.clone(),
        }
    }

    /// Implicit members: default constructors, enum `values`/`valueOf`,
    /// record canonical constructor, accessors and `Object` overrides.
    fn synthesize_members(
        &self,
        sym: ClassSym,
        decl: &ast::TypeDecl,
        kind: SourceKind,
        class_access: AccessFlags,
        components: &[ComponentInfo],
        saw_constructor: bool,
        methods: &mut Vec<MethodInfo>,
    ) {
        let visibility = class_access
            & (AccessFlags::PUBLIC | AccessFlags::PROTECTED | AccessFlags::PRIVATE);
        let mint = |name: &str, params: &[Type], ret: &Type| MethodSym {
            owner: sym,
            name: self.names.intern(name),
            descriptor: self
                .names
                .intern(&relations::erased_method_descriptor(self, &[], params, ret)),
        };
        match kind {
            SourceKind::Class if !saw_constructor => {
                methods.push(MethodInfo {
                    sym: mint("<init>", &[], &Type::Void),
                    name: "<init>".to_string(),
                    access: visibility,
                    type_params: Vec::new(),
                    return_ty: Type::Void,
                    params: Vec::new(),
                    receiver: None,
                    throws: Vec::new(),
                    default_value: None,
                    annotations: Vec::new(),
                    javadoc: None,
                });
            }
            SourceKind::Enum => {
                if !saw_constructor {
                    methods.push(MethodInfo {
                        sym: mint("<init>", &[], &Type::Void),
                        name: "<init>".to_string(),
                        access: AccessFlags::PRIVATE,
                        type_params: Vec::new(),
                        return_ty: Type::Void,
                        params: Vec::new(),
                        receiver: None,
                        throws: Vec::new(),
                        default_value: None,
                        annotations: Vec::new(),
                        javadoc: None,
                    });
                }
                let self_ty = Type::class(sym);
                let values_ret = Type::Array(Box::new(self_ty.clone()), Vec::new());
                methods.push(MethodInfo {
                    sym: mint("values", &[], &values_ret),
                    name: "values".to_string(),
                    access: AccessFlags::PUBLIC | AccessFlags::STATIC,
                    type_params: Vec::new(),
                    return_ty: values_ret,
                    params: Vec::new(),
                    receiver: None,
                    throws: Vec::new(),
                    default_value: None,
                    annotations: Vec::new(),
                    javadoc: None,
                });
                let string_ty = Type::class(self.names.class(bn::STRING));
                methods.push(MethodInfo {
                    sym: mint("valueOf", &[string_ty.clone()], &self_ty),
                    name: "valueOf".to_string(),
                    access: AccessFlags::PUBLIC | AccessFlags::STATIC,
                    type_params: Vec::new(),
                    return_ty: self_ty,
                    params: vec![ParamInfo {
                        name: "name".to_string(),
                        access: AccessFlags::MANDATED,
                        ty: string_ty,
                        annotations: Vec::new(),
                    }],
                    receiver: None,
                    throws: Vec::new(),
                    default_value: None,
                    annotations: Vec::new(),
                    javadoc: None,
                });
            }
            SourceKind::Record => {
                if !saw_constructor {
                    let param_types: Vec<Type> =
                        components.iter().map(|c| c.ty.clone()).collect();
                    methods.push(MethodInfo {
                        sym: mint("<init>", &param_types, &Type::Void),
                        name: "<init>".to_string(),
                        access: visibility,
                        type_params: Vec::new(),
                        return_ty: Type::Void,
                        params: components
                            .iter()
                            .map(|c| ParamInfo {
                                name: c.name.clone(),
                                access: AccessFlags::empty(),
                                ty: c.ty.clone(),
                                annotations: Vec::new(),
                            })
                            .collect(),
                        receiver: None,
                        throws: Vec::new(),
                        default_value: None,
                        annotations: Vec::new(),
                        javadoc: None,
                    });
                }
                for component in components {
                    let declared = decl.members.iter().any(|m| match m {
                        ast::Member::Method(method) => {
                            method.name.name == component.name && method.params.is_empty()
                        }
                        _ => false,
                    });
                    if declared {
                        continue;
                    }
                    methods.push(MethodInfo {
                        sym: mint(&component.name, &[], &component.ty),
                        name: component.name.clone(),
                        access: AccessFlags::PUBLIC,
                        type_params: Vec::new(),
                        return_ty: component.ty.clone(),
                        params: Vec::new(),
                        receiver: None,
                        throws: Vec::new(),
                        default_value: None,
                        annotations: Vec::new(),
                        javadoc: None,
                    });
                }
                let object_ty = Type::class(self.object_sym());
                let string_ty = Type::class(self.names.class(bn::STRING));
                let bool_ty = Type::Primitive(javelin_model::PrimTy::Boolean, Vec::new());
                let int_ty = Type::Primitive(javelin_model::PrimTy::Int, Vec::new());
                for (name, params, ret) in [
                    ("toString", Vec::new(), string_ty),
                    ("hashCode", Vec::new(), int_ty),
                    ("equals", vec![object_ty], bool_ty),
                ] {
                    methods.push(MethodInfo {
                        sym: mint(name, &params, &ret),
                        name: name.to_string(),
                        access: AccessFlags::PUBLIC | AccessFlags::FINAL,
                        type_params: Vec::new(),
                        return_ty: ret,
                        params: params
                            .iter()
                            .map(|ty| ParamInfo {
                                name: "o".to_string(),
                                access: AccessFlags::empty(),
                                ty: ty.clone(),
                                annotations: Vec::new(),
                            })
                            .collect(),
                        receiver: None,
                        throws: Vec::new(),
                        default_value: None,
                        annotations: Vec::new(),
                        javadoc: None,
                    });
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    fn bind_module(&self, unit: usize, module: &ast::ModuleDecl) -> (ClassSym, TypeBoundClass) {
        let dotted = ast::qual_ident_text(&module.name);
        let key = format!("{}/module-info", dotted.replace('.', "/"));
        let sym = self.names.class(&key);
        let mut requires: Vec<(String, bool, bool)> = Vec::new();
        let mut exports = Vec::new();
        let mut opens = Vec::new();
        let mut uses = Vec::new();
        let mut provides = Vec::new();
        for directive in &module.directives {
            match directive {
                ast::ModuleDirective::Requires {
                    transitive,
                    is_static,
                    module,
                } => {
                    requires.push((ast::qual_ident_text(module), *transitive, *is_static));
                }
                ast::ModuleDirective::Exports { package, to } => {
                    exports.push((
                        package
                            .iter()
                            .map(|id| id.name.as_str())
                            .collect::<Vec<_>>()
                            .join("/"),
                        to.iter().map(|m| ast::qual_ident_text(m)).collect(),
                    ));
                }
                ast::ModuleDirective::Opens { package, to } => {
                    opens.push((
                        package
                            .iter()
                            .map(|id| id.name.as_str())
                            .collect::<Vec<_>>()
                            .join("/"),
                        to.iter().map(|m| ast::qual_ident_text(m)).collect(),
                    ));
                }
                ast::ModuleDirective::Uses { service } => {
                    uses.push(self.module_service_name(unit, service));
                }
                ast::ModuleDirective::Provides { service, with } => {
                    provides.push((
                        self.module_service_name(unit, service),
                        with.iter()
                            .map(|w| self.module_service_name(unit, w))
                            .collect(),
                    ));
                }
            }
        }
        if dotted != "java.base" && !requires.iter().any(|(m, _, _)| m == "java.base") {
            requires.push(("java.base".to_string(), false, false));
        }
        let mut bound = TypeBoundClass::sentinel(sym);
        bound.supertype = None;
        bound.access = AccessFlags::MODULE;
        bound.module = Some(ModuleBound {
            name: dotted,
            open: module.open,
            requires,
            exports,
            opens,
            uses,
            provides,
        });
        (sym, bound)
    }

    /// Resolve a service class named in a module directive to a binary
    /// name; imports in `module-info.java` apply.
    fn module_service_name(&self, unit: usize, name: &[ast::Ident]) -> String {
        let segments: Vec<String> = name.iter().map(|id| id.name.clone()).collect();
        // Single-type imports first.
        for (simple, full) in &self.imports[unit].single {
            if segments.len() == 1 && simple == &segments[0] {
                if let Some(sym) = self.resolve_absolute(full) {
                    return self.names.binary_name(sym);
                }
            }
        }
        if let Some(sym) = self.resolve_absolute(&segments) {
            return self.names.binary_name(sym);
        }
        self.report(
            unit,
            name.first().map(|id| id.span).unwrap_or(Span::synthetic()),
            DiagnosticKind::CannotResolve(segments.join(".")),
        );
        segments.join("/")
    }
}

pub(crate) fn kind_of(kind: ast::TypeKind) -> SourceKind {
    match kind {
        ast::TypeKind::Class => SourceKind::Class,
        ast::TypeKind::Interface => SourceKind::Interface,
        ast::TypeKind::Enum => SourceKind::Enum,
        ast::TypeKind::Annotation => SourceKind::Annotation,
        ast::TypeKind::Record => SourceKind::Record,
    }
}

pub(crate) fn mods_to_flags(mods: ast::Mods) -> AccessFlags {
    let mut access = AccessFlags::empty();
    for (from, to) in [
        (ast::Mods::PUBLIC, AccessFlags::PUBLIC),
        (ast::Mods::PROTECTED, AccessFlags::PROTECTED),
        (ast::Mods::PRIVATE, AccessFlags::PRIVATE),
        (ast::Mods::STATIC, AccessFlags::STATIC),
        (ast::Mods::ABSTRACT, AccessFlags::ABSTRACT),
        (ast::Mods::FINAL, AccessFlags::FINAL),
        (ast::Mods::NATIVE, AccessFlags::NATIVE),
        (ast::Mods::SYNCHRONIZED, AccessFlags::SYNCHRONIZED),
        (ast::Mods::TRANSIENT, AccessFlags::TRANSIENT),
        (ast::Mods::VOLATILE, AccessFlags::VOLATILE),
        (ast::Mods::STRICTFP, AccessFlags::STRICT),
        (ast::Mods::SEALED, AccessFlags::SEALED),
        (ast::Mods::NON_SEALED, AccessFlags::NON_SEALED),
    ] {
        if mods.contains(from) {
            access |= to;
        }
    }
    access
}

/// Wrap C-style declarator dimensions around a type; the leftmost written
/// dimension is the outermost array.
fn apply_extra_dims(
    ty: Type,
    dims: &[Vec<ast::Anno>],
    binder: &Binder<'_>,
    ctx: &ScopeCtx<'_>,
) -> Type {
    let mut result = ty;
    for annos in dims.iter().rev() {
        result = Type::Array(Box::new(result), binder.eval_annotations(ctx, annos));
    }
    result
}
