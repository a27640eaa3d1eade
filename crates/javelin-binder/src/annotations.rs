//! Phase 6: annotation binding and disambiguation.
//!
//! Declaration-position annotations are ambiguous until their `@Target` is
//! known: `@A int x;` may annotate the field, the type `int`, or both.
//! This phase evaluates them, partitions each by target, groups repeated
//! annotations into their containers, and extracts annotation-declaration
//! metadata (retention, targets, inherited, repeatable).

use crate::phases::Binder;
use crate::resolve::ScopeCtx;
use javelin_common::DiagnosticKind;
use javelin_common::names as bn;
use javelin_model::{
    AnnoValue, AnnotationMetadata, ClassSym, Const, Retention, SourceKind, TargetSet, Type,
    TypeBoundClass,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

impl<'a> Binder<'a> {
    /// Phase 6 driver.
    pub fn annotations(&mut self) {
        // Pass one: metadata for source annotation declarations, so pass
        // two can partition by target even when annotations are declared in
        // the same compilation.
        let mut metas: FxHashMap<ClassSym, AnnotationMetadata> = FxHashMap::default();
        let order = self.order.clone();
        for &sym in &order {
            let source = self.decls.get(&sym).expect("registered").clone();
            if source.decl.kind != javelin_parser::ast::TypeKind::Annotation {
                continue;
            }
            let ctx = ScopeCtx::of(sym, source.unit);
            let evaluated: Vec<AnnoValue> = source
                .decl
                .annotations
                .iter()
                .filter_map(|anno| self.eval_annotation(&ctx, anno))
                .collect();
            metas.insert(sym, self.extract_metadata(&evaluated));
        }
        for (sym, meta) in &metas {
            if let Some(bound) = self.bound.get_mut(sym) {
                Arc::make_mut(bound).anno_meta = Some(meta.clone());
            }
        }

        // Pass two: partition and attach.
        for &sym in &order {
            let source = self.decls.get(&sym).expect("registered").clone();
            let ctx = ScopeCtx::of(sym, source.unit);
            let sources = match self.anno_sources.remove(&sym) {
                Some(sources) => sources,
                None => continue,
            };
            let mut class = (*self.bound.get(&sym).expect("bound").clone()).clone();

            let class_site = if class.kind == SourceKind::Annotation {
                TargetSet::ANNOTATION_TYPE | TargetSet::TYPE
            } else {
                TargetSet::TYPE
            };
            let (decl_annos, _type_annos) =
                self.partition(&ctx, sources.class, class_site, sources_span(&sources));
            // A type-use-only annotation on a class declaration still lands
            // on the declaration: there is no separate type to carry it.
            class.annotations = decl_annos;

            for (index, annos, span) in &sources.fields {
                let (decl, type_use) = self.partition(&ctx, annos, TargetSet::FIELD, *span);
                let field = &mut class.fields[*index];
                field.annotations = decl;
                if !type_use.is_empty() {
                    field.ty = attach_type_annotations(field.ty.clone(), type_use);
                }
            }
            for (index, annos, param_annos, span) in &sources.methods {
                let method = &mut class.methods[*index];
                let site = if method.name == "<init>" {
                    TargetSet::CONSTRUCTOR
                } else {
                    TargetSet::METHOD
                };
                let (decl, type_use) = self.partition(&ctx, annos, site, *span);
                method.annotations = decl;
                if !type_use.is_empty() {
                    method.return_ty =
                        attach_type_annotations(method.return_ty.clone(), type_use);
                }
                for (param_index, annos) in param_annos.iter().enumerate() {
                    let (decl, type_use) =
                        self.partition(&ctx, annos, TargetSet::PARAMETER, *span);
                    let param = &mut method.params[param_index];
                    param.annotations = decl;
                    if !type_use.is_empty() {
                        param.ty = attach_type_annotations(param.ty.clone(), type_use);
                    }
                }
            }
            // Record components propagate to the component, its field, its
            // accessor, and the canonical constructor parameter, each
            // according to the annotation's targets.
            for (index, annos, span) in &sources.components {
                self.distribute_component_annotations(&ctx, &mut class, *index, annos, *span);
            }

            self.bound.insert(sym, Arc::new(class));
        }
        trace!("annotation phase complete");
    }

    /// Evaluate and partition declaration-position annotations by target:
    /// `(declaration annotations, type-use annotations)`, both with
    /// repeated annotations grouped.
    fn partition(
        &self,
        ctx: &ScopeCtx<'_>,
        annos: &[javelin_parser::ast::Anno],
        site: TargetSet,
        span: javelin_common::Span,
    ) -> (Vec<AnnoValue>, Vec<AnnoValue>) {
        let mut decl = Vec::new();
        let mut type_use = Vec::new();
        for anno in annos {
            let Some(value) = self.eval_annotation(ctx, anno) else {
                continue;
            };
            let targets = self.targets_of(value.sym);
            let on_decl = targets.allows_declaration(site);
            let on_type = targets.allows_type_use();
            if on_decl {
                decl.push(value.clone());
            }
            if on_type && !on_decl {
                type_use.push(value);
            } else if !on_decl && !on_type {
                let _ = span;
                if self.options.report_untargeted_annotations {
                    let name = self.names.binary_name(value.sym);
                    self.report(
                        ctx.unit,
                        anno.span,
                        DiagnosticKind::UntargetedAnnotation(bn::display_name(&name)),
                    );
                }
            }
        }
        (self.group_repeatable(decl), self.group_repeatable(type_use))
    }

    fn distribute_component_annotations(
        &self,
        ctx: &ScopeCtx<'_>,
        class: &mut TypeBoundClass,
        index: usize,
        annos: &[javelin_parser::ast::Anno],
        span: javelin_common::Span,
    ) {
        let component_name = class.components[index].name.clone();
        let mut on_component = Vec::new();
        let mut on_field = Vec::new();
        let mut on_method = Vec::new();
        let mut on_param = Vec::new();
        let mut on_type = Vec::new();
        for anno in annos {
            let Some(value) = self.eval_annotation(ctx, anno) else {
                continue;
            };
            let targets = self.targets_of(value.sym);
            let mut any = false;
            if targets.contains(TargetSet::RECORD_COMPONENT) {
                on_component.push(value.clone());
                any = true;
            }
            if targets.contains(TargetSet::FIELD) {
                on_field.push(value.clone());
                any = true;
            }
            if targets.contains(TargetSet::METHOD) {
                on_method.push(value.clone());
                any = true;
            }
            if targets.contains(TargetSet::PARAMETER) {
                on_param.push(value.clone());
                any = true;
            }
            if targets.allows_type_use() {
                on_type.push(value.clone());
                any = true;
            }
            if !any && self.options.report_untargeted_annotations {
                let name = self.names.binary_name(value.sym);
                self.report(
                    ctx.unit,
                    span,
                    DiagnosticKind::UntargetedAnnotation(bn::display_name(&name)),
                );
            }
        }
        let on_type = self.group_repeatable(on_type);
        class.components[index].annotations = self.group_repeatable(on_component);
        if !on_type.is_empty() {
            class.components[index].ty =
                attach_type_annotations(class.components[index].ty.clone(), on_type.clone());
        }
        if let Some(field) = class
            .fields
            .iter_mut()
            .find(|f| f.name == component_name)
        {
            field.annotations = self.group_repeatable(on_field);
            if !on_type.is_empty() {
                field.ty = attach_type_annotations(field.ty.clone(), on_type.clone());
            }
        }
        if let Some(accessor) = class
            .methods
            .iter_mut()
            .find(|m| m.name == component_name && m.params.is_empty())
        {
            accessor.annotations = self.group_repeatable(on_method);
            if !on_type.is_empty() {
                accessor.return_ty =
                    attach_type_annotations(accessor.return_ty.clone(), on_type.clone());
            }
        }
        if let Some(ctor) = class.methods.iter_mut().find(|m| m.name == "<init>") {
            if let Some(param) = ctor.params.iter_mut().find(|p| p.name == component_name) {
                param.annotations = self.group_repeatable(on_param);
                if !on_type.is_empty() {
                    param.ty = attach_type_annotations(param.ty.clone(), on_type);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Annotation metadata
    // ------------------------------------------------------------------

    /// The `@Target` set of an annotation class, from source metadata,
    /// classpath metadata, or the no-`@Target` default.
    pub fn targets_of(&self, sym: ClassSym) -> TargetSet {
        self.metadata_of(sym).targets
    }

    pub fn metadata_of(&self, sym: ClassSym) -> AnnotationMetadata {
        if let Some(bound) = self.bound.get(&sym) {
            if let Some(meta) = &bound.anno_meta {
                return meta.clone();
            }
            // Source annotation not yet through pass one; derive directly.
            if let Some(source) = self.decls.get(&sym) {
                let ctx = ScopeCtx::of(sym, source.unit);
                let evaluated: Vec<AnnoValue> = source
                    .decl
                    .annotations
                    .iter()
                    .filter_map(|anno| self.eval_annotation(&ctx, anno))
                    .collect();
                return self.extract_metadata(&evaluated);
            }
        }
        if let Some(loaded) = self.classpath_class(sym) {
            if let Some(meta) = &loaded.anno_meta {
                return meta.clone();
            }
        }
        AnnotationMetadata::default()
    }

    /// Read `@Retention`, `@Target`, `@Inherited` and `@Repeatable` out of
    /// an evaluated annotation list.
    pub fn extract_metadata(&self, annotations: &[AnnoValue]) -> AnnotationMetadata {
        let mut meta = AnnotationMetadata::default();
        for anno in annotations {
            let name = self.names.binary_name(anno.sym);
            match name.as_str() {
                bn::RETENTION => {
                    if let Some(Const::EnumConst(field)) = anno.value("value") {
                        meta.retention = self.names.with(field.name, |n| match n {
                            "SOURCE" => Retention::Source,
                            "RUNTIME" => Retention::Runtime,
                            _ => Retention::Class,
                        });
                    }
                }
                bn::TARGET => {
                    let mut targets = TargetSet::empty();
                    let values: Vec<&Const> = match anno.value("value") {
                        Some(Const::Array(values)) => values.iter().collect(),
                        Some(single) => vec![single],
                        None => Vec::new(),
                    };
                    for value in values {
                        if let Const::EnumConst(field) = value {
                            self.names.with(field.name, |n| {
                                targets |= element_type_target(n);
                            });
                        }
                    }
                    meta.targets = targets;
                }
                bn::INHERITED => meta.inherited = true,
                bn::REPEATABLE => {
                    if let Some(Const::Class(Type::Class(container))) = anno.value("value") {
                        meta.repeatable = Some(container.sym());
                    }
                }
                _ => {}
            }
        }
        meta
    }

    // ------------------------------------------------------------------
    // Repeatable grouping
    // ------------------------------------------------------------------

    /// Collapse runs of the same repeatable annotation into one container
    /// annotation holding the array, preserving first-occurrence order.
    pub fn group_repeatable(&self, annotations: Vec<AnnoValue>) -> Vec<AnnoValue> {
        let mut counts: FxHashMap<ClassSym, usize> = FxHashMap::default();
        for anno in &annotations {
            *counts.entry(anno.sym).or_default() += 1;
        }
        if !counts.values().any(|&n| n > 1) {
            return annotations;
        }
        let mut grouped: Vec<AnnoValue> = Vec::new();
        let mut emitted: FxHashMap<ClassSym, bool> = FxHashMap::default();
        for anno in &annotations {
            if counts[&anno.sym] <= 1 {
                grouped.push(anno.clone());
                continue;
            }
            if *emitted.get(&anno.sym).unwrap_or(&false) {
                continue;
            }
            emitted.insert(anno.sym, true);
            let Some(container) = self.metadata_of(anno.sym).repeatable else {
                // Repeated but not repeatable: keep the duplicates and let
                // downstream consumers see what was written.
                grouped.extend(
                    annotations
                        .iter()
                        .filter(|a| a.sym == anno.sym)
                        .cloned(),
                );
                continue;
            };
            let repeats: Vec<Const> = annotations
                .iter()
                .filter(|a| a.sym == anno.sym)
                .map(|a| Const::Annotation(a.clone()))
                .collect();
            grouped.push(AnnoValue {
                sym: container,
                values: vec![("value".to_string(), Const::Array(repeats))],
            });
        }
        grouped
    }

    /// Narrow an element value to the element's declared type when it is
    /// known: integer literals narrow to `byte`/`short`/`char` elements,
    /// and single values destined for array elements get wrapped.
    pub fn coerce_element_value(&self, anno: ClassSym, element: &str, value: Const) -> Const {
        let Some(target) = self.element_descriptor(anno, element) else {
            return value;
        };
        let (is_array, base) = match target.strip_prefix('[') {
            Some(rest) => (true, rest.to_string()),
            None => (false, target),
        };
        let coerce_one = |value: Const| -> Const {
            let target = match base.as_str() {
                "B" => Some(javelin_model::PrimTy::Byte),
                "S" => Some(javelin_model::PrimTy::Short),
                "C" => Some(javelin_model::PrimTy::Char),
                "J" => Some(javelin_model::PrimTy::Long),
                "F" => Some(javelin_model::PrimTy::Float),
                "D" => Some(javelin_model::PrimTy::Double),
                _ => None,
            };
            match target {
                Some(prim) => crate::consteval::convert_assignment(
                    value.clone(),
                    crate::consteval::ConstTarget::Prim(prim),
                )
                .unwrap_or(value),
                None => value,
            }
        };
        match (is_array, value) {
            (true, Const::Array(values)) => {
                Const::Array(values.into_iter().map(coerce_one).collect())
            }
            (true, single) => Const::Array(vec![coerce_one(single)]),
            (false, single) => coerce_one(single),
        }
    }

    /// The erased descriptor of an annotation element's return type, from
    /// source AST or classpath.
    fn element_descriptor(&self, anno: ClassSym, element: &str) -> Option<String> {
        if let Some(bound) = self.bound.get(&anno) {
            let method = bound.methods.iter().find(|m| m.name == element)?;
            return Some(crate::relations::erased_descriptor_of(
                self,
                &method.return_ty,
            ));
        }
        if let Some(source) = self.decls.get(&anno) {
            for member in &source.decl.members {
                if let javelin_parser::ast::Member::Method(method) = member {
                    if method.name.name == element {
                        return ast_prim_descriptor(method.return_ty.as_ref()?);
                    }
                }
            }
            return None;
        }
        let loaded = self.classpath_class(anno)?;
        let method = loaded.methods.iter().find(|m| m.name == element)?;
        Some(crate::relations::erased_descriptor_of(self, &method.return_ty))
    }
}

/// A best-effort descriptor for primitive-ish AST return types, used before
/// the annotation class is member-bound.
fn ast_prim_descriptor(ty: &javelin_parser::ast::Ty) -> Option<String> {
    use javelin_parser::ast::{PrimKind, Ty};
    match ty {
        Ty::Primitive { kind, .. } => Some(
            match kind {
                PrimKind::Boolean => "Z",
                PrimKind::Byte => "B",
                PrimKind::Short => "S",
                PrimKind::Int => "I",
                PrimKind::Long => "J",
                PrimKind::Char => "C",
                PrimKind::Float => "F",
                PrimKind::Double => "D",
            }
            .to_string(),
        ),
        Ty::Array { element, .. } => Some(format!("[{}", ast_prim_descriptor(element)?)),
        _ => None,
    }
}

fn sources_span(sources: &crate::phases::AnnoSources<'_>) -> javelin_common::Span {
    sources
        .class
        .first()
        .map(|anno| anno.span)
        .unwrap_or(javelin_common::Span::synthetic())
}

/// Attach type-use annotations at the position a declaration-written
/// annotation denotes: the element type under all array dimensions, the
/// innermost named class of a qualified type, or the node itself.
pub fn attach_type_annotations(ty: Type, annotations: Vec<AnnoValue>) -> Type {
    match ty {
        Type::Array(element, own) => Type::Array(
            Box::new(attach_type_annotations(*element, annotations)),
            own,
        ),
        Type::Class(mut class_ty) => {
            if let Some(last) = class_ty.path.last_mut() {
                let mut merged = annotations;
                merged.append(&mut last.annotations);
                last.annotations = merged;
            }
            Type::Class(class_ty)
        }
        Type::Primitive(kind, mut own) => {
            let mut merged = annotations;
            merged.append(&mut own);
            Type::Primitive(kind, merged)
        }
        Type::TyVar(sym, mut own) => {
            let mut merged = annotations;
            merged.append(&mut own);
            Type::TyVar(sym, merged)
        }
        other => other,
    }
}

fn element_type_target(name: &str) -> TargetSet {
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
