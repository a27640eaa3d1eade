//! Sealed-hierarchy checks, run after the hierarchy phase.
//!
//! A sealed class must end up with a non-empty permits set (explicit, or
//! inferred from direct subtypes in the same compilation unit), every
//! permitted subtype must be `final`, `sealed` or `non-sealed`, and every
//! subtype of a sealed type must be permitted.

use crate::phases::Binder;
use javelin_common::DiagnosticKind;
use javelin_common::names as bn;
use javelin_model::{AccessFlags, ClassSym};
use std::sync::Arc;

pub fn check_sealed(binder: &mut Binder<'_>) {
    let order = binder.order.clone();

    // Infer missing permits lists from same-unit subtypes.
    for &sym in &order {
        let header = binder.headers.get(&sym).expect("header").clone();
        if !header.access.contains(AccessFlags::SEALED) || !header.permits.is_empty() {
            continue;
        }
        let unit = binder.decls.get(&sym).map(|s| s.unit);
        let mut inferred: Vec<ClassSym> = Vec::new();
        for &candidate in &order {
            if candidate == sym || binder.decls.get(&candidate).map(|s| s.unit) != unit {
                continue;
            }
            let candidate_header = binder.headers.get(&candidate).expect("header");
            let extends = candidate_header.superclass == Some(sym)
                || candidate_header.interfaces.contains(&sym);
            if extends {
                inferred.push(candidate);
            }
        }
        if inferred.is_empty() {
            report_for(binder, sym, |name| DiagnosticKind::BadSealedPermits(name));
            continue;
        }
        let mut fixed = (*header).clone();
        fixed.permits = inferred.clone();
        binder.headers.insert(sym, Arc::new(fixed));
        if let Some(hierarchy) = binder.hierarchies.get(&sym) {
            let mut fixed = (**hierarchy).clone();
            fixed.header.permits = inferred;
            binder.hierarchies.insert(sym, Arc::new(fixed));
        }
    }

    for &sym in &order {
        let header = binder.headers.get(&sym).expect("header").clone();

        // Permitted subtypes must close the hierarchy.
        if header.access.contains(AccessFlags::SEALED) {
            for &permitted in &header.permits {
                let ok = if let Some(sub) = binder.headers.get(&permitted) {
                    sub.access.intersects(
                        AccessFlags::FINAL | AccessFlags::SEALED | AccessFlags::NON_SEALED,
                    )
                } else {
                    // Classpath subtypes: `non-sealed` leaves no trace in
                    // the class file, so nothing can be verified.
                    true
                };
                if !ok {
                    report_for(binder, permitted, |name| {
                        DiagnosticKind::BadSealedPermits(name)
                    });
                }
            }
        }

        // Every sealed supertype must permit this class.
        let mut has_sealed_supertype = false;
        let mut supers: Vec<ClassSym> = Vec::new();
        supers.extend(header.superclass);
        supers.extend(header.interfaces.iter().copied());
        for parent in supers {
            let permits = if let Some(parent_header) = binder.headers.get(&parent) {
                if !parent_header.access.contains(AccessFlags::SEALED) {
                    continue;
                }
                parent_header.permits.clone()
            } else if let Some(loaded) = binder.classpath_class(parent) {
                if loaded.permits.is_empty() {
                    continue;
                }
                loaded.permits.clone()
            } else {
                continue;
            };
            has_sealed_supertype = true;
            if !permits.contains(&sym) {
                report_for(binder, sym, |name| DiagnosticKind::BadSealedPermits(name));
            }
        }
        if header.access.contains(AccessFlags::NON_SEALED) && !has_sealed_supertype {
            report_for(binder, sym, |name| {
                DiagnosticKind::NonSealedRequiresSealed(name)
            });
        }
    }
}

fn report_for(
    binder: &Binder<'_>,
    sym: ClassSym,
    kind: impl FnOnce(String) -> DiagnosticKind,
) {
    let (unit, span) = binder
        .decls
        .get(&sym)
        .map(|s| (s.unit, s.decl.name.span))
        .unwrap_or((0, javelin_common::Span::synthetic()));
    let name = binder.names.binary_name(sym);
    binder.report(unit, span, kind(bn::display_name(&name)));
}
