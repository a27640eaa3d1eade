use javelin_binder::{BindOptions, BindResult, bind};
use javelin_classpath::stubs::CoreStubs;
use javelin_common::DiagnosticKind;
use javelin_model::{
    AccessFlags, Const, Names, PrimTy, Retention, SourceKind, TargetSet, Type, TypeBoundClass,
};
use javelin_parser::parse_compilation_unit;
use std::sync::Arc;

fn bind_files(sources: &[(&str, &str)]) -> (Names, BindResult) {
    let names = Names::new();
    let units: Vec<_> = sources
        .iter()
        .map(|(file, text)| parse_compilation_unit(file, text).expect("parse failure"))
        .collect();
    let stubs = CoreStubs::new();
    let result = bind(&units, &names, &stubs, BindOptions::default());
    (names, result)
}

fn bind_one(text: &str) -> (Names, BindResult) {
    bind_files(&[("Test.java", text)])
}

fn class<'r>(names: &Names, result: &'r BindResult, binary: &str) -> &'r Arc<TypeBoundClass> {
    result
        .classes
        .get(&names.class(binary))
        .unwrap_or_else(|| panic!("class {binary} not bound"))
}

fn kinds(result: &BindResult) -> Vec<DiagnosticKind> {
    result.diagnostics.iter().map(|d| d.kind.clone()).collect()
}

#[test]
fn plain_class_binds_and_folds() {
    let (names, result) = bind_one("class A { int x = 1 + 2; }");
    assert!(!result.diagnostics.has_errors());
    let a = class(&names, &result, "A");
    assert_eq!(a.kind, SourceKind::Class);
    assert_eq!(
        a.supertype.as_ref().and_then(|t| t.class_sym()),
        Some(names.class("java/lang/Object"))
    );
    let x = a.field("x").expect("field x");
    assert!(x.ty.same_type(&Type::Primitive(PrimTy::Int, Vec::new())));
    assert_eq!(x.constant, Some(Const::Int(3)));
}

#[test]
fn constants_fold_across_classes_and_units() {
    let (names, result) = bind_files(&[
        ("A.java", "package p; public class A { public static final int X = 2; }"),
        ("B.java", "package p; class B { static final int Y = A.X * 10; static final String S = \"v=\" + Y; }"),
    ]);
    assert!(!result.diagnostics.has_errors());
    let b = class(&names, &result, "p/B");
    assert_eq!(b.field("Y").unwrap().constant, Some(Const::Int(20)));
    assert_eq!(
        b.field("S").unwrap().constant,
        Some(Const::Str("v=20".to_string()))
    );
}

#[test]
fn constant_narrowing_to_declared_type() {
    let (names, result) = bind_one(
        "class C { static final byte B = 1 + 2; static final long L = 7; static final double D = 3; static final char CH = 65; }",
    );
    let c = class(&names, &result, "C");
    assert_eq!(c.field("B").unwrap().constant, Some(Const::Byte(3)));
    assert_eq!(c.field("L").unwrap().constant, Some(Const::Long(7)));
    assert_eq!(c.field("D").unwrap().constant, Some(Const::Double(3.0)));
    assert_eq!(c.field("CH").unwrap().constant, Some(Const::Char(65)));
}

#[test]
fn cyclic_constants_are_reported() {
    let (_names, result) =
        bind_one("class C { static final int A = B + 1; static final int B = A + 1; }");
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::CyclicConstant(_)))
    );
}

#[test]
fn cyclic_inheritance_is_cut() {
    let (names, result) = bind_one("class A extends B {} class B extends A {}");
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::CyclicInheritance(_)))
    );
    // The cycle was cut back to Object somewhere, so supertype chains
    // terminate.
    let a = class(&names, &result, "A");
    let b = class(&names, &result, "B");
    let object = names.class("java/lang/Object");
    assert!(
        a.supertype.as_ref().and_then(|t| t.class_sym()) == Some(object)
            || b.supertype.as_ref().and_then(|t| t.class_sym()) == Some(object)
    );
}

#[test]
fn generics_bind_with_bounds() {
    let (names, result) =
        bind_one("class P<K extends Comparable<K>, V> { K k; V v; java.util.List<V> list; }");
    assert!(!result.diagnostics.has_errors());
    let p = class(&names, &result, "P");
    assert_eq!(p.type_params.len(), 2);
    assert_eq!(p.type_params[0].bounds.len(), 1);
    let k = p.field("k").expect("field k");
    assert!(matches!(k.ty, Type::TyVar(sym, _) if sym == p.type_params[0].sym));
    let list = p.field("list").expect("field list");
    let Type::Class(list_ty) = &list.ty else {
        panic!("expected class type");
    };
    assert_eq!(list_ty.sym(), names.class("java/util/List"));
    assert_eq!(list_ty.path[0].args.len(), 1);
}

#[test]
fn imports_resolve() {
    let (names, result) = bind_files(&[
        ("lib.java", "package lib; public class Helper { public static final int K = 5; }"),
        (
            "use1.java",
            "package app; import lib.Helper; class One { Helper h; static final int N = Helper.K; }",
        ),
        ("use2.java", "package app; import lib.*; class Two { Helper h; }"),
        ("use3.java", "package app; class Three { String s; }"),
        (
            "use4.java",
            "package app; import static lib.Helper.K; class Four { static final int M = K + 1; }",
        ),
    ]);
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let one = class(&names, &result, "app/One");
    assert_eq!(
        one.field("h").unwrap().ty.class_sym(),
        Some(names.class("lib/Helper"))
    );
    assert_eq!(one.field("N").unwrap().constant, Some(Const::Int(5)));
    let two = class(&names, &result, "app/Two");
    assert_eq!(
        two.field("h").unwrap().ty.class_sym(),
        Some(names.class("lib/Helper"))
    );
    // Implicit java.lang.*.
    let three = class(&names, &result, "app/Three");
    assert_eq!(
        three.field("s").unwrap().ty.class_sym(),
        Some(names.class("java/lang/String"))
    );
    let four = class(&names, &result, "app/Four");
    assert_eq!(four.field("M").unwrap().constant, Some(Const::Int(6)));
}

#[test]
fn unresolved_supertype_defaults_to_object() {
    let (names, result) = bind_one("class A extends DoesNotExist {}");
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::CannotResolve(_)))
    );
    let a = class(&names, &result, "A");
    assert_eq!(
        a.supertype.as_ref().and_then(|t| t.class_sym()),
        Some(names.class("java/lang/Object"))
    );
}

#[test]
fn nested_classes_and_member_scope() {
    let (names, result) = bind_one(
        "class Outer { static class Mid { class Inner {} } Mid m; Mid.Inner i; }",
    );
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let outer = class(&names, &result, "Outer");
    assert_eq!(outer.children.len(), 1);
    let mid = class(&names, &result, "Outer$Mid");
    assert_eq!(mid.owner, Some(names.class("Outer")));
    assert!(mid.access.contains(AccessFlags::STATIC));
    let inner = class(&names, &result, "Outer$Mid$Inner");
    assert_eq!(inner.owner, Some(names.class("Outer$Mid")));
    assert!(!inner.access.contains(AccessFlags::STATIC));
    assert_eq!(
        outer.field("i").unwrap().ty.class_sym(),
        Some(names.class("Outer$Mid$Inner"))
    );
}

#[test]
fn inherited_nested_types_are_in_scope() {
    let (names, result) = bind_files(&[(
        "T.java",
        "class Base { static class Nested {} } class Sub extends Base { Nested n; }",
    )]);
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let sub = class(&names, &result, "Sub");
    assert_eq!(
        sub.field("n").unwrap().ty.class_sym(),
        Some(names.class("Base$Nested"))
    );
}

#[test]
fn enums_synthesize_members() {
    let (names, result) = bind_one("enum E { A, B }");
    assert!(!result.diagnostics.has_errors());
    let e = class(&names, &result, "E");
    assert_eq!(e.kind, SourceKind::Enum);
    assert!(e.access.contains(AccessFlags::ENUM | AccessFlags::FINAL));
    let a = e.field("A").expect("constant A");
    assert!(a.access.contains(AccessFlags::ENUM | AccessFlags::STATIC));
    assert_eq!(a.ty.class_sym(), Some(names.class("E")));
    // Enum<E> supertype with the self type argument.
    let Type::Class(supertype) = e.supertype.as_ref().unwrap() else {
        panic!("expected class supertype");
    };
    assert_eq!(supertype.sym(), names.class("java/lang/Enum"));
    assert_eq!(supertype.path[0].args.len(), 1);
    assert!(e.methods.iter().any(|m| m.name == "values"));
    assert!(e.methods.iter().any(|m| m.name == "valueOf"));
}

#[test]
fn records_synthesize_members() {
    let (names, result) = bind_one("record Point(int x, int y) {}");
    assert!(!result.diagnostics.has_errors());
    let point = class(&names, &result, "Point");
    assert_eq!(point.kind, SourceKind::Record);
    assert_eq!(point.components.len(), 2);
    assert!(point.field("x").unwrap().access.contains(AccessFlags::PRIVATE));
    let ctor = point
        .methods
        .iter()
        .find(|m| m.name == "<init>")
        .expect("canonical constructor");
    assert_eq!(ctor.params.len(), 2);
    assert!(point.methods.iter().any(|m| m.name == "x" && m.params.is_empty()));
    assert!(point.methods.iter().any(|m| m.name == "equals"));
    assert_eq!(
        point.supertype.as_ref().and_then(|t| t.class_sym()),
        Some(names.class("java/lang/Record"))
    );
}

#[test]
fn interface_members_get_implicit_flags() {
    let (names, result) = bind_one(
        "interface I { int F = 1; void m(); default void d() {} static void s() {} }",
    );
    let i = class(&names, &result, "I");
    let f = i.field("F").unwrap();
    assert!(f.access.contains(
        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL
    ));
    assert_eq!(f.constant, Some(Const::Int(1)));
    let m = i.methods.iter().find(|m| m.name == "m").unwrap();
    assert!(m.access.contains(AccessFlags::PUBLIC | AccessFlags::ABSTRACT));
    let d = i.methods.iter().find(|m| m.name == "d").unwrap();
    assert!(d.access.contains(AccessFlags::DEFAULT_METHOD));
    assert!(!d.access.contains(AccessFlags::ABSTRACT));
}

#[test]
fn sealed_permits_checks() {
    let (_names, result) = bind_files(&[(
        "S.java",
        "sealed interface I permits A {} final class A implements I {} class B implements I {}",
    )]);
    // B implements a sealed interface without permission.
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::BadSealedPermits(_)))
    );
}

#[test]
fn sealed_permits_inference_from_unit() {
    let (names, result) = bind_files(&[(
        "S.java",
        "sealed class Shape {} final class Circle extends Shape {} final class Square extends Shape {}",
    )]);
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let shape = class(&names, &result, "Shape");
    assert_eq!(shape.permits.len(), 2);
}

#[test]
fn non_sealed_requires_sealed_supertype() {
    let (_names, result) = bind_one("class Base {} non-sealed class Sub extends Base {}");
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::NonSealedRequiresSealed(_)))
    );
}

#[test]
fn annotation_metadata_is_extracted() {
    let (names, result) = bind_one(
        "import java.lang.annotation.*; @Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface TU { int value() default 3; }",
    );
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let tu = class(&names, &result, "TU");
    assert_eq!(tu.kind, SourceKind::Annotation);
    let meta = tu.anno_meta.as_ref().expect("metadata");
    assert_eq!(meta.retention, Retention::Runtime);
    assert_eq!(meta.targets, TargetSet::TYPE_USE);
    let value = tu.methods.iter().find(|m| m.name == "value").unwrap();
    assert_eq!(value.default_value, Some(Const::Int(3)));
}

#[test]
fn type_use_annotation_moves_to_the_type() {
    let (names, result) = bind_one(
        "import java.lang.annotation.*; @Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface TU {} class C { @TU int x; }",
    );
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let c = class(&names, &result, "C");
    let x = c.field("x").unwrap();
    // Not a declaration annotation; attached to the int type instead.
    assert!(x.annotations.is_empty());
    let Type::Primitive(PrimTy::Int, annos) = &x.ty else {
        panic!("expected int");
    };
    assert_eq!(annos.len(), 1);
    assert_eq!(annos[0].sym, names.class("TU"));
}

#[test]
fn repeatable_annotations_group_into_container() {
    let (names, result) = bind_one(
        "import java.lang.annotation.*; @Retention(RetentionPolicy.RUNTIME) @Repeatable(RS.class) @interface R { int value(); } @Retention(RetentionPolicy.RUNTIME) @interface RS { R[] value(); } @R(1) @R(2) @R(3) class T {}",
    );
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let t = class(&names, &result, "T");
    assert_eq!(t.annotations.len(), 1);
    let container = &t.annotations[0];
    assert_eq!(container.sym, names.class("RS"));
    let Some(Const::Array(repeats)) = container.value("value") else {
        panic!("expected array value");
    };
    assert_eq!(repeats.len(), 3);
    let values: Vec<_> = repeats
        .iter()
        .map(|c| match c {
            Const::Annotation(anno) => anno.value("value").cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec![Some(Const::Int(1)), Some(Const::Int(2)), Some(Const::Int(3))]
    );
}

#[test]
fn enum_constant_annotation_values() {
    let (names, result) = bind_one(
        "import java.lang.annotation.*; enum Color { RED, GREEN } @Retention(RetentionPolicy.RUNTIME) @interface Paint { Color value(); } @Paint(Color.RED) class C {}",
    );
    assert!(!result.diagnostics.has_errors(), "{:?}", kinds(&result));
    let c = class(&names, &result, "C");
    let paint = &c.annotations[0];
    let Some(Const::EnumConst(field)) = paint.value("value") else {
        panic!("expected enum constant");
    };
    assert_eq!(field.owner, names.class("Color"));
    assert_eq!(names.resolve(field.name), "RED");
}

#[test]
fn non_public_cross_package_reference_is_reported() {
    let (_names, result) = bind_files(&[
        ("a.java", "package a; class Hidden {}"),
        ("b.java", "package b; class User { a.Hidden h; }"),
    ]);
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::SymbolNotAccessible(_)))
    );
}

#[test]
fn top_level_membership_modifiers_are_rejected() {
    let (names, result) = bind_one("private class P {}");
    assert!(
        kinds(&result)
            .iter()
            .any(|k| matches!(k, DiagnosticKind::UnexpectedModifier(_)))
    );
    // The stray modifier is dropped rather than emitted.
    let p = class(&names, &result, "P");
    assert!(!p.access.contains(AccessFlags::PRIVATE));
}

#[test]
fn module_declarations_bind() {
    let (names, result) = bind_files(&[(
        "module-info.java",
        "module com.example.app { requires transitive java.base; exports com.example.api; }",
    )]);
    let sym = names.class("com/example/app/module-info");
    let module_class = result.classes.get(&sym).expect("module pseudo-class");
    let module = module_class.module.as_ref().expect("module info");
    assert_eq!(module.name, "com.example.app");
    assert!(!module.open);
    assert_eq!(module.requires.len(), 1);
    assert_eq!(module.exports.len(), 1);
    assert_eq!(module.exports[0].0, "com/example/api");
}
