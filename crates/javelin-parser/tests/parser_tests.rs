use javelin_common::DiagnosticKind;
use javelin_parser::ast::*;
use javelin_parser::parse_compilation_unit;

fn parse(source: &str) -> CompilationUnit {
    parse_compilation_unit("Test.java", source).expect("parse failure")
}

fn parse_err(source: &str) -> DiagnosticKind {
    parse_compilation_unit("Test.java", source)
        .expect_err("expected a parse error")
        .kind
}

fn first_type(unit: &CompilationUnit) -> &TypeDecl {
    unit.types.first().expect("no type declared")
}

#[test]
fn plain_class() {
    let unit = parse("package com.example;\nimport java.util.List;\nclass A { int x = 1 + 2; }");
    assert_eq!(
        unit.package.as_ref().map(|p| qual_ident_text(&p.name)),
        Some("com.example".to_string())
    );
    assert_eq!(unit.imports.len(), 1);
    assert!(!unit.imports[0].on_demand);
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Class);
    assert_eq!(decl.name.name, "A");
    assert_eq!(decl.members.len(), 1);
    let Member::Field(field) = &decl.members[0] else {
        panic!("expected field");
    };
    assert_eq!(field.name.name, "x");
    assert!(matches!(field.init, Some(Expr::Binary { op: BinOp::Add, .. })));
}

#[test]
fn method_bodies_are_skipped() {
    let unit = parse(
        "class A { int f(int a, int b) { if (a > b) { return a; } return b; } void g() {} }",
    );
    let decl = first_type(&unit);
    assert_eq!(decl.members.len(), 2);
    let Member::Method(f) = &decl.members[0] else {
        panic!("expected method");
    };
    assert_eq!(f.name.name, "f");
    assert_eq!(f.params.len(), 2);
}

#[test]
fn generics_and_bounds() {
    let unit = parse("class P<K extends Comparable<K> & java.io.Serializable, V> { K k; V v; }");
    let decl = first_type(&unit);
    assert_eq!(decl.type_params.len(), 2);
    assert_eq!(decl.type_params[0].name.name, "K");
    assert_eq!(decl.type_params[0].bounds.len(), 2);
    assert!(decl.type_params[1].bounds.is_empty());
}

#[test]
fn nested_generic_close() {
    // `>>` must split into two closing angle brackets.
    let unit = parse("class A { java.util.Map<String, java.util.List<String>> m; }");
    let decl = first_type(&unit);
    let Member::Field(field) = &decl.members[0] else {
        panic!("expected field");
    };
    let Ty::Named { segments, .. } = &field.ty else {
        panic!("expected named type");
    };
    let map_seg = segments.last().unwrap();
    assert_eq!(map_seg.args.len(), 2);
}

#[test]
fn interface_extends_goes_to_interfaces() {
    let unit = parse("interface I extends A, B {}");
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Interface);
    assert!(decl.superclass.is_none());
    assert_eq!(decl.interfaces.len(), 2);
}

#[test]
fn extends_after_implements_is_rejected() {
    assert_eq!(
        parse_err("class C implements I extends B {}"),
        DiagnosticKind::ExtendsAfterImplements
    );
}

#[test]
fn enum_constants_and_members() {
    let unit = parse(
        "enum E { A, B(1, 2), C { void f() {} }; static final int N = 3; E(int a, int b) {} E() {} }",
    );
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Enum);
    assert_eq!(decl.constants.len(), 3);
    assert!(!decl.constants[0].has_args);
    assert!(decl.constants[1].has_args);
    assert!(decl.constants[2].has_body);
    // One field plus two constructors survive as members.
    assert_eq!(decl.members.len(), 3);
}

#[test]
fn record_header() {
    let unit = parse("record Point(int x, int y) implements Comparable<Point> { public Point { } }");
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Record);
    assert_eq!(decl.components.len(), 2);
    assert_eq!(decl.components[0].name.name, "x");
    assert_eq!(decl.interfaces.len(), 1);
    // The compact constructor contributes nothing.
    assert!(decl.members.is_empty());
}

#[test]
fn record_is_contextual() {
    // `record` stays available as a member name.
    let unit = parse("class C { int record; int record(int x) { return x; } }");
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Class);
    assert_eq!(decl.members.len(), 2);
    assert!(matches!(decl.members[0], Member::Field(_)));
    assert!(matches!(decl.members[1], Member::Method(_)));
}

#[test]
fn sealed_hierarchy() {
    let unit = parse(
        "sealed interface I permits A, B {} final class A implements I {} non-sealed class B implements I {}",
    );
    assert_eq!(unit.types.len(), 3);
    assert!(unit.types[0].mods.contains(Mods::SEALED));
    assert_eq!(unit.types[0].permits.len(), 2);
    assert!(unit.types[1].mods.contains(Mods::FINAL));
    assert!(unit.types[2].mods.contains(Mods::NON_SEALED));
}

#[test]
fn sealed_is_contextual() {
    let unit = parse("class sealed { sealed sealed; }");
    let decl = first_type(&unit);
    assert_eq!(decl.name.name, "sealed");
    assert!(matches!(decl.members[0], Member::Field(_)));
}

#[test]
fn annotation_declaration_with_default() {
    let unit = parse("@interface Marker { int value() default 42; Class<?> type() default Object.class; }");
    let decl = first_type(&unit);
    assert_eq!(decl.kind, TypeKind::Annotation);
    let Member::Method(value) = &decl.members[0] else {
        panic!("expected method");
    };
    assert!(matches!(
        value.default_value,
        Some(Expr::Literal { value: Lit::Int(42), .. })
    ));
    let Member::Method(ty) = &decl.members[1] else {
        panic!("expected method");
    };
    assert!(matches!(ty.default_value, Some(Expr::ClassLit { .. })));
}

#[test]
fn annotation_uses() {
    let unit = parse("@Deprecated @SuppressWarnings(\"all\") @Custom(a = 1, b = {1, 2}) class C {}");
    let decl = first_type(&unit);
    assert_eq!(decl.annotations.len(), 3);
    assert_eq!(decl.annotations[1].args.len(), 1);
    assert!(decl.annotations[1].args[0].0.is_none());
    assert_eq!(decl.annotations[2].args.len(), 2);
    assert_eq!(
        decl.annotations[2].args[0].0.as_ref().map(|i| i.name.as_str()),
        Some("a")
    );
}

#[test]
fn bad_annotation_argument() {
    assert_eq!(
        parse_err("@A(1 +) class C {}"),
        DiagnosticKind::InvalidAnnotationArgument
    );
}

#[test]
fn multi_variable_fields_split() {
    let unit = parse("class C { static final int A = 1, B = A + 1, C2[] = {1, 2}; }");
    let decl = first_type(&unit);
    assert_eq!(decl.members.len(), 3);
    let names: Vec<_> = decl
        .members
        .iter()
        .map(|m| match m {
            Member::Field(f) => f.name.name.clone(),
            _ => panic!("expected field"),
        })
        .collect();
    assert_eq!(names, ["A", "B", "C2"]);
    let Member::Field(c2) = &decl.members[2] else {
        panic!()
    };
    assert_eq!(c2.extra_dims.len(), 1);
    assert!(matches!(c2.init, Some(Expr::ArrayInit { .. })));
}

#[test]
fn non_constant_initializer_is_dropped() {
    let unit = parse("class C { int a = compute(); int b = 2; }");
    let decl = first_type(&unit);
    let Member::Field(a) = &decl.members[0] else {
        panic!()
    };
    assert!(a.init.is_none());
    let Member::Field(b) = &decl.members[1] else {
        panic!()
    };
    assert!(b.init.is_some());
}

#[test]
fn constant_expression_shapes() {
    let unit = parse(
        "class C { static final long X = (long) 1 << 32; static final int Y = true ? 1 : 2; static final String S = \"a\" + \"b\"; }",
    );
    let decl = first_type(&unit);
    let inits: Vec<_> = decl
        .members
        .iter()
        .map(|m| match m {
            Member::Field(f) => f.init.as_ref().expect("constant init"),
            _ => panic!(),
        })
        .collect();
    assert!(matches!(
        inits[0],
        Expr::Binary { op: BinOp::Shl, .. }
    ));
    assert!(matches!(inits[1], Expr::Ternary { .. }));
    assert!(matches!(inits[2], Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn type_annotations_on_arrays() {
    let unit = parse("class C { @T int @U [] @V [] x; }");
    let decl = first_type(&unit);
    let Member::Field(field) = &decl.members[0] else {
        panic!()
    };
    // Declaration-position annotations are held apart until binding.
    assert_eq!(field.annotations.len(), 1);
    let Ty::Array { annotations, element, .. } = &field.ty else {
        panic!("expected array type");
    };
    assert_eq!(annotations.len(), 1);
    assert_eq!(qual_ident_text(&annotations[0].name), "U");
    let Ty::Array { annotations, element, .. } = element.as_ref() else {
        panic!("expected nested array type");
    };
    assert_eq!(qual_ident_text(&annotations[0].name), "V");
    assert!(matches!(element.as_ref(), Ty::Primitive { .. }));
}

#[test]
fn receiver_parameter() {
    let unit = parse("class C { void f(@A C this, int x) {} }");
    let decl = first_type(&unit);
    let Member::Method(method) = &decl.members[0] else {
        panic!()
    };
    assert!(method.receiver.is_some());
    assert_eq!(method.params.len(), 1);
}

#[test]
fn varargs_and_throws() {
    let unit = parse("class C { void f(int... xs) throws java.io.IOException, RuntimeException {} }");
    let decl = first_type(&unit);
    let Member::Method(method) = &decl.members[0] else {
        panic!()
    };
    assert!(method.params[0].varargs);
    assert_eq!(method.throws.len(), 2);
}

#[test]
fn module_declaration() {
    let unit = parse(
        "open module com.example.app { requires transitive com.example.lib; requires static annotations; exports com.example.api to friend.one, friend.two; opens com.example.internal; uses com.example.spi.Service; provides com.example.spi.Service with com.example.impl.Impl; }",
    );
    let module = unit.module.expect("module");
    assert!(module.open);
    assert_eq!(qual_ident_text(&module.name), "com.example.app");
    assert_eq!(module.directives.len(), 6);
    assert!(matches!(
        module.directives[0],
        ModuleDirective::Requires { transitive: true, is_static: false, .. }
    ));
    assert!(matches!(
        module.directives[1],
        ModuleDirective::Requires { is_static: true, .. }
    ));
    let ModuleDirective::Exports { to, .. } = &module.directives[2] else {
        panic!("expected exports");
    };
    assert_eq!(to.len(), 2);
}

#[test]
fn javadoc_attaches_to_declarations() {
    let unit = parse("/** class doc */ class C { /** field doc */ int x; int y; }");
    let decl = first_type(&unit);
    assert_eq!(decl.javadoc.as_deref(), Some(" class doc "));
    let Member::Field(x) = &decl.members[0] else {
        panic!()
    };
    assert_eq!(x.javadoc.as_deref(), Some(" field doc "));
    let Member::Field(y) = &decl.members[1] else {
        panic!()
    };
    assert!(y.javadoc.is_none());
}

#[test]
fn fatal_errors_carry_position() {
    let err = parse_compilation_unit("Test.java", "class {").expect_err("should fail");
    assert!(matches!(err.kind, DiagnosticKind::ExpectedToken(_)));
    assert_eq!(err.span.start, 6);
}
