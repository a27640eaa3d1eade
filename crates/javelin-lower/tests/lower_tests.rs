//! End-to-end lowering: parse, bind, lower, serialise, read back.

use javelin_binder::{BindOptions, BindResult, FullEnv, bind};
use javelin_classfile::{ClassFile, ElemConst, TargetInfo, TypePathStep, read_class, write_class};
use javelin_classpath::stubs::CoreStubs;
use javelin_model::Names;
use javelin_parser::parse_compilation_unit;

fn compile(sources: &[(&str, &str)]) -> Vec<ClassFile> {
    let names = Names::new();
    let units: Vec<_> = sources
        .iter()
        .map(|(file, text)| parse_compilation_unit(file, text).expect("parse failure"))
        .collect();
    let stubs = CoreStubs::new();
    let result: BindResult = bind(&units, &names, &stubs, BindOptions::default());
    assert!(
        !result.diagnostics.has_errors(),
        "bind diagnostics: {:?}",
        result.diagnostics.iter().collect::<Vec<_>>()
    );
    let env = FullEnv {
        classes: &result.classes,
        classpath: &stubs,
        names: &names,
    };
    result
        .classes
        .values()
        .map(|class| {
            let lowered = javelin_lower::lower_class(class, &env, 65);
            // Everything we lower must survive a serialisation round trip.
            let bytes = write_class(&lowered).expect("serialise");
            read_class(&bytes).expect("re-read")
        })
        .collect()
}

fn find<'c>(classes: &'c [ClassFile], name: &str) -> &'c ClassFile {
    classes
        .iter()
        .find(|cf| cf.name == name)
        .unwrap_or_else(|| panic!("no class {name}"))
}

#[test]
fn plain_class_constant_value() {
    let classes = compile(&[("A.java", "class A { int x = 1 + 2; }")]);
    let a = find(&classes, "A");
    assert_eq!(a.super_name.as_deref(), Some("java/lang/Object"));
    let x = &a.fields[0];
    assert_eq!(x.descriptor, "I");
    assert_eq!(x.constant, Some(ElemConst::Int(3)));
    // No signature on a non-generic field.
    assert!(x.signature.is_none());
    assert!(a.signature.is_none());
}

#[test]
fn generic_pair_signatures() {
    let classes = compile(&[("P.java", "class P<K, V> { K k; V v; }")]);
    let p = find(&classes, "P");
    assert_eq!(
        p.signature.as_deref(),
        Some("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;")
    );
    let k = p.fields.iter().find(|f| f.name == "k").unwrap();
    assert_eq!(k.descriptor, "Ljava/lang/Object;");
    assert_eq!(k.signature.as_deref(), Some("TK;"));
}

#[test]
fn bounded_type_parameter_signature() {
    let classes = compile(&[(
        "C.java",
        "class C<T extends Comparable<T>> { T best(java.util.List<T> xs) { return null; } }",
    )]);
    let c = find(&classes, "C");
    // Interface-first bounds leave the class bound slot empty.
    assert_eq!(
        c.signature.as_deref(),
        Some("<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;")
    );
    let best = c.methods.iter().find(|m| m.name == "best").unwrap();
    assert_eq!(best.descriptor, "(Ljava/util/List;)Ljava/lang/Comparable;");
    assert_eq!(best.signature.as_deref(), Some("(Ljava/util/List<TT;>;)TT;"));
}

#[test]
fn nested_inner_class_attributes() {
    let classes = compile(&[(
        "Outer.java",
        "class Outer { static class Mid { class Inner {} } }",
    )]);
    for name in ["Outer", "Outer$Mid", "Outer$Mid$Inner"] {
        let cf = find(&classes, name);
        let entries: Vec<&str> = cf
            .inner_classes
            .iter()
            .map(|e| e.inner.as_str())
            .collect();
        // Outer-before-inner among the entries present in this file.
        if let (Some(mid), Some(inner)) = (
            entries.iter().position(|&e| e == "Outer$Mid"),
            entries.iter().position(|&e| e == "Outer$Mid$Inner"),
        ) {
            assert!(mid < inner, "outer entry must precede inner in {name}");
        }
    }
    // The nested static class keeps `static` in the attribute but not in
    // its own class-level flags.
    let mid = find(&classes, "Outer$Mid");
    assert_eq!(mid.access & 0x0008, 0, "class-level static must be stripped");
    let entry = mid
        .inner_classes
        .iter()
        .find(|e| e.inner == "Outer$Mid")
        .expect("own entry");
    assert_ne!(entry.access & 0x0008, 0, "attribute keeps the static bit");
    assert_eq!(entry.outer.as_deref(), Some("Outer"));
    assert_eq!(entry.inner_name.as_deref(), Some("Mid"));
    // Nest attributes tie the group together.
    let outer = find(&classes, "Outer");
    assert!(outer.nest_members.contains(&"Outer$Mid".to_string()));
    assert!(outer.nest_members.contains(&"Outer$Mid$Inner".to_string()));
    let inner = find(&classes, "Outer$Mid$Inner");
    assert_eq!(inner.nest_host.as_deref(), Some("Outer"));
}

#[test]
fn sealed_hierarchy_emission() {
    let classes = compile(&[(
        "S.java",
        "sealed interface I permits A, B {} final class A implements I {} non-sealed class B implements I {}",
    )]);
    let i = find(&classes, "I");
    assert_eq!(i.permitted_subclasses, vec!["A", "B"]);
    let a = find(&classes, "A");
    assert_ne!(a.access & 0x0010, 0, "A is final");
    let b = find(&classes, "B");
    // `non-sealed` has no class-file bit: B is neither final nor sealed.
    assert_eq!(b.access & 0x0010, 0);
    assert!(b.permitted_subclasses.is_empty());
}

#[test]
fn type_annotations_on_arrays() {
    let classes = compile(&[(
        "T.java",
        "import java.lang.annotation.*;\n@Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface T {}\n@Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface U {}\n@Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface V {}\nclass C { @T int @U [] @V [] x; }",
    )]);
    let c = find(&classes, "C");
    let x = c.fields.iter().find(|f| f.name == "x").unwrap();
    assert_eq!(x.descriptor, "[[I");
    let mut paths: Vec<(String, Vec<TypePathStep>)> = x
        .type_annotations
        .iter()
        .map(|ta| {
            assert_eq!(ta.target, TargetInfo::Field);
            (ta.annotation.type_descriptor.clone(), ta.path.clone())
        })
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            (
                "LT;".to_string(),
                vec![TypePathStep::Array, TypePathStep::Array]
            ),
            ("LU;".to_string(), vec![]),
            ("LV;".to_string(), vec![TypePathStep::Array]),
        ]
    );
}

#[test]
fn type_annotations_on_type_arguments() {
    let classes = compile(&[(
        "G.java",
        "import java.lang.annotation.*;\n@Retention(RetentionPolicy.RUNTIME) @Target(ElementType.TYPE_USE) @interface N {}\nclass G { java.util.List<@N String> xs; }",
    )]);
    let g = find(&classes, "G");
    let xs = g.fields.iter().find(|f| f.name == "xs").unwrap();
    assert_eq!(xs.type_annotations.len(), 1);
    assert_eq!(
        xs.type_annotations[0].path,
        vec![TypePathStep::TypeArgument(0)]
    );
}

#[test]
fn repeated_annotations_collapse_into_container() {
    let classes = compile(&[(
        "R.java",
        "import java.lang.annotation.*;\n@Retention(RetentionPolicy.RUNTIME) @Repeatable(RS.class) @interface R { int value(); }\n@Retention(RetentionPolicy.RUNTIME) @interface RS { R[] value(); }\n@R(1) @R(2) @R(3) class T {}",
    )]);
    let t = find(&classes, "T");
    let visible: Vec<_> = t.annotations.iter().filter(|a| a.visible).collect();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].type_descriptor, "LRS;");
    let (_, value) = &visible[0].values[0];
    let javelin_classfile::ElementValue::Array(repeats) = value else {
        panic!("expected array");
    };
    assert_eq!(repeats.len(), 3);
    for (index, repeat) in repeats.iter().enumerate() {
        let javelin_classfile::ElementValue::Annotation(anno) = repeat else {
            panic!("expected nested annotation");
        };
        assert_eq!(anno.type_descriptor, "LR;");
        assert_eq!(
            anno.values[0].1,
            javelin_classfile::ElementValue::Const(ElemConst::Int(index as i32 + 1))
        );
    }
}

#[test]
fn enum_lowering() {
    let classes = compile(&[("E.java", "enum E { A, B }")]);
    let e = find(&classes, "E");
    assert_eq!(e.super_name.as_deref(), Some("java/lang/Enum"));
    assert_eq!(
        e.signature.as_deref(),
        Some("Ljava/lang/Enum<LE;>;"),
    );
    let a = e.fields.iter().find(|f| f.name == "A").unwrap();
    assert_eq!(a.descriptor, "LE;");
    assert_ne!(a.access & 0x4000, 0, "enum bit");
    let values = e.methods.iter().find(|m| m.name == "values").unwrap();
    assert_eq!(values.descriptor, "()[LE;");
    let value_of = e.methods.iter().find(|m| m.name == "valueOf").unwrap();
    assert_eq!(value_of.descriptor, "(Ljava/lang/String;)LE;");
    // The implicit private constructor is not emitted.
    assert!(!e.methods.iter().any(|m| m.name == "<init>"));
}

#[test]
fn record_lowering() {
    let classes = compile(&[("P.java", "record Point(int x, int y) {}")]);
    let p = find(&classes, "Point");
    assert_eq!(p.super_name.as_deref(), Some("java/lang/Record"));
    assert_eq!(p.record_components.len(), 2);
    assert_eq!(p.record_components[0].name, "x");
    assert_eq!(p.record_components[0].descriptor, "I");
    let ctor = p.methods.iter().find(|m| m.name == "<init>").unwrap();
    assert_eq!(ctor.descriptor, "(II)V");
    assert_eq!(
        ctor.method_parameters,
        vec![(Some("x".to_string()), 0), (Some("y".to_string()), 0)]
    );
    // Private component fields are omitted from the field table.
    assert!(p.fields.is_empty());
    assert!(p.methods.iter().any(|m| m.name == "x"));
}

#[test]
fn throws_and_varargs() {
    let classes = compile(&[(
        "M.java",
        "class M { void f(int... xs) throws java.io.IOException {} }",
    )]);
    let m = find(&classes, "M");
    let f = m.methods.iter().find(|mi| mi.name == "f").unwrap();
    assert_eq!(f.descriptor, "([I)V");
    assert_ne!(f.access & 0x0080, 0, "varargs bit");
    assert_eq!(f.exceptions, vec!["java/io/IOException".to_string()]);
}

#[test]
fn deprecated_attribute() {
    let classes = compile(&[(
        "D.java",
        "@Deprecated class D { /** @deprecated use something else */ int old; }",
    )]);
    let d = find(&classes, "D");
    assert!(d.deprecated);
    // @Deprecated is also retained as a runtime-visible annotation.
    assert!(
        d.annotations
            .iter()
            .any(|a| a.type_descriptor == "Ljava/lang/Deprecated;" && a.visible)
    );
    assert!(d.fields.iter().find(|f| f.name == "old").unwrap().deprecated);
}

#[test]
fn private_members_are_omitted() {
    let classes = compile(&[(
        "P.java",
        "class P { private int hidden; int visible; private void h() {} void v() {} }",
    )]);
    let p = find(&classes, "P");
    assert_eq!(p.fields.len(), 1);
    assert_eq!(p.fields[0].name, "visible");
    let method_names: Vec<_> = p.methods.iter().map(|m| m.name.as_str()).collect();
    assert!(method_names.contains(&"v"));
    assert!(!method_names.contains(&"h"));
}

#[test]
fn module_lowering() {
    let classes = compile(&[(
        "module-info.java",
        "module com.example.app { exports com.example.api; requires static friend.lib; }",
    )]);
    let module_cf = classes
        .iter()
        .find(|cf| cf.module.is_some())
        .expect("module class");
    assert_eq!(module_cf.name, "module-info");
    assert_eq!(module_cf.access, 0x8000);
    assert!(module_cf.super_name.is_none());
    let module = module_cf.module.as_ref().unwrap();
    assert_eq!(module.name, "com.example.app");
    // Implicit mandated java.base plus the static requires.
    assert!(module.requires.iter().any(|(m, f)| m == "java.base" && f & 0x8000 != 0));
    assert!(module.requires.iter().any(|(m, f)| m == "friend.lib" && f & 0x0040 != 0));
}

#[test]
fn round_trip_preserves_shape() {
    let sources = &[(
        "R.java",
        "package demo; public class R<T> implements Comparable<R<T>> { public T item; protected final int count = 2; public int compareTo(R<T> other) { return 0; } }",
    )];
    let classes = compile(sources);
    let r = find(&classes, "demo/R");
    // Re-reading produced structurally equal headers (compile() already
    // re-read); spot-check the interesting parts.
    assert_eq!(r.access & 0x0001, 0x0001);
    assert_eq!(r.interfaces, vec!["java/lang/Comparable".to_string()]);
    let item = r.fields.iter().find(|f| f.name == "item").unwrap();
    assert_eq!(item.descriptor, "Ljava/lang/Object;");
    assert_eq!(item.signature.as_deref(), Some("TT;"));
    let count = r.fields.iter().find(|f| f.name == "count").unwrap();
    assert_eq!(count.constant, Some(ElemConst::Int(2)));
}
