use javelin_classfile::*;

fn marker(descriptor: &str, visible: bool) -> AnnotationItem {
    AnnotationItem {
        type_descriptor: descriptor.to_string(),
        values: Vec::new(),
        visible,
    }
}

#[test]
fn minimal_class_round_trips() {
    let cf = ClassFile {
        minor: 0,
        major: DEFAULT_MAJOR_VERSION,
        access: 0x0021, // public super
        name: "com/example/A".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        fields: vec![FieldItem {
            access: 0x0001,
            name: "x".to_string(),
            descriptor: "I".to_string(),
            signature: None,
            constant: Some(ElemConst::Int(3)),
            annotations: Vec::new(),
            type_annotations: Vec::new(),
            deprecated: false,
        }],
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
    let back = read_class(&bytes).unwrap();
    assert_eq!(back.name, "com/example/A");
    assert_eq!(back.super_name.as_deref(), Some("java/lang/Object"));
    assert_eq!(back.access, 0x0021);
    assert_eq!(back.fields.len(), 1);
    assert_eq!(back.fields[0].descriptor, "I");
    assert_eq!(back.fields[0].constant, Some(ElemConst::Int(3)));
}

#[test]
fn signatures_methods_and_exceptions_round_trip() {
    let cf = ClassFile {
        major: DEFAULT_MAJOR_VERSION,
        access: 0x0021,
        name: "P".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        signature: Some("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;".to_string()),
        methods: vec![MethodItem {
            access: 0x0001,
            name: "get".to_string(),
            descriptor: "(Ljava/lang/Object;)Ljava/lang/Object;".to_string(),
            signature: Some("(TK;)TV;".to_string()),
            exceptions: vec!["java/io/IOException".to_string()],
            annotations: vec![marker("LA;", true)],
            parameter_annotations: Some(vec![vec![marker("LB;", true)]]),
            type_annotations: Vec::new(),
            method_parameters: vec![(Some("key".to_string()), 0)],
            annotation_default: None,
            deprecated: false,
        }],
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    let back = read_class(&bytes).unwrap();
    assert_eq!(back.signature.as_deref(), Some("<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;"));
    let method = &back.methods[0];
    assert_eq!(method.signature.as_deref(), Some("(TK;)TV;"));
    assert_eq!(method.exceptions, vec!["java/io/IOException".to_string()]);
    assert_eq!(method.annotations, vec![marker("LA;", true)]);
    assert_eq!(
        method.parameter_annotations,
        Some(vec![vec![marker("LB;", true)]])
    );
    assert_eq!(method.method_parameters, vec![(Some("key".to_string()), 0)]);
}

#[test]
fn type_annotations_round_trip() {
    let cf = ClassFile {
        major: DEFAULT_MAJOR_VERSION,
        access: 0x0020,
        name: "T".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        fields: vec![FieldItem {
            access: 0,
            name: "x".to_string(),
            descriptor: "[[I".to_string(),
            signature: None,
            constant: None,
            annotations: Vec::new(),
            type_annotations: vec![
                TypeAnnotationItem {
                    target: TargetInfo::Field,
                    path: vec![TypePathStep::Array, TypePathStep::Array],
                    annotation: marker("LT;", true),
                },
                TypeAnnotationItem {
                    target: TargetInfo::Field,
                    path: Vec::new(),
                    annotation: marker("LU;", true),
                },
            ],
            deprecated: false,
        }],
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    let back = read_class(&bytes).unwrap();
    let tas = &back.fields[0].type_annotations;
    assert_eq!(tas.len(), 2);
    assert_eq!(tas[0].path, vec![TypePathStep::Array, TypePathStep::Array]);
    assert_eq!(tas[0].target, TargetInfo::Field);
    assert!(tas[1].path.is_empty());
}

#[test]
fn inner_classes_and_sealed_round_trip() {
    let cf = ClassFile {
        major: DEFAULT_MAJOR_VERSION,
        access: 0x0601, // public interface
        name: "I".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        permitted_subclasses: vec!["A".to_string(), "B".to_string()],
        inner_classes: vec![InnerClassItem {
            inner: "Outer$Mid".to_string(),
            outer: Some("Outer".to_string()),
            inner_name: Some("Mid".to_string()),
            access: 0x0008,
        }],
        nest_members: vec!["I$N".to_string()],
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    let back = read_class(&bytes).unwrap();
    assert_eq!(back.permitted_subclasses, vec!["A", "B"]);
    assert_eq!(back.inner_classes.len(), 1);
    assert_eq!(back.inner_classes[0].inner_name.as_deref(), Some("Mid"));
    assert_eq!(back.inner_classes[0].access, 0x0008);
    assert_eq!(back.nest_members, vec!["I$N".to_string()]);
}

#[test]
fn annotation_default_and_enum_values_round_trip() {
    let cf = ClassFile {
        major: DEFAULT_MAJOR_VERSION,
        access: 0x2601, // public interface annotation
        name: "Anno".to_string(),
        super_name: Some("java/lang/Object".to_string()),
        methods: vec![MethodItem {
            access: 0x0401,
            name: "value".to_string(),
            descriptor: "()LColor;".to_string(),
            signature: None,
            exceptions: Vec::new(),
            annotations: Vec::new(),
            parameter_annotations: None,
            type_annotations: Vec::new(),
            method_parameters: Vec::new(),
            annotation_default: Some(ElementValue::EnumConst {
                type_descriptor: "LColor;".to_string(),
                const_name: "RED".to_string(),
            }),
            deprecated: false,
        }],
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    let back = read_class(&bytes).unwrap();
    assert_eq!(
        back.methods[0].annotation_default,
        Some(ElementValue::EnumConst {
            type_descriptor: "LColor;".to_string(),
            const_name: "RED".to_string(),
        })
    );
}

#[test]
fn module_round_trips() {
    let cf = ClassFile {
        major: DEFAULT_MAJOR_VERSION,
        access: 0x8000,
        name: "module-info".to_string(),
        super_name: None,
        module: Some(ModuleItem {
            name: "com.example.app".to_string(),
            flags: 0x0020, // open
            requires: vec![("java.base".to_string(), 0x8000)],
            exports: vec![(
                "com/example/api".to_string(),
                0,
                vec!["friend.one".to_string()],
            )],
            opens: vec![("com/example/internal".to_string(), 0, Vec::new())],
            uses: vec!["com/example/spi/Service".to_string()],
            provides: vec![(
                "com/example/spi/Service".to_string(),
                vec!["com/example/impl/Impl".to_string()],
            )],
        }),
        ..ClassFile::default()
    };
    let bytes = write_class(&cf).unwrap();
    let back = read_class(&bytes).unwrap();
    let module = back.module.expect("module");
    assert_eq!(module.name, "com.example.app");
    assert_eq!(module.requires, vec![("java.base".to_string(), 0x8000)]);
    assert_eq!(module.exports[0].2, vec!["friend.one".to_string()]);
    assert_eq!(module.uses, vec!["com/example/spi/Service".to_string()]);
}
