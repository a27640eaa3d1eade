//! A built-in model of the core library.
//!
//! Header compilation only needs the shape of the well-known classes, not
//! their code, so compilations can run without a bootclasspath: this
//! provider synthesizes just enough of `java.lang`, `java.lang.annotation`,
//! `java.io` and `java.util` for supertype defaulting, boxing, annotation
//! metadata and the common import surface. A real `--bootclasspath` layered
//! above it always wins.

use crate::Classpath;
use dashmap::DashMap;
use javelin_model::{
    AccessFlags, AnnotationMetadata, ClassProvider, ClassSym, FieldInfo, FieldSym, Names,
    Retention, SourceKind, TargetSet, TyParam, TyVarOwner, TyVarSym, Type, TypeBoundClass,
};
use std::sync::Arc;

pub struct CoreStubs {
    cache: DashMap<String, Arc<TypeBoundClass>>,
}

impl CoreStubs {
    pub fn new() -> Self {
        CoreStubs {
            cache: DashMap::new(),
        }
    }

    /// The stubs layered under a real classpath: entries win, stubs fill
    /// the gaps.
    pub fn under(classpath: Classpath) -> StubbedClasspath {
        StubbedClasspath {
            classpath,
            stubs: CoreStubs::new(),
        }
    }

    fn packages() -> &'static [(&'static str, &'static [&'static str])] {
        &[
            (
                "java/lang",
                &[
                    "Object",
                    "String",
                    "Class",
                    "Enum",
                    "Record",
                    "Comparable",
                    "CharSequence",
                    "Iterable",
                    "Cloneable",
                    "Runnable",
                    "Number",
                    "Boolean",
                    "Byte",
                    "Short",
                    "Integer",
                    "Long",
                    "Character",
                    "Float",
                    "Double",
                    "Void",
                    "Math",
                    "Throwable",
                    "Exception",
                    "RuntimeException",
                    "Error",
                    "Deprecated",
                    "Override",
                    "SuppressWarnings",
                    "SafeVarargs",
                    "FunctionalInterface",
                ],
            ),
            (
                "java/lang/annotation",
                &[
                    "Annotation",
                    "Retention",
                    "Target",
                    "Inherited",
                    "Repeatable",
                    "Documented",
                    "RetentionPolicy",
                    "ElementType",
                ],
            ),
            ("java/io", &["Serializable", "IOException"]),
            (
                "java/util",
                &["List", "Map", "Set", "Collection", "Iterator", "Optional"],
            ),
        ]
    }

    fn build(&self, binary_name: &str, names: &Names) -> Option<TypeBoundClass> {
        let sym = names.class(binary_name);
        let object = || Type::class(names.class("java/lang/Object"));
        let class = |n: &str| Type::class(names.class(n));
        let public = AccessFlags::PUBLIC | AccessFlags::SUPER;
        let iface =
            AccessFlags::PUBLIC | AccessFlags::INTERFACE | AccessFlags::ABSTRACT;
        let anno_access = iface | AccessFlags::ANNOTATION;

        let type_param = |name: &str, bounds: Vec<Type>| TyParam {
            sym: TyVarSym {
                owner: TyVarOwner::Class(sym),
                name: names.intern(name),
                index: 0,
            },
            bounds,
            annotations: Vec::new(),
        };
        let base = |access: AccessFlags, kind: SourceKind, supertype: Option<Type>| {
            TypeBoundClass {
                sym,
                access,
                kind,
                owner: None,
                type_params: Vec::new(),
                supertype,
                interfaces: Vec::new(),
                permits: Vec::new(),
                children: indexmap::IndexMap::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                components: Vec::new(),
                annotations: Vec::new(),
                anno_meta: None,
                module: None,
                javadoc: None,
            }
        };

        Some(match binary_name {
            "java/lang/Object" => base(public, SourceKind::Class, None),
            "java/lang/String" => {
                let mut stub = base(public | AccessFlags::FINAL, SourceKind::Class, Some(object()));
                stub.interfaces = vec![
                    class("java/lang/CharSequence"),
                    class("java/io/Serializable"),
                ];
                stub
            }
            "java/lang/Class" => {
                let mut stub = base(public | AccessFlags::FINAL, SourceKind::Class, Some(object()));
                stub.type_params = vec![type_param("T", Vec::new())];
                stub
            }
            "java/lang/Enum" => {
                let mut stub = base(public | AccessFlags::ABSTRACT, SourceKind::Class, Some(object()));
                stub.type_params = vec![type_param("E", Vec::new())];
                stub.interfaces = vec![
                    class("java/lang/Comparable"),
                    class("java/io/Serializable"),
                ];
                stub
            }
            "java/lang/Record" => {
                base(public | AccessFlags::ABSTRACT, SourceKind::Class, Some(object()))
            }
            "java/lang/Comparable" => {
                let mut stub = base(iface, SourceKind::Interface, Some(object()));
                stub.type_params = vec![type_param("T", Vec::new())];
                stub
            }
            "java/lang/Iterable" => {
                let mut stub = base(iface, SourceKind::Interface, Some(object()));
                stub.type_params = vec![type_param("T", Vec::new())];
                stub
            }
            "java/lang/CharSequence"
            | "java/lang/Cloneable"
            | "java/lang/Runnable"
            | "java/io/Serializable" => base(iface, SourceKind::Interface, Some(object())),
            "java/lang/Number" => {
                let mut stub =
                    base(public | AccessFlags::ABSTRACT, SourceKind::Class, Some(object()));
                stub.interfaces = vec![class("java/io/Serializable")];
                stub
            }
            "java/lang/Boolean" | "java/lang/Character" | "java/lang/Void" => {
                base(public | AccessFlags::FINAL, SourceKind::Class, Some(object()))
            }
            "java/lang/Byte" | "java/lang/Short" | "java/lang/Integer" | "java/lang/Long"
            | "java/lang/Float" | "java/lang/Double" => {
                let mut stub = base(
                    public | AccessFlags::FINAL,
                    SourceKind::Class,
                    Some(class("java/lang/Number")),
                );
                stub.interfaces = vec![class("java/lang/Comparable")];
                stub
            }
            "java/lang/Math" => base(public | AccessFlags::FINAL, SourceKind::Class, Some(object())),
            "java/lang/Throwable" => {
                let mut stub = base(public, SourceKind::Class, Some(object()));
                stub.interfaces = vec![class("java/io/Serializable")];
                stub
            }
            "java/lang/Exception" => base(
                public,
                SourceKind::Class,
                Some(class("java/lang/Throwable")),
            ),
            "java/lang/RuntimeException" => base(
                public,
                SourceKind::Class,
                Some(class("java/lang/Exception")),
            ),
            "java/lang/Error" => base(
                public,
                SourceKind::Class,
                Some(class("java/lang/Throwable")),
            ),
            "java/io/IOException" => base(
                public,
                SourceKind::Class,
                Some(class("java/lang/Exception")),
            ),
            "java/lang/annotation/Annotation" => base(iface, SourceKind::Interface, Some(object())),
            "java/lang/Deprecated" => {
                let mut stub = annotation_stub(base(anno_access, SourceKind::Annotation, Some(object())), names);
                if let Some(meta) = &mut stub.anno_meta {
                    meta.retention = Retention::Runtime;
                }
                stub
            }
            "java/lang/Override" => {
                let mut stub = annotation_stub(base(anno_access, SourceKind::Annotation, Some(object())), names);
                if let Some(meta) = &mut stub.anno_meta {
                    meta.retention = Retention::Source;
                    meta.targets = TargetSet::METHOD;
                }
                stub
            }
            "java/lang/SuppressWarnings" => {
                let mut stub = annotation_stub(base(anno_access, SourceKind::Annotation, Some(object())), names);
                if let Some(meta) = &mut stub.anno_meta {
                    meta.retention = Retention::Source;
                }
                stub
            }
            "java/lang/SafeVarargs" | "java/lang/FunctionalInterface" => {
                annotation_stub(base(anno_access, SourceKind::Annotation, Some(object())), names)
            }
            "java/lang/annotation/Retention"
            | "java/lang/annotation/Target"
            | "java/lang/annotation/Inherited"
            | "java/lang/annotation/Repeatable"
            | "java/lang/annotation/Documented" => {
                let mut stub = annotation_stub(base(anno_access, SourceKind::Annotation, Some(object())), names);
                if let Some(meta) = &mut stub.anno_meta {
                    meta.retention = Retention::Runtime;
                    meta.targets = TargetSet::ANNOTATION_TYPE;
                }
                stub
            }
            "java/lang/annotation/RetentionPolicy" => {
                enum_stub(base(public | AccessFlags::FINAL | AccessFlags::ENUM, SourceKind::Enum, Some(class("java/lang/Enum"))), sym, names, &["SOURCE", "CLASS", "RUNTIME"])
            }
            "java/lang/annotation/ElementType" => enum_stub(
                base(public | AccessFlags::FINAL | AccessFlags::ENUM, SourceKind::Enum, Some(class("java/lang/Enum"))),
                sym,
                names,
                &[
                    "TYPE",
                    "FIELD",
                    "METHOD",
                    "PARAMETER",
                    "CONSTRUCTOR",
                    "LOCAL_VARIABLE",
                    "ANNOTATION_TYPE",
                    "PACKAGE",
                    "TYPE_PARAMETER",
                    "TYPE_USE",
                    "MODULE",
                    "RECORD_COMPONENT",
                ],
            ),
            "java/util/List" | "java/util/Set" | "java/util/Collection" | "java/util/Iterator"
            | "java/util/Optional" => {
                let mut stub = base(
                    if binary_name == "java/util/Optional" {
                        public | AccessFlags::FINAL
                    } else {
                        iface
                    },
                    if binary_name == "java/util/Optional" {
                        SourceKind::Class
                    } else {
                        SourceKind::Interface
                    },
                    Some(object()),
                );
                stub.type_params = vec![type_param("E", Vec::new())];
                stub
            }
            "java/util/Map" => {
                let mut stub = base(iface, SourceKind::Interface, Some(object()));
                stub.type_params = vec![
                    TyParam {
                        sym: TyVarSym {
                            owner: TyVarOwner::Class(sym),
                            name: names.intern("K"),
                            index: 0,
                        },
                        bounds: Vec::new(),
                        annotations: Vec::new(),
                    },
                    TyParam {
                        sym: TyVarSym {
                            owner: TyVarOwner::Class(sym),
                            name: names.intern("V"),
                            index: 1,
                        },
                        bounds: Vec::new(),
                        annotations: Vec::new(),
                    },
                ];
                let entry = names.class("java/util/Map$Entry");
                stub.children.insert("Entry".to_string(), entry);
                stub
            }
            "java/util/Map$Entry" => {
                let mut stub = base(iface, SourceKind::Interface, Some(object()));
                stub.owner = Some(names.class("java/util/Map"));
                stub.access |= AccessFlags::STATIC;
                stub.type_params = vec![
                    TyParam {
                        sym: TyVarSym {
                            owner: TyVarOwner::Class(sym),
                            name: names.intern("K"),
                            index: 0,
                        },
                        bounds: Vec::new(),
                        annotations: Vec::new(),
                    },
                    TyParam {
                        sym: TyVarSym {
                            owner: TyVarOwner::Class(sym),
                            name: names.intern("V"),
                            index: 1,
                        },
                        bounds: Vec::new(),
                        annotations: Vec::new(),
                    },
                ];
                stub
            }
            _ => return None,
        })
    }
}

impl Default for CoreStubs {
    fn default() -> Self {
        CoreStubs::new()
    }
}

fn annotation_stub(mut stub: TypeBoundClass, names: &Names) -> TypeBoundClass {
    stub.interfaces = vec![Type::class(names.class("java/lang/annotation/Annotation"))];
    stub.anno_meta = Some(AnnotationMetadata::default());
    stub
}

fn enum_stub(
    mut stub: TypeBoundClass,
    sym: ClassSym,
    names: &Names,
    constants: &[&str],
) -> TypeBoundClass {
    stub.fields = constants
        .iter()
        .map(|constant| FieldInfo {
            sym: FieldSym {
                owner: sym,
                name: names.intern(constant),
            },
            name: constant.to_string(),
            access: AccessFlags::PUBLIC
                | AccessFlags::STATIC
                | AccessFlags::FINAL
                | AccessFlags::ENUM,
            ty: Type::class(sym),
            annotations: Vec::new(),
            constant: None,
            javadoc: None,
        })
        .collect();
    stub
}

impl ClassProvider for CoreStubs {
    fn load(&self, binary_name: &str, names: &Names) -> Option<Arc<TypeBoundClass>> {
        if let Some(cached) = self.cache.get(binary_name) {
            return Some(cached.clone());
        }
        let built = Arc::new(self.build(binary_name, names)?);
        self.cache
            .entry(binary_name.to_string())
            .or_insert(built.clone());
        Some(built)
    }

    fn list_package(&self, package: &str) -> Option<Vec<String>> {
        Self::packages()
            .iter()
            .find(|(name, _)| *name == package)
            .map(|(_, classes)| classes.iter().map(|c| c.to_string()).collect())
    }
}

/// A real classpath with the core stubs underneath.
pub struct StubbedClasspath {
    classpath: Classpath,
    stubs: CoreStubs,
}

impl ClassProvider for StubbedClasspath {
    fn load(&self, binary_name: &str, names: &Names) -> Option<Arc<TypeBoundClass>> {
        self.classpath
            .load(binary_name, names)
            .or_else(|| self.stubs.load(binary_name, names))
    }

    fn list_package(&self, package: &str) -> Option<Vec<String>> {
        let from_entries = self.classpath.list_package(package);
        let from_stubs = self.stubs.list_package(package);
        match (from_entries, from_stubs) {
            (Some(mut entries), Some(stubs)) => {
                entries.extend(stubs);
                entries.sort();
                entries.dedup();
                Some(entries)
            }
            (Some(entries), None) => Some(entries),
            (None, stubs) => stubs,
        }
    }
}
