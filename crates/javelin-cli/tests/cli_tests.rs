use clap::Parser;
use javelin_cli::CliArgs;
use std::path::Path;

fn write_source(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write source");
    path.display().to_string()
}

fn run(args: Vec<String>) -> i32 {
    let args = CliArgs::parse_from(std::iter::once("javelin".to_string()).chain(args));
    javelin_cli::compile(&args).expect("driver failure")
}

#[test]
fn compiles_to_a_class_directory() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(
        work.path(),
        "A.java",
        "package demo; public class A { public static final int X = 40 + 2; }",
    );
    let out = work.path().join("classes");
    let code = run(vec![src, "-o".to_string(), out.display().to_string()]);
    assert_eq!(code, 0);

    let bytes = std::fs::read(out.join("demo/A.class")).expect("emitted class");
    let cf = javelin_classfile::read_class(&bytes).expect("valid class file");
    assert_eq!(cf.name, "demo/A");
    assert_eq!(cf.major, 65);
    assert_eq!(
        cf.fields[0].constant,
        Some(javelin_classfile::ElemConst::Int(42))
    );
}

#[test]
fn compiles_to_a_jar() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(work.path(), "B.java", "public class B {}");
    let out = work.path().join("out.jar");
    let code = run(vec![src, "-o".to_string(), out.display().to_string()]);
    assert_eq!(code, 0);

    let file = std::fs::File::open(&out).expect("jar exists");
    let mut jar = zip::ZipArchive::new(file).expect("valid zip");
    let names: Vec<String> = jar.file_names().map(|n| n.to_string()).collect();
    assert!(names.contains(&"META-INF/MANIFEST.MF".to_string()));
    assert!(names.contains(&"B.class".to_string()));
    use std::io::Read;
    let mut entry = jar.by_name("B.class").expect("entry");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("read entry");
    assert_eq!(&bytes[0..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
}

#[test]
fn release_selects_class_file_version() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(work.path(), "C.java", "class C {}");
    let out = work.path().join("classes");
    let code = run(vec![
        src,
        "-o".to_string(),
        out.display().to_string(),
        "--release".to_string(),
        "17".to_string(),
    ]);
    assert_eq!(code, 0);
    let bytes = std::fs::read(out.join("C.class")).expect("emitted class");
    let cf = javelin_classfile::read_class(&bytes).expect("valid class file");
    assert_eq!(cf.major, 61);
}

#[test]
fn errors_fail_the_build_and_write_nothing() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(work.path(), "Bad.java", "class Bad extends Missing {}");
    let out = work.path().join("classes");
    let code = run(vec![src, "-o".to_string(), out.display().to_string()]);
    assert_eq!(code, 1);
    assert!(!out.exists(), "no output on errors");
}

#[test]
fn compiled_jar_round_trips_through_the_classpath_reader() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(
        work.path(),
        "lib.java",
        "package lib; public class Widget<T> { public T payload; public static final String NAME = \"widget\"; }",
    );
    let lib_out = work.path().join("lib");
    assert_eq!(
        run(vec![src, "-o".to_string(), lib_out.display().to_string()]),
        0
    );

    // Compile a dependent against the emitted classes.
    let dep = write_source(
        work.path(),
        "App.java",
        "package app; import lib.Widget; public class App { Widget<String> w; public static final String N = Widget.NAME; }",
    );
    let app_out = work.path().join("app");
    let code = run(vec![
        dep,
        "-o".to_string(),
        app_out.display().to_string(),
        "--classpath".to_string(),
        lib_out.display().to_string(),
    ]);
    assert_eq!(code, 0);
    let bytes = std::fs::read(app_out.join("app/App.class")).expect("emitted class");
    let cf = javelin_classfile::read_class(&bytes).expect("valid class file");
    let w = cf.fields.iter().find(|f| f.name == "w").expect("field w");
    assert_eq!(w.descriptor, "Llib/Widget;");
    assert_eq!(w.signature.as_deref(), Some("Llib/Widget<Ljava/lang/String;>;"));
    // The constant folded across the compiled classpath boundary.
    let n = cf.fields.iter().find(|f| f.name == "N").expect("field N");
    assert_eq!(
        n.constant,
        Some(javelin_classfile::ElemConst::Str("widget".to_string()))
    );
}

#[test]
fn module_output_location() {
    let work = tempfile::tempdir().expect("tempdir");
    let src = write_source(
        work.path(),
        "module-info.java",
        "module com.example.app { }",
    );
    let out = work.path().join("classes");
    assert_eq!(run(vec![src, "-o".to_string(), out.display().to_string()]), 0);
    // A single-module compilation places module-info at the root.
    assert!(out.join("module-info.class").exists());
}
