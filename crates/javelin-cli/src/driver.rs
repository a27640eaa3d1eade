//! The compilation driver.

use crate::args::CliArgs;
use crate::output::{self, OutputClass};
use crate::render;
use anyhow::{Context, Result};
use javelin_binder::{BindOptions, FullEnv};
use javelin_classpath::stubs::CoreStubs;
use javelin_classpath::{Classpath, ClasspathEntry};
use javelin_model::{ClassProvider, Names};
use javelin_proc::{ProcessingResult, Processor, SourceFile, run_rounds};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Run a compilation; returns the process exit code.
pub fn compile(args: &CliArgs) -> Result<i32> {
    init_tracing(args.log_level.as_deref());

    let sources = read_sources(args)?;
    let classpath = assemble_classpath(args);
    let names = Names::new();
    let bind_options = BindOptions {
        report_untargeted_annotations: args.report_untargeted_annotations,
    };

    if !args.processors.is_empty() {
        // Processors run compiled-in; the flags are accepted for driver
        // compatibility but nothing is loaded dynamically.
        warn!(
            processors = ?args.processors,
            "no registered processor matches; running without annotation processing"
        );
    }
    let mut processors: Vec<Box<dyn Processor>> = Vec::new();
    let proc_options: FxHashMap<String, String> =
        args.processor_options.iter().cloned().collect();

    let result = run_rounds(
        sources,
        &names,
        &classpath,
        bind_options,
        &mut processors,
        &proc_options,
    );

    let exit = report(args, &result)?;
    if exit != 0 {
        return Ok(exit);
    }
    write_output(args, &result, &names, &classpath)?;
    Ok(0)
}

fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;
    let env_filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::from_default_env(),
    };
    // A second init (tests) is fine to ignore.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_sources(args: &CliArgs) -> Result<Vec<SourceFile>> {
    args.sources
        .par_iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(SourceFile {
                path: path.display().to_string(),
                text,
            })
        })
        .collect()
}

fn assemble_classpath(args: &CliArgs) -> impl ClassProvider {
    let mut entries = Vec::new();
    for raw in [&args.bootclasspath, &args.classpath].into_iter().flatten() {
        for piece in std::env::split_paths(raw) {
            if piece.as_os_str().is_empty() {
                continue;
            }
            entries.push(ClasspathEntry::for_path(Path::new(&piece)));
        }
    }
    debug!(entries = entries.len(), "classpath assembled");
    CoreStubs::under(Classpath::new(entries))
}

fn report(args: &CliArgs, result: &ProcessingResult) -> Result<i32> {
    let texts: FxHashMap<String, String> = result
        .sources
        .iter()
        .map(|source| (source.path.clone(), source.text.clone()))
        .collect();
    let rendered = render::render(&result.diagnostics, &texts);
    if args.diagnostics_json {
        println!("{}", render::to_json(&rendered));
    } else if !rendered.is_empty() {
        eprint!("{}", render::to_text(&rendered));
    }
    Ok(if result.diagnostics.has_errors() { 1 } else { 0 })
}

fn write_output(
    args: &CliArgs,
    result: &ProcessingResult,
    names: &Names,
    classpath: &dyn ClassProvider,
) -> Result<()> {
    let env = FullEnv {
        classes: &result.bind.classes,
        classpath,
        names,
    };
    let major = args.major_version();

    // Lowering distinct classes is independent; the results are
    // re-sequenced into registration order below.
    let lowered: Vec<_> = result
        .bind
        .classes
        .values()
        .collect::<Vec<_>>()
        .par_iter()
        .map(|class| javelin_lower::lower_class(class, &env, major))
        .collect();

    let module_count = lowered.iter().filter(|cf| cf.module.is_some()).count();
    let classes: Vec<OutputClass> = lowered
        .iter()
        .map(|cf| {
            let bytes = javelin_classfile::write_class(cf)
                .with_context(|| format!("serialising {}", cf.name))?;
            Ok(OutputClass {
                path: output::class_path(cf, module_count),
                bytes,
            })
        })
        .collect::<Result<_>>()?;

    let is_jar = args
        .output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
    if is_jar {
        output::write_jar(&args.output, &classes)?;
    } else {
        output::write_directory(&args.output, &classes)?;
    }
    // Generated resources ride along into a class directory only.
    if !is_jar {
        for file in result.generated.iter().filter(|f| !f.is_source) {
            let path = args.output.join(&file.name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &file.contents)?;
        }
    }
    info!(
        classes = classes.len(),
        output = %args.output.display(),
        "compilation written"
    );
    Ok(())
}
