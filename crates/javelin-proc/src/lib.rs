//! The annotation-processing bridge.
//!
//! Processing wraps the binder in a round loop:
//!
//! 1. bind the current source set through all phases;
//! 2. expose the bound symbols read-only to every processor;
//! 3. collect generated sources;
//! 4. if any source was generated, re-parse and rebind the combined set;
//! 5. finally run one "processing over" round where no more sources may
//!    appear.
//!
//! Each round's exposure is one coherent snapshot: processors never observe
//! a half-bound state. A file name may be generated only once across all
//! rounds. Processor-raised errors accumulate and surface at the end; they
//! do not stop the next round.

use javelin_binder::relations::TypeOps;
use javelin_binder::{BindOptions, BindResult, FullEnv, bind};
use javelin_common::{DiagnosticKind, Diagnostics, Span};
use javelin_model::{ClassProvider, ClassSym, Names, TypeBoundClass};
use javelin_parser::parse_compilation_unit;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, info_span, warn};

/// Backstop against processors that generate sources forever.
const MAX_ROUNDS: usize = 100;

/// A source file fed into a round.
#[derive(Clone, Debug)]
pub struct SourceFile {
    pub path: String,
    pub text: String,
}

/// A file a processor generated.
#[derive(Clone, Debug)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
    /// Generated resources are carried to the output; generated sources are
    /// also re-fed to the parser.
    pub is_source: bool,
}

/// A user-written annotation processor.
pub trait Processor {
    fn name(&self) -> &str;
    fn process(&mut self, round: &mut RoundEnv<'_>);
}

/// The read-only view of one round, plus the filer and messager.
pub struct RoundEnv<'r> {
    /// True on the final round: no generated sources will be accepted.
    pub over: bool,
    /// 1-based round number.
    pub round: usize,
    classes: &'r indexmap::IndexMap<ClassSym, Arc<TypeBoundClass>>,
    names: &'r Names,
    classpath: &'r dyn ClassProvider,
    options: &'r FxHashMap<String, String>,
    seen_names: &'r mut FxHashSet<String>,
    generated: Vec<GeneratedFile>,
    messages: Vec<(javelin_common::Severity, String)>,
}

impl<'r> RoundEnv<'r> {
    /// Source classes bound this round, in registration order.
    pub fn classes(&self) -> impl Iterator<Item = (ClassSym, &Arc<TypeBoundClass>)> + '_ {
        self.classes.iter().map(|(&sym, class)| (sym, class))
    }

    pub fn class(&self, sym: ClassSym) -> Option<&Arc<TypeBoundClass>> {
        self.classes.get(&sym)
    }

    /// Look up any class, source or classpath.
    pub fn any_class(&self, binary_name: &str) -> Option<Arc<TypeBoundClass>> {
        let sym = self.names.class(binary_name);
        self.classes
            .get(&sym)
            .cloned()
            .or_else(|| self.classpath.load(binary_name, self.names))
    }

    pub fn names(&self) -> &Names {
        self.names
    }

    pub fn binary_name(&self, sym: ClassSym) -> String {
        self.names.binary_name(sym)
    }

    /// The retained javadoc of a class, if any.
    pub fn doc_comment(&self, sym: ClassSym) -> Option<String> {
        self.classes.get(&sym).and_then(|c| c.javadoc.clone())
    }

    /// The `-Akey=value` processor options.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|v| v.as_str())
    }

    /// Run `f` with the type-relation operations for this round.
    pub fn with_types<R>(&self, f: impl FnOnce(&TypeOps<'_>) -> R) -> R {
        let env = FullEnv {
            classes: self.classes,
            classpath: self.classpath,
            names: self.names,
        };
        let ops = TypeOps::new(&env);
        f(&ops)
    }

    // -- filer ---------------------------------------------------------

    /// Generate a new source file. Each name may be generated once per
    /// compilation; on the final round no sources may be generated at all.
    pub fn create_source(&mut self, name: &str, contents: impl Into<String>) -> Result<(), String> {
        if self.over {
            let message = format!("source '{name}' generated during the processing-over round");
            self.error(&message);
            return Err(message);
        }
        self.create_file(name, contents, true)
    }

    /// Generate a resource file (never re-parsed).
    pub fn create_resource(
        &mut self,
        name: &str,
        contents: impl Into<String>,
    ) -> Result<(), String> {
        self.create_file(name, contents, false)
    }

    fn create_file(
        &mut self,
        name: &str,
        contents: impl Into<String>,
        is_source: bool,
    ) -> Result<(), String> {
        if !self.seen_names.insert(name.to_string()) {
            let message = format!("file '{name}' was already generated");
            self.error(&message);
            return Err(message);
        }
        self.generated.push(GeneratedFile {
            name: name.to_string(),
            contents: contents.into(),
            is_source,
        });
        Ok(())
    }

    // -- messager ------------------------------------------------------

    pub fn error(&mut self, message: &str) {
        self.messages
            .push((javelin_common::Severity::Error, message.to_string()));
    }

    pub fn warning(&mut self, message: &str) {
        self.messages
            .push((javelin_common::Severity::Warning, message.to_string()));
    }
}

/// The outcome of a processed compilation.
pub struct ProcessingResult {
    /// The final round's binding, covering original and generated sources.
    pub bind: BindResult,
    /// Units parsed in the final round, for diagnostics rendering.
    pub sources: Vec<SourceFile>,
    pub generated: Vec<GeneratedFile>,
    pub diagnostics: Diagnostics,
    pub rounds: usize,
}

/// Run the full round loop. With no processors this degenerates to a
/// single bind.
pub fn run_rounds(
    initial: Vec<SourceFile>,
    names: &Names,
    classpath: &dyn ClassProvider,
    bind_options: BindOptions,
    processors: &mut [Box<dyn Processor>],
    proc_options: &FxHashMap<String, String>,
) -> ProcessingResult {
    let mut diagnostics = Diagnostics::new();
    let mut sources = initial;
    let mut all_generated: Vec<GeneratedFile> = Vec::new();
    let mut seen_names: FxHashSet<String> = FxHashSet::default();
    let mut round = 0usize;

    loop {
        round += 1;
        let span = info_span!("round", round);
        let _enter = span.enter();

        // Parse diagnostics are kept from the current round only: every
        // round re-parses the whole source set and would re-report them.
        let mut parse_diags = Diagnostics::new();
        let units = parse_sources(&sources, &mut parse_diags);
        let result = bind(&units, names, classpath, bind_options);

        let over = processors.is_empty() || round > MAX_ROUNDS;
        if round > MAX_ROUNDS {
            warn!("annotation processing did not converge; stopping");
            diagnostics.report(
                "<processing>",
                Span::synthetic(),
                DiagnosticKind::ProcError("annotation processing did not converge".to_string()),
            );
        }
        let new_sources = if over {
            Vec::new()
        } else {
            run_processors(
                &result,
                names,
                classpath,
                processors,
                proc_options,
                &mut seen_names,
                &mut all_generated,
                &mut diagnostics,
                round,
                false,
            )
        };

        if new_sources.is_empty() {
            // Final round: processors see the fixpoint with `over` set.
            if !processors.is_empty() && round <= MAX_ROUNDS {
                let _ = run_processors(
                    &result,
                    names,
                    classpath,
                    processors,
                    proc_options,
                    &mut seen_names,
                    &mut all_generated,
                    &mut diagnostics,
                    round,
                    true,
                );
            }
            let mut final_diags = Diagnostics::new();
            final_diags.extend(diagnostics);
            final_diags.extend(parse_diags);
            let mut result = result;
            // Binder diagnostics likewise come from the last round only.
            final_diags.extend(result.diagnostics);
            result.diagnostics = Diagnostics::new();
            debug!(rounds = round, "processing complete");
            return ProcessingResult {
                bind: result,
                sources,
                generated: all_generated,
                diagnostics: final_diags,
                rounds: round,
            };
        }
        for file in new_sources {
            sources.push(SourceFile {
                path: file.name.clone(),
                text: file.contents.clone(),
            });
        }
    }
}

fn parse_sources(
    sources: &[SourceFile],
    diagnostics: &mut Diagnostics,
) -> Vec<javelin_parser::ast::CompilationUnit> {
    let mut units = Vec::with_capacity(sources.len());
    for source in sources {
        match parse_compilation_unit(&source.path, &source.text) {
            Ok(unit) => units.push(unit),
            Err(err) => diagnostics.report(&source.path, err.span, err.kind),
        }
    }
    units
}

fn run_processors(
    result: &BindResult,
    names: &Names,
    classpath: &dyn ClassProvider,
    processors: &mut [Box<dyn Processor>],
    proc_options: &FxHashMap<String, String>,
    seen_names: &mut FxHashSet<String>,
    all_generated: &mut Vec<GeneratedFile>,
    diagnostics: &mut Diagnostics,
    round: usize,
    over: bool,
) -> Vec<GeneratedFile> {
    let mut new_sources = Vec::new();
    for processor in processors.iter_mut() {
        let mut env = RoundEnv {
            over,
            round,
            classes: &result.classes,
            names,
            classpath,
            options: proc_options,
            seen_names,
            generated: Vec::new(),
            messages: Vec::new(),
        };
        processor.process(&mut env);
        let RoundEnv {
            generated,
            messages,
            ..
        } = env;
        for (severity, message) in messages {
            let kind = match severity {
                javelin_common::Severity::Error => DiagnosticKind::ProcError(message),
                javelin_common::Severity::Warning => DiagnosticKind::ProcWarning(message),
            };
            diagnostics.report(processor.name(), Span::synthetic(), kind);
        }
        for file in generated {
            if file.is_source {
                new_sources.push(file.clone());
            }
            all_generated.push(file);
        }
    }
    new_sources
}
