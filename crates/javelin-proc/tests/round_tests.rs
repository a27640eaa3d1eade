use javelin_binder::BindOptions;
use javelin_classpath::stubs::CoreStubs;
use javelin_common::Severity;
use javelin_model::Names;
use javelin_proc::{Processor, RoundEnv, SourceFile, run_rounds};
use rustc_hash::FxHashMap;

fn source(path: &str, text: &str) -> SourceFile {
    SourceFile {
        path: path.to_string(),
        text: text.to_string(),
    }
}

/// Generates `<Class>Meta` for every bound class that has none yet.
struct MetaGenerator {
    generated_for: Vec<String>,
    saw_over_round: bool,
}

impl Processor for MetaGenerator {
    fn name(&self) -> &str {
        "MetaGenerator"
    }

    fn process(&mut self, round: &mut RoundEnv<'_>) {
        if round.over {
            self.saw_over_round = true;
            return;
        }
        let targets: Vec<String> = round
            .classes()
            .map(|(sym, _)| round.binary_name(sym))
            .filter(|name| !name.ends_with("Meta") && !name.contains('$'))
            .filter(|name| !self.generated_for.contains(name))
            .collect();
        for name in targets {
            let generated = format!("{name}Meta");
            round
                .create_source(
                    &format!("{generated}.java"),
                    format!("public class {generated} {{ public static final String SOURCE = \"{name}\"; }}"),
                )
                .expect("filer accepts fresh names");
            self.generated_for.push(name);
        }
    }
}

#[test]
fn rounds_converge_and_generated_sources_are_bound() {
    let names = Names::new();
    let stubs = CoreStubs::new();
    let mut processors: Vec<Box<dyn Processor>> = vec![Box::new(MetaGenerator {
        generated_for: Vec::new(),
        saw_over_round: false,
    })];
    let result = run_rounds(
        vec![source("A.java", "public class A {}")],
        &names,
        &stubs,
        BindOptions::default(),
        &mut processors,
        &FxHashMap::default(),
    );
    assert!(!result.diagnostics.has_errors());
    // Round 1 sees A and generates AMeta; round 2 sees both and generates
    // AMetaMeta... no: AMeta ends with Meta, so round 2 generates nothing
    // and the loop converges, then the over round runs.
    assert_eq!(result.rounds, 2);
    assert_eq!(result.generated.len(), 1);
    assert_eq!(result.generated[0].name, "AMeta.java");
    // The generated class is part of the final binding.
    assert!(result.classes_contains(&names, "AMeta"));
}

trait ResultExt {
    fn classes_contains(&self, names: &Names, binary: &str) -> bool;
}

impl ResultExt for javelin_proc::ProcessingResult {
    fn classes_contains(&self, names: &Names, binary: &str) -> bool {
        self.bind.classes.contains_key(&names.class(binary))
    }
}

/// Tries to generate the same file twice.
struct DuplicateFiler {
    attempts: usize,
}

impl Processor for DuplicateFiler {
    fn name(&self) -> &str {
        "DuplicateFiler"
    }

    fn process(&mut self, round: &mut RoundEnv<'_>) {
        if round.over || self.attempts >= 2 {
            return;
        }
        self.attempts += 1;
        let _ = round.create_source("Gen.java", "class Gen {}");
    }
}

#[test]
fn duplicate_generation_is_a_filer_error() {
    let names = Names::new();
    let stubs = CoreStubs::new();
    let mut processors: Vec<Box<dyn Processor>> =
        vec![Box::new(DuplicateFiler { attempts: 0 })];
    let result = run_rounds(
        vec![source("A.java", "class A {}")],
        &names,
        &stubs,
        BindOptions::default(),
        &mut processors,
        &FxHashMap::default(),
    );
    // The second attempt failed with an error but compilation still ran to
    // completion.
    assert!(result.diagnostics.has_errors());
    assert_eq!(result.generated.len(), 1);
}

/// Reports but never generates; errors must not stop the final round.
struct Complainer {
    rounds_seen: usize,
}

impl Processor for Complainer {
    fn name(&self) -> &str {
        "Complainer"
    }

    fn process(&mut self, round: &mut RoundEnv<'_>) {
        self.rounds_seen += 1;
        if !round.over {
            round.error("something is off");
            round.warning("and also this");
        }
    }
}

#[test]
fn processor_messages_accumulate() {
    let names = Names::new();
    let stubs = CoreStubs::new();
    let mut processors: Vec<Box<dyn Processor>> = vec![Box::new(Complainer { rounds_seen: 0 })];
    let result = run_rounds(
        vec![source("A.java", "class A {}")],
        &names,
        &stubs,
        BindOptions::default(),
        &mut processors,
        &FxHashMap::default(),
    );
    let severities: Vec<Severity> = result
        .diagnostics
        .iter()
        .map(|d| d.severity())
        .collect();
    assert!(severities.contains(&Severity::Error));
    assert!(severities.contains(&Severity::Warning));
}

#[test]
fn no_processors_is_a_single_round() {
    let names = Names::new();
    let stubs = CoreStubs::new();
    let mut processors: Vec<Box<dyn Processor>> = Vec::new();
    let result = run_rounds(
        vec![source("A.java", "class A { static final int X = 1; }")],
        &names,
        &stubs,
        BindOptions::default(),
        &mut processors,
        &FxHashMap::default(),
    );
    assert_eq!(result.rounds, 1);
    assert!(!result.diagnostics.has_errors());
    assert_eq!(result.bind.classes.len(), 1);
}

#[test]
fn type_relations_are_exposed() {
    struct RelationChecker {
        checked: bool,
    }
    impl Processor for RelationChecker {
        fn name(&self) -> &str {
            "RelationChecker"
        }
        fn process(&mut self, round: &mut RoundEnv<'_>) {
            if round.over || self.checked {
                return;
            }
            self.checked = true;
            let sub = round.any_class("Sub").expect("Sub").sym;
            let base = round.any_class("Base").expect("Base").sym;
            let ok = round.with_types(|ops| {
                let sub_ty = javelin_model::Type::class(sub);
                let base_ty = javelin_model::Type::class(base);
                ops.is_subtype(&sub_ty, &base_ty) && !ops.is_subtype(&base_ty, &sub_ty)
            });
            if !ok {
                round.error("subtype relation broken");
            }
        }
    }
    let names = Names::new();
    let stubs = CoreStubs::new();
    let mut processors: Vec<Box<dyn Processor>> =
        vec![Box::new(RelationChecker { checked: false })];
    let result = run_rounds(
        vec![source(
            "S.java",
            "class Base {} class Sub extends Base {}",
        )],
        &names,
        &stubs,
        BindOptions::default(),
        &mut processors,
        &FxHashMap::default(),
    );
    assert!(!result.diagnostics.has_errors());
}
