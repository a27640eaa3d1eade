use criterion::{Criterion, black_box, criterion_group, criterion_main};
use javelin_scanner::{Preprocessed, Scanner, TokenKind};

fn synthetic_source(classes: usize) -> String {
    let mut src = String::from("package bench.data;\n\nimport java.util.List;\n\n");
    for i in 0..classes {
        src.push_str(&format!(
            "/** Doc for C{i}. */\npublic class C{i}<T extends Comparable<T>> {{\n    public static final int LIMIT_{i} = {i} * 31 + 0x{i:x};\n    private List<T> items;\n    public List<T> items() {{ return items; }}\n}}\n\n"
        ));
    }
    src
}

fn bench_scanner(c: &mut Criterion) {
    let source = synthetic_source(200);
    c.bench_function("scan_200_classes", |b| {
        b.iter(|| {
            let pre = Preprocessed::new(black_box(&source));
            let mut scanner = Scanner::new(&pre);
            let mut count = 0usize;
            loop {
                let tok = scanner.next().expect("scan failure");
                if tok.kind == TokenKind::Eof {
                    break;
                }
                count += 1;
            }
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_scanner);
criterion_main!(benches);
