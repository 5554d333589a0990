use criterion::{Criterion, criterion_group, criterion_main};
use snippet_syntax::{
    Dialect, FormatString, Parser, Shorthand, TemplatePiece, Transform, TransformFlags, parse,
};

fn generate_snippet(placeholders: usize) -> String {
    let mut body = String::new();
    for i in 1..=placeholders {
        body.push_str(&format!(
            "fn ${{{i}:name_{i}}}(${{{next}:arg}}: ${{{i}/(\\w+)/${{1:/pascalcase}}/}}) {{\n    $TM_SELECTED_TEXT\n}}\n",
            next = i + placeholders
        ));
    }
    body.push_str("$0");
    body
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(10);

    let content = generate_snippet(50);
    group.bench_function("textmate", |b| {
        b.iter(|| {
            let tree = parse(std::hint::black_box(&content), Dialect::TextMate);
            std::hint::black_box(tree);
        });
    });

    group.bench_function("reused_parser", |b| {
        let mut parser = Parser::new(Dialect::TextMate);
        b.iter(|| {
            let tree = parser.parse(std::hint::black_box(&content));
            std::hint::black_box(tree);
        });
    });

    let tree = parse(&content, Dialect::TextMate);
    group.bench_function("canonical_source", |b| {
        b.iter(|| std::hint::black_box(tree.to_source()));
    });

    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");

    let flags = TransformFlags::parse("g").expect("valid flags");
    let transform = Transform::new(
        "(\\w)(\\w*)",
        vec![TemplatePiece::Format(FormatString::with_shorthand(
            1,
            Shorthand::Upcase,
        ))],
        flags,
    )
    .expect("valid transform");
    let input = "the quick brown fox jumps over the lazy dog ".repeat(20);

    group.bench_function("global_upcase", |b| {
        b.iter(|| std::hint::black_box(transform.resolve(std::hint::black_box(&input))));
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_transform);
criterion_main!(benches);
