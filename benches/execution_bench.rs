use criterion::{black_box, criterion_group, criterion_main, Criterion};
use exprsh::{parse_source, EvalConfig, Evaluator, Scanner};

const FIB: &str = r#"
    let fib = (n) => match n
        | [< 2] => n
        | _ => (+ (fib (- n 1)) (fib (- n 2)))
        ;
    (fib 15)
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize fib program", |b| {
        b.iter(|| {
            let mut scanner = Scanner::new(black_box(FIB));
            scanner.scan_tokens().unwrap()
        })
    });
}

fn parser_benchmark(c: &mut Criterion) {
    c.bench_function("parse fib program", |b| {
        b.iter(|| parse_source(black_box(FIB)).unwrap())
    });
}

fn evaluator_benchmark(c: &mut Criterion) {
    c.bench_function("evaluate fib 15", |b| {
        let mut evaluator = Evaluator::with_config(EvalConfig::default());
        b.iter(|| evaluator.evaluate(black_box(FIB)).unwrap())
    });

    c.bench_function("match on list patterns", |b| {
        let source = r#"
            let sum = (l) => match l
                | '[] => 0
                | [cons h t] => (+ h (sum t))
                ;
            (sum '[1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16])
        "#;
        let mut evaluator = Evaluator::with_config(EvalConfig::default());
        b.iter(|| evaluator.evaluate(black_box(source)).unwrap())
    });
}

criterion_group!(benches, lexer_benchmark, parser_benchmark, evaluator_benchmark);
criterion_main!(benches);
