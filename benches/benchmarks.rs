use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use awkit::{Action, Script};
use std::io::Cursor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn counting_script() -> (Script, Arc<AtomicI64>) {
    let mut scr = Script::new();
    let sum = Arc::new(AtomicI64::new(0));
    let total = Arc::clone(&sum);
    scr.append_rule(
        None,
        Some(Action::new(move |s| {
            total.fetch_add(s.field(1).int(), Ordering::Relaxed);
            Ok(())
        })),
    )
    .unwrap();
    (scr, sum)
}

// ============ Record Scanning Benchmarks ============

fn bench_record_scanning(c: &mut Criterion) {
    let mut group = c.benchmark_group("records");

    let newline_input: String = (0..1000).map(|i| format!("line {i}\n")).collect();
    group.bench_function("newline_separated", |b| {
        let (mut scr, _) = counting_script();
        b.iter(|| {
            scr.run(Cursor::new(black_box(newline_input.clone())))
                .unwrap()
        })
    });

    let regex_input: String = (0..1000).map(|i| format!("rec {i}<->")).collect();
    group.bench_function("regex_separated", |b| {
        let mut scr = Script::new();
        scr.set_rs("<->").unwrap();
        scr.append_rule(None, Some(Action::new(|_| Ok(())))).unwrap();
        b.iter(|| scr.run(Cursor::new(black_box(regex_input.clone()))).unwrap())
    });

    let paragraph_input: String = (0..500).map(|i| format!("head {i}\nbody {i}\n\n")).collect();
    group.bench_function("paragraph_mode", |b| {
        let mut scr = Script::new();
        scr.set_rs("").unwrap();
        scr.append_rule(None, Some(Action::new(|_| Ok(())))).unwrap();
        b.iter(|| {
            scr.run(Cursor::new(black_box(paragraph_input.clone())))
                .unwrap()
        })
    });

    group.finish();
}

// ============ Field Splitting Benchmarks ============

fn bench_field_splitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("fields");

    let line = "alpha beta gamma delta epsilon zeta eta theta iota kappa\n".repeat(500);
    group.bench_function("whitespace", |b| {
        let mut scr = Script::new();
        scr.append_rule(
            None,
            Some(Action::new(|s| {
                black_box(s.field(5));
                Ok(())
            })),
        )
        .unwrap();
        b.iter(|| scr.run(Cursor::new(black_box(line.clone()))).unwrap())
    });

    let csv = "a,b,c,d,e,f,g,h,i,j\n".repeat(500);
    group.bench_function("single_char", |b| {
        let mut scr = Script::new();
        scr.set_fs(",");
        scr.append_rule(
            None,
            Some(Action::new(|s| {
                black_box(s.field(5));
                Ok(())
            })),
        )
        .unwrap();
        b.iter(|| scr.run(Cursor::new(black_box(csv.clone()))).unwrap())
    });

    let dashed = "a-b--c---d----e-----f\n".repeat(500);
    group.bench_function("regex", |b| {
        let mut scr = Script::new();
        scr.set_fs("-+");
        scr.append_rule(
            None,
            Some(Action::new(|s| {
                black_box(s.field(3));
                Ok(())
            })),
        )
        .unwrap();
        b.iter(|| scr.run(Cursor::new(black_box(dashed.clone()))).unwrap())
    });

    let columns = "aaaabbbbccccdddd\n".repeat(500);
    group.bench_function("fixed_widths", |b| {
        let mut scr = Script::new();
        scr.set_field_widths(&[4, 4, 4, 4]).unwrap();
        scr.append_rule(
            None,
            Some(Action::new(|s| {
                black_box(s.field(2));
                Ok(())
            })),
        )
        .unwrap();
        b.iter(|| scr.run(Cursor::new(black_box(columns.clone()))).unwrap())
    });

    group.finish();
}

// ============ Value Coercion Benchmarks ============

fn bench_value_coercion(c: &mut Criterion) {
    let mut group = c.benchmark_group("values");
    let scr = Script::new();

    group.bench_function("string_to_int", |b| {
        b.iter(|| {
            let v = scr.new_value(black_box("12345 trailing"));
            black_box(v.int())
        })
    });

    group.bench_function("string_to_float", |b| {
        b.iter(|| {
            let v = scr.new_value(black_box("  -2.5e3 trailing"));
            black_box(v.float())
        })
    });

    group.bench_function("float_to_string", |b| {
        b.iter(|| {
            let v = scr.new_value(black_box(3.14159));
            black_box(v.string().len())
        })
    });

    group.bench_function("regex_match_cached", |b| {
        let v = scr.new_value("the quick brown fox");
        b.iter(|| black_box(v.matches("qu[aeiou]+ck")))
    });

    group.finish();
}

// ============ End-to-End Benchmarks ============

fn bench_e2e_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");

    for size in [100, 1000, 10000] {
        let input: String = (0..size)
            .map(|i| format!("{} {} {} {}\n", i, i * 2, i * 3, i % 100))
            .collect();

        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("sum_column", size), &input, |b, input| {
            let (mut scr, _) = counting_script();
            b.iter(|| scr.run(Cursor::new(black_box(input.clone()))).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_record_scanning,
    bench_field_splitting,
    bench_value_coercion,
    bench_e2e_throughput,
);

criterion_main!(benches);
