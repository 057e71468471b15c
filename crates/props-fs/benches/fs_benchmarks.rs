use criterion::{Criterion, black_box, criterion_group, criterion_main};
use props_fs::{Properties, io, parse, serialize};
use tempfile::tempdir;

fn sample_table(n: usize) -> Properties {
    (0..n)
        .map(|i| (format!("app.section{}.key{}", i % 7, i), format!("value {} with: escapes=here", i)))
        .collect()
}

fn write_atomic_benchmark(c: &mut Criterion) {
    c.bench_function("io::write_atomic", |b| {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.properties");
        let content = serialize(&sample_table(50), None);

        b.iter(|| {
            io::write_atomic(black_box(&path), black_box(content.as_bytes())).unwrap();
        })
    });
}

fn codec_benchmark(c: &mut Criterion) {
    let table = sample_table(500);
    let text = serialize(&table, Some("bench"));

    c.bench_function("format::parse (500 entries)", |b| {
        b.iter(|| parse(black_box(&text)).unwrap())
    });

    c.bench_function("format::serialize (500 entries)", |b| {
        b.iter(|| serialize(black_box(&table), None))
    });
}

criterion_group!(benches, write_atomic_benchmark, codec_benchmark);
criterion_main!(benches);
