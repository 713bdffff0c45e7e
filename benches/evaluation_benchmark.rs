#[macro_use]
extern crate criterion;

use criterion::Criterion;
use rust_stance::evaluation::{accuracy, f1_score, matthews_correlation, F1Average};

fn synthetic_predictions(size: usize) -> (Vec<i64>, Vec<i64>) {
    let labels = (0..size).map(|index| (index % 2) as i64).collect::<Vec<i64>>();
    let predictions = (0..size)
        .map(|index| ((index * 31 + 7) % 5 % 2) as i64)
        .collect::<Vec<i64>>();
    (predictions, labels)
}

fn bench_metrics(c: &mut Criterion) {
    let (predictions, labels) = synthetic_predictions(4096);

    c.bench_function("accuracy 4096", |b| {
        b.iter(|| accuracy(&predictions, &labels))
    });
    c.bench_function("macro F1 4096", |b| {
        b.iter(|| f1_score(&predictions, &labels, F1Average::Macro))
    });
    c.bench_function("matthews 4096", |b| {
        b.iter(|| matthews_correlation(&predictions, &labels))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_metrics
}

criterion_main!(benches);
