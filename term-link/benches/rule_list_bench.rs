//! Benchmarks for rule list compilation and cached pipeline execution.

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use term_link::prelude::*;
use tokio::runtime::Runtime;

fn settings() -> ModelSettings {
    ModelSettings::new()
        .with_blocking_rule("l.city = r.city")
        .with_comparison(
            ComparisonRuleList::new(
                "name",
                vec![
                    ComparisonLevel::null("name"),
                    ComparisonLevel::exact(ColumnExpression::new("name").lower()),
                    ComparisonLevel::levenshtein("name", 1),
                    ComparisonLevel::levenshtein("name", 2),
                    ComparisonLevel::Else,
                ],
            )
            .unwrap(),
        )
        .with_comparison(
            ComparisonRuleList::new(
                "amount",
                vec![
                    ComparisonLevel::null("amount"),
                    ComparisonLevel::percentage_difference("amount", 0.0),
                    ComparisonLevel::percentage_difference("amount", 0.1),
                    ComparisonLevel::percentage_difference("amount", 0.25),
                    ComparisonLevel::Else,
                ],
            )
            .unwrap(),
        )
}

/// Creates an input table of `rows` records spread over ten cities.
fn create_input(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("unique_id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
        Field::new("amount", DataType::Float64, true),
        Field::new("city", DataType::Utf8, false),
    ]));

    let names = ["harry", "barry", "HARRY", "larry", "harriet"];
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from_iter_values(0..rows as i64)),
            Arc::new(StringArray::from(
                (0..rows)
                    .map(|i| (i % 17 != 0).then(|| names[i % names.len()]))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                (0..rows)
                    .map(|i| (i % 13 != 0).then(|| 100.0 + (i % 40) as f64))
                    .collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                (0..rows).map(|i| format!("city_{}", i % 10)).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap()
}

fn bench_compile(c: &mut Criterion) {
    let settings = settings();
    let mut group = c.benchmark_group("compile");
    for dialect in [Dialect::DataFusion, Dialect::DuckDb, Dialect::Spark] {
        group.bench_with_input(
            BenchmarkId::from_parameter(dialect),
            &dialect,
            |b, dialect| {
                b.iter(|| {
                    for comparison in &settings.comparisons {
                        black_box(comparison.compile(*dialect).unwrap());
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_fingerprint(c: &mut Criterion) {
    let engine = DataFusionEngine::new();
    let linker = Linker::new(settings(), Arc::new(engine)).unwrap();
    let pipeline = linker.comparison_vectors_pipeline("records").unwrap();

    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(pipeline.fingerprint(Dialect::DataFusion)))
    });
}

fn bench_comparison_vectors(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("comparison_vectors");
    group.sample_size(10);

    for rows in [200usize, 1_000] {
        let engine = DataFusionEngine::new();
        engine.register_batch("records", create_input(rows)).unwrap();
        let linker = Linker::new(settings(), Arc::new(engine)).unwrap();

        group.bench_with_input(BenchmarkId::new("uncached", rows), &linker, |b, linker| {
            b.iter(|| {
                rt.block_on(async {
                    let pipeline = linker.comparison_vectors_pipeline("records").unwrap();
                    let handle = linker.executor().execute(&pipeline, false).await.unwrap();
                    linker
                        .executor()
                        .drop_table_and_remove_from_cache(&handle)
                        .await
                        .unwrap();
                })
            })
        });

        group.bench_with_input(BenchmarkId::new("cached", rows), &linker, |b, linker| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(linker.compute_comparison_vectors("records").await.unwrap())
                })
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_compile,
    bench_fingerprint,
    bench_comparison_vectors
);
criterion_main!(benches);
