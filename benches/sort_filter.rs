use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grove::query::{FilterCondition, FilterMode, FilterOperator, Filters, SortDirection, Sorters};
use grove::{Dataset, FieldDef, FieldType, Row, Schema};
use serde_json::json;
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(vec![
            FieldDef::new("id", FieldType::Int),
            FieldDef::new("name", FieldType::String),
            FieldDef::new("size", FieldType::Float),
            FieldDef::untyped("children"),
        ])
        .with_primary_keys(["id"]),
    )
}

/// `count` top-level rows, each with four children
fn generate_rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let children: Vec<_> = (0..4)
                .map(|j| json!({"id": count + i * 4 + j, "name": format!("leaf-{}", (i * 7 + j) % 97), "size": (j * 13 % 5)}))
                .collect();
            json!({
                "id": i,
                "name": format!("node-{}", (i * 31) % 1000),
                "size": (i * 17 % 101) as f64 / 3.0,
                "children": children,
            })
            .as_object()
            .cloned()
            .unwrap_or_default()
        })
        .collect()
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("dataset_sort");
    for size in [100, 1_000, 10_000] {
        let rows = generate_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            let mut data = Dataset::new(rows, schema());
            let mut direction = SortDirection::Asc;
            b.iter(|| {
                direction = match direction {
                    SortDirection::Asc => SortDirection::Desc,
                    SortDirection::Desc => SortDirection::Asc,
                };
                let sorters = Sorters::single("size", direction).with("name", SortDirection::Asc);
                black_box(data.sort(&sorters, true));
            });
        });
    }
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dataset_filter");
    let filters = Filters::new()
        .with("name", FilterCondition::new("leaf-1", FilterOperator::Like))
        .with("size", FilterCondition::new(2, FilterOperator::Ge));
    for size in [100, 1_000, 10_000] {
        let rows = generate_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            let mut data = Dataset::new(rows, schema());
            b.iter(|| {
                data.filter(Some(&filters), FilterMode::And, true);
                black_box(data.count());
                data.filter(None, FilterMode::And, true);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sort, bench_filter);
criterion_main!(benches);
