use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_openml::data::{SplitRecord, SplitRole, SplitTable};
use kolosal_openml::partition::PartitionBuilder;
use polars::prelude::*;

const FOLDS: u32 = 10;

fn create_dataset(n_rows: usize, n_features: usize) -> DataFrame {
    let mut columns: Vec<Column> = (0..n_features)
        .map(|i| {
            let values: Vec<f64> = (0..n_rows).map(|r| ((r * 31 + i * 7) % 97) as f64).collect();
            Column::new(format!("feature_{}", i).into(), values)
        })
        .collect();

    let class: Vec<&str> = (0..n_rows).map(|r| if r % 3 == 0 { "pos" } else { "neg" }).collect();
    columns.push(Column::new("class".into(), class));

    DataFrame::new(columns).unwrap()
}

/// Ten-fold cross-validation over `repeats` repeats with a rotating fold assignment
fn create_splits(n_rows: usize, repeats: u32) -> SplitTable {
    let mut records = Vec::with_capacity(n_rows * (FOLDS as usize) * repeats as usize);
    for repeat in 0..repeats {
        for row in 0..n_rows {
            let test_fold = ((row as u32) + repeat) % FOLDS;
            for fold in 0..FOLDS {
                let role = if fold == test_fold { SplitRole::Test } else { SplitRole::Train };
                records.push(SplitRecord::new(repeat, fold, None, role, row));
            }
        }
    }
    SplitTable::new(records, false)
}

fn bench_partitioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("partitioning");
    group.sample_size(20);

    for n_rows in [1000, 10000, 50000].iter() {
        let df = create_dataset(*n_rows, 10);
        let splits = create_splits(*n_rows, 2);
        let builder = PartitionBuilder::new(FOLDS, 1);

        group.bench_with_input(
            BenchmarkId::new("build", n_rows),
            &(df, splits),
            |b, (df, splits)| {
                b.iter(|| builder.build(black_box(df), black_box(splits), 1).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_split_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_table");

    for n_rows in [1000, 10000].iter() {
        let splits = create_splits(*n_rows, 1);
        let frame = df!(
            "type" => splits.records().iter().map(|r| if r.role == SplitRole::Test { "TEST" } else { "TRAIN" }).collect::<Vec<_>>(),
            "rowid" => splits.records().iter().map(|r| r.row_id as i64).collect::<Vec<_>>(),
            "repeat" => splits.records().iter().map(|r| r.repeat as i64).collect::<Vec<_>>(),
            "fold" => splits.records().iter().map(|r| r.fold as i64).collect::<Vec<_>>()
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::new("from_frame", n_rows), &frame, |b, frame| {
            b.iter(|| SplitTable::from_frame(black_box(frame)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_partitioning, bench_split_parsing);
criterion_main!(benches);
