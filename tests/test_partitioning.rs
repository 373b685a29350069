//! Integration tests for split tables and partition reconstruction

use kolosal_openml::data::{SplitRecord, SplitRole, SplitTable};
use kolosal_openml::partition::{repeat_from_run_number, PartitionBuilder};
use kolosal_openml::TaskRunError;
use polars::prelude::*;

fn ten_rows() -> DataFrame {
    df!(
        "x" => &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        "class" => &["a", "a", "b", "b", "a", "b", "a", "b", "a", "b"]
    )
    .unwrap()
}

/// Rows 0-4 in fold 0 and rows 5-9 in fold 1; the first three of each block train,
/// the last two test
fn two_fold_splits() -> SplitTable {
    let mut records = Vec::new();
    for row in 0..10usize {
        let fold = (row / 5) as u32;
        let role = if row % 5 < 3 { SplitRole::Train } else { SplitRole::Test };
        records.push(SplitRecord::new(0, fold, None, role, row));
    }
    SplitTable::new(records, false)
}

// ============================================================================
// Split table parsing
// ============================================================================

#[test]
fn test_split_table_from_frame() {
    let frame = df!(
        "type" => &["TRAIN", "TEST", "TRAIN", "TEST"],
        "rowid" => &[0i64, 1, 1, 0],
        "repeat" => &[0i64, 0, 0, 0],
        "fold" => &[0i64, 0, 1, 1]
    )
    .unwrap();

    let table = SplitTable::from_frame(&frame).unwrap();
    assert_eq!(table.len(), 4);
    assert!(!table.has_samples());
    assert_eq!(table.records()[1].role, SplitRole::Test);
    assert_eq!(table.records()[2].fold, 1);
}

#[test]
fn test_split_table_missing_column() {
    let frame = df!(
        "type" => &["TRAIN"],
        "rowid" => &[0i64],
        "fold" => &[0i64]
    )
    .unwrap();

    let err = SplitTable::from_frame(&frame).unwrap_err();
    assert!(matches!(err, TaskRunError::SplitError(_)));
}

// ============================================================================
// Partition reconstruction
// ============================================================================

#[test]
fn test_ten_row_two_fold_example() {
    let partitions = PartitionBuilder::new(2, 1)
        .build(&ten_rows(), &two_fold_splits(), 0)
        .unwrap();

    let cells: Vec<_> = partitions.iter().collect();
    assert_eq!(cells.len(), 2);
    assert_eq!((cells[0].fold, cells[0].sample), (0, 0));
    assert_eq!((cells[1].fold, cells[1].sample), (1, 0));

    assert_eq!(cells[0].train_row_ids, vec![0, 1, 2]);
    assert_eq!(cells[0].test_row_ids, vec![3, 4]);
    assert_eq!(cells[1].train_row_ids, vec![5, 6, 7]);
    assert_eq!(cells[1].test_row_ids, vec![8, 9]);

    let test_x: Vec<Option<f64>> = cells[1]
        .test
        .column("x")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(test_x, vec![Some(8.0), Some(9.0)]);
    assert_eq!(cells[1].test.width(), 2);
}

#[test]
fn test_assigned_rows_match_table() {
    let mut records = Vec::new();
    for repeat in 0..3u32 {
        for row in 0..10usize {
            let fold = ((row + repeat as usize) % 4) as u32;
            records.push(SplitRecord::new(repeat, fold, None, SplitRole::Test, row));
            for other in 0..4u32 {
                if other != fold {
                    records.push(SplitRecord::new(repeat, other, None, SplitRole::Train, row));
                }
            }
        }
        records.push(SplitRecord::new(repeat, 0, None, SplitRole::Other, 0));
    }
    let table = SplitTable::new(records, false);
    let frame = ten_rows();

    for repeat in 0..3 {
        let partitions = PartitionBuilder::new(4, 1).build(&frame, &table, repeat).unwrap();
        assert_eq!(partitions.assigned_rows(), table.assigned_in_repeat(repeat));
        assert_eq!(partitions.assigned_rows(), 40);
    }
}

#[test]
fn test_rebuild_is_deterministic() {
    let frame = ten_rows();
    let table = two_fold_splits();
    let builder = PartitionBuilder::new(2, 1);

    let first = builder.build(&frame, &table, 0).unwrap();
    let second = builder.build(&frame, &table, 0).unwrap();

    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.train_row_ids, b.train_row_ids);
        assert_eq!(a.test_row_ids, b.test_row_ids);
        assert!(a.test.equals(&b.test));
    }
}

#[test]
fn test_sample_dimension() {
    let records = vec![
        SplitRecord::new(0, 0, Some(0), SplitRole::Train, 0),
        SplitRecord::new(0, 0, Some(1), SplitRole::Train, 0),
        SplitRecord::new(0, 0, Some(1), SplitRole::Train, 1),
        SplitRecord::new(0, 0, Some(0), SplitRole::Test, 9),
        SplitRecord::new(0, 0, Some(1), SplitRole::Test, 9),
    ];
    let table = SplitTable::new(records, true);

    let partitions = PartitionBuilder::new(1, 2).build(&ten_rows(), &table, 0).unwrap();
    assert_eq!(partitions.cell(0, 0).unwrap().train.height(), 1);
    assert_eq!(partitions.cell(0, 1).unwrap().train.height(), 2);
    assert!(partitions.cell(0, 2).is_none());
}

#[test]
fn test_row_id_out_of_range() {
    let table = SplitTable::new(
        vec![SplitRecord::new(0, 0, None, SplitRole::Test, 10)],
        false,
    );
    let err = PartitionBuilder::new(1, 1)
        .build(&ten_rows(), &table, 0)
        .unwrap_err();
    assert!(matches!(err, TaskRunError::SplitError(_)));
}

#[test]
fn test_run_numbers_are_one_based() {
    assert_eq!(repeat_from_run_number(1).unwrap(), 0);
    assert_eq!(repeat_from_run_number(4).unwrap(), 3);
    assert!(repeat_from_run_number(0).is_err());
}
