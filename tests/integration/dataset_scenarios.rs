//! Dataset and record behavior end to end, without a store.

use crate::integration::support::{ids, row, rows, schema};
use grove::query::{FilterCondition, FilterMode, FilterOperator, Filters, SortDirection, Sorters};
use grove::{Dataset, Record};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

#[test]
fn sort_then_filter_then_unfilter_keeps_sorted_order() {
    let mut data = Dataset::new(
        &rows(json!([
            {"id": 1, "name": "b"},
            {"id": 2, "name": "a"},
            {"id": 3, "name": "c"}
        ])),
        schema(),
    );

    data.sort(&Sorters::single("name", SortDirection::Asc), true);
    assert_eq!(ids(data.records()), vec![2, 1, 3]);

    let filters: Filters = serde_json::from_value(json!({"name": {"value": "a", "operator": "="}}))
        .unwrap();
    data.filter(Some(&filters), FilterMode::And, true);
    assert_eq!(ids(data.records()), vec![2]);

    data.filter(None, FilterMode::And, true);
    assert_eq!(ids(data.records()), vec![2, 1, 3]);
}

#[test]
fn nested_filter_is_reversible_at_every_level() {
    let mut data = Dataset::new(
        &rows(json!([
            {"id": 1, "name": "root", "children": [
                {"id": 2, "name": "left", "children": [
                    {"id": 4, "name": "target"},
                    {"id": 5, "name": "other"}
                ]},
                {"id": 3, "name": "right", "children": [{"id": 6, "name": "other"}]}
            ]},
            {"id": 7, "name": "elsewhere"}
        ])),
        schema(),
    );
    let root = data.records()[0].clone();
    let left = root.child(0).unwrap();
    let root_before = root.origin_children();
    let left_before = left.origin_children();

    let filters = Filters::new().with("name", FilterCondition::equals("target"));
    data.filter(Some(&filters), FilterMode::And, true);
    assert_eq!(ids(data.records()), vec![1]);
    assert_eq!(ids(root.children().as_slice()), vec![2]);
    assert_eq!(ids(left.children().as_slice()), vec![4]);

    data.filter(None, FilterMode::And, true);
    assert_eq!(ids(data.records()), vec![1, 7]);
    assert!(root.children().same_as(&root_before));
    assert!(left.children().same_as(&left_before));
}

#[test]
fn sort_reaches_every_level() {
    let mut data = Dataset::new(
        &rows(json!([
            {"id": 1, "size": 2, "children": [
                {"id": 10, "size": 9},
                {"id": 11, "size": 1},
                {"id": 12, "size": 5}
            ]},
            {"id": 2, "size": 1}
        ])),
        schema(),
    );
    data.sort(&Sorters::single("size", SortDirection::Desc), true);
    assert_eq!(ids(data.records()), vec![1, 2]);
    assert_eq!(ids(data.records()[0].children().as_slice()), vec![10, 12, 11]);
}

#[test]
fn filter_with_numeric_operators_and_or_mode() {
    let mut data = Dataset::new(
        &rows(json!([
            {"id": 1, "name": "alpha", "size": "1.5"},
            {"id": 2, "name": "beta", "size": 7},
            {"id": 3, "name": "gamma", "size": null}
        ])),
        schema(),
    );
    let filters = Filters::new()
        .with("size", FilterCondition::new(5, FilterOperator::Gt))
        .with("name", FilterCondition::new("ALP", FilterOperator::Like));
    data.filter(Some(&filters), FilterMode::Or, true);
    assert_eq!(ids(data.records()), vec![1, 2]);

    data.filter(Some(&filters), FilterMode::And, true);
    assert!(data.records().is_empty());
}

#[test]
fn deleted_rows_return_when_filter_is_cleared() {
    let mut data = Dataset::new(
        &rows(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])),
        schema(),
    );
    let doomed = Record::new(row(json!({"id": "2"})), schema());
    assert_eq!(data.delete(&[doomed]), 1);
    assert_eq!(ids(data.records()), vec![1]);

    data.filter(None, FilterMode::And, true);
    assert_eq!(ids(data.records()), vec![1, 2]);
}

#[test]
fn edits_commit_and_roll_back_across_the_tree() {
    let data = Dataset::new(
        &rows(json!([
            {"id": 1, "name": "a", "children": [{"id": 2, "name": "b"}]},
            {"id": 3, "name": "c"}
        ])),
        schema(),
    );
    let child = data.records()[0].child(0).unwrap();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    child.set_observer(move |key, value, original| {
        sink.lock()
            .push((key.to_string(), value.clone(), original.clone()));
    });

    child.set("name", "renamed");
    data.records()[1].set("size", 2.5);
    assert_eq!(data.updated_records().len(), 2);

    assert_eq!(data.commit_all(), 2);
    assert!(!data.is_updated());
    assert_eq!(child.origin().unwrap().get("name"), Some(&json!("renamed")));

    child.set("name", "again");
    assert_eq!(data.rollback_all(), 1);
    assert_eq!(child.get("name"), json!("renamed"));

    let changes = changes.lock();
    assert_eq!(changes[0], ("name".to_string(), json!("renamed"), json!("b")));
    assert_eq!(changes.len(), 4);
}

#[test]
fn records_with_same_primary_key_share_identity() {
    let a = Record::new(row(json!({"id": 5, "name": "x"})), schema());
    let b = Record::new(row(json!({"id": "5", "name": "y"})), schema());
    assert_eq!(a.get_hash(), b.get_hash());
    assert!(a.is_equal(&b));
    assert!(a.is_equal(&row(json!({"id": 5.0}))));
}
