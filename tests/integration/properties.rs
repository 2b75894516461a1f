//! Property checks over generated flat datasets.

use crate::integration::support::{ids, schema};
use grove::query::{FilterCondition, FilterMode, FilterOperator, Filters, SortDirection, Sorters};
use grove::{Dataset, Record, Row};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((0i64..8, "[a-c]{0,2}"), 0..24).prop_map(|cells| {
        cells
            .into_iter()
            .enumerate()
            .map(|(index, (size, name))| {
                json!({"id": index, "name": name, "size": size})
                    .as_object()
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    })
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

proptest! {
    #[test]
    fn prop_hash_ignores_non_key_fields(id in any::<i64>(), a in ".*", b in ".*") {
        let left = Record::new(json!({"id": id, "name": a}).as_object().cloned().unwrap(), schema());
        let right = Record::new(json!({"id": id, "name": b}).as_object().cloned().unwrap(), schema());
        prop_assert_eq!(left.get_hash(), right.get_hash());
        prop_assert!(left.is_equal(&right));
    }

    #[test]
    fn prop_sort_is_stable(rows in arb_rows(), direction in arb_direction()) {
        let mut data = Dataset::new(&rows, schema());
        data.sort(&Sorters::single("size", direction), true);
        let sorted = data.records();
        for pair in sorted.windows(2) {
            let (x, y) = (pair[0].get("size"), pair[1].get("size"));
            if x == y {
                prop_assert!(pair[0].get("id").as_i64() < pair[1].get("id").as_i64());
            } else {
                let ascending = x.as_f64() < y.as_f64();
                prop_assert_eq!(ascending, direction == SortDirection::Asc);
            }
        }
    }

    #[test]
    fn prop_filter_then_clear_restores_sorted_view(
        rows in arb_rows(),
        threshold in 0i64..8,
        name in "[a-c]",
    ) {
        let mut data = Dataset::new(&rows, schema());
        data.sort(&Sorters::single("name", SortDirection::Asc), true);
        let before = ids(data.records());

        let filters = Filters::new()
            .with("size", FilterCondition::new(threshold, FilterOperator::Lt))
            .with("name", FilterCondition::new(name, FilterOperator::Like));
        data.filter(Some(&filters), FilterMode::Or, true);
        prop_assert!(data.count() <= before.len());
        for record in data.records() {
            prop_assert!(record.matches(&filters, FilterMode::Or));
        }

        data.filter(None, FilterMode::And, true);
        prop_assert_eq!(ids(data.records()), before);
    }

    #[test]
    fn prop_set_back_to_original_clears_dirty(value in any::<i32>(), original in "[a-z]{1,4}") {
        let record = Record::new(json!({"id": 1, "name": original.clone()}).as_object().cloned().unwrap(), schema());
        record.set("name", value.to_string());
        record.set("name", Value::String(original.clone()));
        prop_assert!(!record.is_updated(None));
        prop_assert_eq!(record.get("name"), Value::String(original));
    }

    #[test]
    fn prop_rollback_restores_every_field(rows in arb_rows(), bump in 1i64..5) {
        let data = Dataset::new(&rows, schema());
        let snapshot: Vec<Row> = data.records().iter().map(Record::data).collect();
        for record in data.records() {
            let size = record.get("size").as_f64().unwrap_or(0.0);
            record.set("size", size + bump as f64);
        }
        prop_assert_eq!(data.rollback_all(), rows.len());
        let restored: Vec<Row> = data.records().iter().map(Record::data).collect();
        prop_assert_eq!(restored, snapshot);
        prop_assert!(!data.is_updated());
    }
}
