use std::collections::HashSet;

use proptest::prelude::*;
use tabula_table::{Aggregation, SortOrder, Table, Value};

fn small_int() -> impl Strategy<Value = Value> {
    (-5i64..5).prop_map(Value::Integer)
}

/// A two-column table `k` (few distinct keys) / `v`.
fn table_strategy() -> impl Strategy<Value = Table> {
    (0usize..40).prop_flat_map(|len| {
        (
            proptest::collection::vec(small_int(), len),
            proptest::collection::vec(any::<i32>().prop_map(Value::from), len),
        )
            .prop_map(|(k, v)| Table::from_pairs([("k", k), ("v", v)]).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn columns_round_trip(table in table_strategy()) {
        let rebuilt = Table::from_pairs(
            table.fields().iter().map(|f| (f.clone(), table.column(f).unwrap().to_vec())),
        ).unwrap();
        prop_assert_eq!(&rebuilt, &table);
        prop_assert_eq!(rebuilt.fields(), ["k", "v"]);
    }

    #[test]
    fn every_column_keeps_the_table_length(table in table_strategy(), extra in small_int()) {
        let len = table.len();
        let mut grown = table.clone();
        grown.append(vec![extra.clone(), extra]).unwrap();
        grown.set_column("c", Value::Null).unwrap();
        let sorted = grown.sort("k", SortOrder::Descending).unwrap();
        let doubled = sorted.concat(&sorted).unwrap();

        for t in [&grown, &sorted] {
            prop_assert_eq!(t.len(), len + 1);
            for idx in 0..t.width() {
                prop_assert_eq!(t.column_at(idx).unwrap().len(), len + 1);
            }
        }
        prop_assert_eq!(doubled.len(), 2 * (len + 1));
    }

    #[test]
    fn full_mask_is_an_independent_copy(table in table_strategy()) {
        let mut copy = table.mask(&vec![true; table.len()]).unwrap();
        prop_assert_eq!(&copy, &table);

        copy.set_column("k", Value::from("changed")).unwrap();
        if !table.is_empty() {
            prop_assert_ne!(&copy, &table);
        }
        prop_assert!(table.column("k").unwrap().iter().all(|v| v.as_str().is_none()));
    }

    #[test]
    fn sort_is_ordered_and_stable(table in table_strategy()) {
        let mut tagged = table.clone();
        tagged.set_column("pos", (0..table.len()).map(Value::from).collect::<Vec<_>>()).unwrap();

        for order in [SortOrder::Ascending, SortOrder::Descending] {
            let sorted = tagged.sort("k", order).unwrap();
            let keys = sorted.column("k").unwrap();
            let pos = sorted.column("pos").unwrap();
            for i in 1..sorted.len() {
                let (a, b) = (keys[i - 1].as_i64().unwrap(), keys[i].as_i64().unwrap());
                match order {
                    SortOrder::Ascending => prop_assert!(a <= b),
                    SortOrder::Descending => prop_assert!(a >= b),
                }
                if a == b {
                    prop_assert!(pos[i - 1].as_i64() < pos[i].as_i64());
                }
            }
        }
    }

    #[test]
    fn grouping_covers_every_row_once(table in table_strategy()) {
        let grouped = table.group_by(&["k"]).unwrap();
        let distinct: HashSet<&Value> = table.column("k").unwrap().iter().collect();
        prop_assert_eq!(grouped.len(), distinct.len());

        let total: usize = grouped.groups().map(|(_, rows)| rows.len()).sum();
        prop_assert_eq!(total, table.len());

        let pair = |k: &Value, v: &Value| (k.as_i64().unwrap(), v.as_i64().unwrap());
        let mut from_groups = Vec::new();
        for (key, rows) in grouped.groups() {
            for row in rows {
                let k = row.get("k").unwrap();
                prop_assert_eq!(std::slice::from_ref(k), key.values());
                from_groups.push(pair(k, row.get("v").unwrap()));
            }
        }
        let mut from_table: Vec<(i64, i64)> = table
            .iter()
            .map(|row| pair(row.get("k").unwrap(), row.get("v").unwrap()))
            .collect();
        from_groups.sort_unstable();
        from_table.sort_unstable();
        prop_assert_eq!(from_groups, from_table);

        let counts = grouped.agg(Aggregation::len(), &[]).unwrap().collect();
        let summed: i64 = counts
            .column("len()")
            .unwrap()
            .iter()
            .filter_map(Value::as_i64)
            .sum();
        prop_assert_eq!(summed as usize, table.len());
    }
}
