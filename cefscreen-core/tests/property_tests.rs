//! Property tests for the query model and engine invariants.
//!
//! Uses proptest to verify:
//! 1. Date offsets round-trip through their textual form
//! 2. Percentile buckets stay in range and follow the value order
//! 3. Market-cap filtering is inclusive at the threshold

use cefscreen_core::engine::eval::percentile_buckets;
use cefscreen_core::engine::{LocalEngine, Security, SecurityStore};
use cefscreen_core::expr::{DataItem, Expr};
use cefscreen_core::offset::{DateOffset, OffsetUnit};
use cefscreen_core::predicate::{Predicate, Universe};
use cefscreen_core::request::{NamedField, Request};
use cefscreen_core::QueryClient;
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_unit() -> impl Strategy<Value = OffsetUnit> {
    prop_oneof![
        Just(OffsetUnit::Day),
        Just(OffsetUnit::Week),
        Just(OffsetUnit::Month),
        Just(OffsetUnit::Year),
    ]
}

fn arb_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1000.0..1000.0_f64, 1..60)
}

// ── 1. Offset Text Round-Trip ───────────────────────────────────────

proptest! {
    #[test]
    fn offset_round_trips(amount in -500i32..500, unit in arb_unit()) {
        let offset = DateOffset::new(amount, unit);
        let parsed: DateOffset = offset.to_string().parse().unwrap();
        prop_assert_eq!(parsed, offset);
    }
}

// ── 2. Percentile Buckets ────────────────────────────────────────────

proptest! {
    /// Every member gets exactly one bucket in 1..=buckets.
    #[test]
    fn buckets_in_range(values in arb_values(), buckets in 1u32..=100) {
        let slots: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
        let ranked = percentile_buckets(&slots, buckets);
        prop_assert_eq!(ranked.len(), values.len());
        for (_, b) in &ranked {
            prop_assert!(*b >= 1 && *b <= buckets);
        }
    }

    /// A strictly larger value never lands in a lower bucket.
    #[test]
    fn buckets_follow_value_order(values in arb_values()) {
        let slots: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
        let ranked = percentile_buckets(&slots, 100);
        let bucket_of = |slot: usize| ranked.iter().find(|(s, _)| *s == slot).map(|(_, b)| *b);
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    prop_assert!(bucket_of(i) <= bucket_of(j));
                }
            }
        }
    }

    /// The smallest value of a group is always in bucket 1.
    #[test]
    fn minimum_is_first_bucket(values in arb_values()) {
        let slots: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
        let ranked = percentile_buckets(&slots, 100);
        prop_assert_eq!(ranked[0].1, 1);
    }
}

// ── 3. Inclusive Market-Cap Threshold ───────────────────────────────

proptest! {
    #[test]
    fn cap_threshold_is_inclusive(threshold_mm in 1u64..5_000, delta in -3i64..=3) {
        let cap = (threshold_mm as i64 * 1_000_000 + delta) as f64;
        let store: SecurityStore = [Security::new("AAA US Equity", "Alpha").with_market_cap(cap)]
            .into_iter()
            .collect();
        let engine = LocalEngine::new(store)
            .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 7).unwrap());

        let universe = Universe::active_primary_funds().filtered(Predicate::at_least(
            Expr::item(DataItem::CurMktCap),
            threshold_mm as f64 * 1_000_000.0,
        ));
        let fields = vec![NamedField::new("name", Expr::item(DataItem::Name))];
        let request = Request::new(universe, fields);
        let frames = engine.execute(&request).unwrap();
        prop_assert_eq!(frames[0].len() == 1, delta >= 0);
    }
}
