//! Integration tests: the local engine evaluating full requests.

use cefscreen_core::engine::{synthetic_universe, LocalEngine, Observation, Security, SecurityStore};
use cefscreen_core::expr::{DataItem, Expr};
use cefscreen_core::frame::Cell;
use cefscreen_core::offset::{DateOffset, DateRange};
use cefscreen_core::predicate::{Predicate, Universe};
use cefscreen_core::request::{NamedField, Request};
use cefscreen_core::states::STATES;
use cefscreen_core::{ClientError, QueryClient};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
}

/// Weekdays of the last `n` calendar days up to the as-of date.
fn recent_weekdays(n: i64) -> Vec<NaiveDate> {
    (0..n)
        .rev()
        .map(|k| as_of() - Duration::days(k))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

fn flat(item: DataItem, value: f64, sec: Security) -> Security {
    let obs = recent_weekdays(200)
        .into_iter()
        .map(|d| Observation::new(d, value))
        .collect();
    sec.with_series(item, obs)
}

fn premium() -> Expr {
    Expr::item(DataItem::PxLast)
        .divided_by(Expr::item(DataItem::FundNetAssetVal))
        .minus(1.0)
        .named("premium")
}

#[test]
fn percentile_ranks_within_each_group() {
    let rows = [("A1", "A", 1.0), ("A2", "A", 3.0), ("A3", "A", 2.0), ("B1", "B", 5.0)];
    let store: SecurityStore = rows
        .into_iter()
        .map(|(id, grp, v)| Security::new(id, id).with_cde("GRP", grp).with_market_cap(v))
        .collect();
    let engine = LocalEngine::new(store).with_as_of(as_of());
    let request = Request::new(
        Universe::active_primary_funds(),
        vec![NamedField::new(
            "pct",
            Expr::item(DataItem::CurMktCap).percentile_within(Expr::cde("GRP"), 100),
        )],
    );
    let frames = engine.execute(&request).unwrap();
    let pct = &frames[0];
    assert_eq!(pct.get("A1"), Some(&Cell::Num(1.0)));
    assert_eq!(pct.get("A3"), Some(&Cell::Num(34.0)));
    assert_eq!(pct.get("A2"), Some(&Cell::Num(67.0)));
    assert_eq!(pct.get("B1"), Some(&Cell::Num(1.0)));
}

#[test]
fn rolling_zscore_of_premium() {
    let mut prices: Vec<Observation> = recent_weekdays(200)
        .into_iter()
        .map(|d| Observation::new(d, 10.0))
        .collect();
    if let Some(last) = prices.last_mut() {
        last.value = 11.0;
    }
    let jump = flat(DataItem::FundNetAssetVal, 10.0, Security::new("JUMP", "Jump"))
        .with_series(DataItem::PxLast, prices);
    let steady = flat(
        DataItem::FundNetAssetVal,
        10.0,
        flat(DataItem::PxLast, 10.0, Security::new("FLAT", "Flat")),
    );
    let engine = LocalEngine::new([jump, steady].into_iter().collect()).with_as_of(as_of());

    let zscore = premium()
        .rolling(DateRange::trailing(DateOffset::days(-90)))
        .dropna()
        .zscore()
        .last();
    let request = Request::new(
        Universe::active_primary_funds(),
        vec![
            NamedField::new("current premium/ discount", premium()),
            NamedField::new("90-day Zscore", zscore),
        ],
    );
    let frames = engine.execute(&request).unwrap();

    assert_eq!(frames[0].get("FLAT"), Some(&Cell::Num(0.0)));
    assert_eq!(frames[0].get("JUMP"), Some(&Cell::Num(11.0 / 10.0 - 1.0)));
    let z = frames[1].get("JUMP").and_then(Cell::as_f64).unwrap();
    assert!(z > 3.0, "a one-day jump should stand far above a flat window, got {z}");
    // Zero deviation has no z-score.
    assert_eq!(frames[1].get("FLAT"), Some(&Cell::Missing));
}

#[test]
fn premium_is_zero_when_price_equals_nav() {
    let sec = flat(
        DataItem::FundNetAssetVal,
        12.5,
        flat(DataItem::PxLast, 12.5, Security::new("PAR", "Par")),
    );
    let engine = LocalEngine::new([sec].into_iter().collect()).with_as_of(as_of());
    let request = Request::new(
        Universe::active_primary_funds(),
        vec![NamedField::new("current premium/ discount", premium())],
    );
    let frames = engine.execute(&request).unwrap();
    assert_eq!(frames[0].get("PAR"), Some(&Cell::Num(0.0)));
}

#[test]
fn text_arithmetic_is_an_evaluation_error() {
    let engine = LocalEngine::new([Security::new("AAA", "Alpha")].into_iter().collect());
    let request = Request::new(
        Universe::active_primary_funds(),
        vec![NamedField::new("bad", Expr::item(DataItem::Name).plus(1.0))],
    );
    assert!(matches!(engine.execute(&request), Err(ClientError::Evaluation(_))));
}

#[test]
fn synthetic_universe_answers_us_fund_filter() {
    let engine = LocalEngine::new(synthetic_universe(42, as_of())).with_as_of(as_of());
    let us_funds = Predicate::equals(Expr::item(DataItem::FundType), "Closed-End Fund")
        .and(Predicate::equals(Expr::item(DataItem::FundGeoFocus), "U.S."))
        .or(Predicate::is_in(Expr::item(DataItem::FundGeoFocus), STATES.iter().copied()));
    let request = Request::new(
        Universe::active_primary_funds().filtered(us_funds),
        vec![
            NamedField::new("name", Expr::item(DataItem::Name)),
            NamedField::new("geo", Expr::item(DataItem::FundGeoFocus)),
        ],
    );
    let frames = engine.execute(&request).unwrap();
    assert!(!frames[0].is_empty());
    for (_, cell) in &frames[1].rows {
        let geo = cell.as_text().unwrap();
        assert!(geo == "U.S." || STATES.contains(&geo), "unexpected focus {geo}");
    }
}
