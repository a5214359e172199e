//! Shared fixture: a small hand-built fund store with known answers.

#![allow(dead_code)]

use cefscreen_core::engine::{LocalEngine, Observation, Security, SecurityStore};
use cefscreen_core::expr::DataItem;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub const MAIN: &str = "UD_MAIN_GROUP";
pub const SUB: &str = "UD_SUB_GROUP";

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
}

fn weekdays(days: i64) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .map(|k| as_of() - Duration::days(k))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

fn constant(days: &[NaiveDate], value: f64) -> Vec<Observation> {
    days.iter().map(|d| Observation::new(*d, value)).collect()
}

/// Monthly dividend on the 1st of each month for four years.
fn monthly(amount: f64) -> Vec<Observation> {
    (0..48)
        .filter_map(|m| as_of().checked_sub_months(chrono::Months::new(m)))
        .map(|d| Observation::new(d.with_day(1).unwrap(), amount))
        .collect()
}

/// A fund with flat price, NAV and volume histories and a flat dividend.
pub fn fund(
    id: &str,
    main: &str,
    cap_mm: f64,
    price: f64,
    nav: f64,
    dividend: f64,
) -> Security {
    let days = weekdays(400);
    Security::new(format!("{id} US Equity"), format!("{id} Fund"))
        .with_fund_type("Closed-End Fund")
        .with_geo_focus("U.S.")
        .with_cde(MAIN, main)
        .with_cde(SUB, "X")
        .with_market_cap(cap_mm * 1_000_000.0)
        .with_max_drawdown(-0.2)
        .with_series(DataItem::PxLast, constant(&days, price))
        .with_series(DataItem::FundNetAssetVal, constant(&days, nav))
        .with_series(DataItem::PxVolume, constant(&days, 50_000.0))
        .with_series(DataItem::CashDivs, monthly(dividend))
        .with_series(DataItem::RegularCashDividendPerShare, monthly(dividend))
        .with_series(DataItem::DividendYield, constant(&days, dividend * 12.0 / price))
}

/// Two group-A funds pass the $100MM screen; one is too small, one is in
/// group B.
pub fn store() -> SecurityStore {
    // Qualifies through its state focus rather than its fund type.
    let mut state_fund = fund("S4", "A", 100.0, 10.0, 9.5, 0.05).with_geo_focus("California");
    state_fund.fund_type = None;
    [
        fund("S1", "A", 150.0, 10.0, 11.0, 0.10),
        fund("S2", "A", 80.0, 10.0, 10.0, 0.08),
        fund("S3", "B", 500.0, 10.0, 10.0, 0.08),
        state_fund,
    ]
    .into_iter()
    .collect()
}

pub fn engine() -> LocalEngine {
    LocalEngine::new(store()).with_as_of(as_of())
}
