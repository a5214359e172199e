//! Deterministic demo universe.
//!
//! Builds a store of closed-end funds spread over a few main and sub groups,
//! with six years of daily prices, NAVs and volumes plus monthly dividends
//! ending at `end`. The same seed always yields the same store.

use super::store::{Observation, Security, SecurityStore};
use crate::expr::DataItem;
use crate::states::STATES;
use chrono::{Datelike, Months, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MAIN_GROUP_CODE: &str = "UD_MAIN_GROUP";
pub const SUB_GROUP_CODE: &str = "UD_SUB_GROUP";

const HISTORY_YEARS: u32 = 6;
const FUNDS_PER_SUB_GROUP: usize = 5;

/// (main group, ticker prefix, sub groups)
const GROUPS: &[(&str, &str, &[&str])] = &[
    ("Equity", "EQ", &["Core Equity", "Covered Call", "Sector Equity"]),
    ("Taxable Fixed Income", "TX", &["High Yield", "Senior Loan", "Multisector"]),
    ("Municipal", "MU", &["National Muni", "Single State Muni"]),
];

fn is_weekday(d: &NaiveDate) -> bool {
    !matches!(d.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Roughly normal draw from the sum of uniforms.
fn noise(rng: &mut StdRng) -> f64 {
    (0..6).map(|_| rng.gen_range(-1.0f64..1.0)).sum::<f64>() / 2f64.sqrt()
}

fn max_drawdown(prices: &[Observation]) -> Option<f64> {
    let mut peak = f64::MIN;
    let mut worst: Option<f64> = None;
    for o in prices {
        peak = peak.max(o.value);
        let dd = o.value / peak - 1.0;
        worst = Some(worst.map_or(dd, |w: f64| w.min(dd)));
    }
    worst
}

struct Histories {
    price: Vec<Observation>,
    nav: Vec<Observation>,
    volume: Vec<Observation>,
}

fn daily_histories(rng: &mut StdRng, days: &[NaiveDate]) -> Histories {
    let mut nav: f64 = rng.gen_range(9.0..25.0);
    let drift: f64 = rng.gen_range(-0.00005..0.0003);
    let vol: f64 = rng.gen_range(0.003..0.012);
    let fair_premium: f64 = rng.gen_range(-0.12..0.04);
    let mut premium = fair_premium;
    let avg_volume: f64 = rng.gen_range(15_000.0..400_000.0);

    let mut h = Histories {
        price: Vec::with_capacity(days.len()),
        nav: Vec::with_capacity(days.len()),
        volume: Vec::with_capacity(days.len()),
    };
    for &day in days {
        nav *= 1.0 + drift + vol * noise(rng);
        premium += 0.04 * (fair_premium - premium) + 0.006 * noise(rng);
        let price = nav * (1.0 + premium);
        h.nav.push(Observation::new(day, (nav * 100.0).round() / 100.0));
        h.price.push(Observation::new(day, (price * 100.0).round() / 100.0));
        h.volume.push(Observation::new(
            day,
            (avg_volume * rng.gen_range(0.3f64..1.8)).round(),
        ));
    }
    h
}

/// Monthly dividends paid on the first weekday of each month.
fn monthly_dividends(
    rng: &mut StdRng,
    start: NaiveDate,
    end: NaiveDate,
    initial_price: f64,
) -> Vec<Observation> {
    let mut amount = initial_price * rng.gen_range(0.04f64..0.10) / 12.0;
    let yearly_change: f64 = rng.gen_range(-0.08..0.06);
    let mut divs = Vec::new();
    let mut month = start.with_day(1).unwrap_or(start);
    while month <= end {
        let pay = month.iter_days().find(is_weekday).unwrap_or(month);
        if pay >= start && pay <= end {
            if pay.month() == 1 {
                amount *= 1.0 + yearly_change;
            }
            divs.push(Observation::new(pay, (amount * 10_000.0).round() / 10_000.0));
        }
        month = match month.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    divs
}

/// Trailing 12-month yield, observed on each dividend date.
fn trailing_yield(divs: &[Observation], prices: &[Observation]) -> Vec<Observation> {
    divs.iter()
        .enumerate()
        .filter_map(|(i, d)| {
            let idx = prices.partition_point(|p| p.date <= d.date).checked_sub(1)?;
            let paid: f64 = divs[i.saturating_sub(11)..=i].iter().map(|o| o.value).sum();
            let annual = paid * 12.0 / (i.min(11) + 1) as f64;
            Some(Observation::new(d.date, annual / prices[idx].value))
        })
        .collect()
}

/// Seeded demo store with history ending at `end`.
pub fn synthetic_universe(seed: u64, end: NaiveDate) -> SecurityStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = end
        .checked_sub_months(Months::new(12 * HISTORY_YEARS))
        .unwrap_or(end);
    let days: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(is_weekday)
        .collect();

    let mut store = SecurityStore::new();
    for (main, prefix, subs) in GROUPS {
        for (s, sub) in subs.iter().enumerate() {
            for n in 0..FUNDS_PER_SUB_GROUP {
                let id = format!("{prefix}{}{n} US Equity", s + 1);
                let name = format!("{sub} Fund {}", (b'A' + n as u8) as char);

                let geo = if *sub == "Single State Muni" {
                    STATES[rng.gen_range(0..STATES.len())].to_string()
                } else if rng.gen_bool(0.1) {
                    "Global".to_string()
                } else {
                    "U.S.".to_string()
                };

                let h = daily_histories(&mut rng, &days);
                let first_price = h.price.first().map_or(10.0, |o| o.value);
                let divs = monthly_dividends(&mut rng, start, end, first_price);
                let yields = trailing_yield(&divs, &h.price);
                let shares: f64 = rng.gen_range(4.0e6..8.0e7);
                let market_cap = h.price.last().map(|o| o.value * shares);

                let mut sec = Security::new(id, name)
                    .with_fund_type("Closed-End Fund")
                    .with_geo_focus(geo)
                    .with_cde(MAIN_GROUP_CODE, *main)
                    .with_cde(SUB_GROUP_CODE, *sub);
                sec.market_cap = market_cap;
                sec.max_drawdown = max_drawdown(&h.price);
                sec.active = !rng.gen_bool(0.05);

                let sec = sec
                    .with_series(DataItem::RegularCashDividendPerShare, divs.clone())
                    .with_series(DataItem::CashDivs, divs)
                    .with_series(DataItem::DividendYield, yields)
                    .with_series(DataItem::PxLast, h.price)
                    .with_series(DataItem::FundNetAssetVal, h.nav)
                    .with_series(DataItem::PxVolume, h.volume);
                store.insert(sec);
            }
        }
    }
    tracing::debug!(securities = store.len(), %start, %end, seed, "built synthetic universe");
    store
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn same_seed_same_store() {
        let a = synthetic_universe(7, end());
        let b = synthetic_universe(7, end());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn every_fund_is_classified_with_history() {
        let store = synthetic_universe(1, end());
        assert_eq!(store.len(), 8 * FUNDS_PER_SUB_GROUP);
        for sec in store.iter() {
            assert!(sec.cde.contains_key(MAIN_GROUP_CODE));
            assert!(sec.cde.contains_key(SUB_GROUP_CODE));
            let prices = sec.observations(&DataItem::PxLast);
            assert!(prices.len() > 1500);
            assert_eq!(prices.last().map(|o| o.date), Some(end()));
            // Six years of monthly dividends.
            assert!(sec.observations(&DataItem::CashDivs).len() >= 71);
            assert!(sec.max_drawdown.is_some_and(|dd| dd <= 0.0));
        }
    }

    #[test]
    fn daily_volumes_are_whole_shares_within_band() {
        let mut rng = StdRng::seed_from_u64(11);
        let days: Vec<NaiveDate> = end().iter_days().take(30).collect();
        let h = daily_histories(&mut rng, &days);
        assert_eq!(h.volume.len(), days.len());
        for obs in &h.volume {
            assert_eq!(obs.value, obs.value.round());
            // 0.3x..1.8x of an average drawn from 15k..400k.
            assert!(obs.value >= 4_500.0 && obs.value <= 720_000.0, "{}", obs.value);
        }
        for (p, n) in h.price.iter().zip(&h.nav) {
            assert!(p.value > 0.0 && n.value > 0.0);
        }
    }

    #[test]
    fn drawdown_of_rising_prices_is_zero() {
        let d = end();
        let prices = vec![Observation::new(d, 1.0), Observation::new(d, 2.0)];
        assert_eq!(max_drawdown(&prices), Some(0.0));
        let prices = vec![Observation::new(d, 2.0), Observation::new(d, 1.0)];
        assert_eq!(max_drawdown(&prices), Some(-0.5));
    }
}
