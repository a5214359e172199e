//! In-memory security store backing the local engine.

use crate::expr::DataItem;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One dated observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A fund with its static attributes and dated series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Security {
    /// Ticker-style identifier, e.g. `EQ10 US Equity`.
    pub id: String,
    pub name: String,
    /// `Closed-End Fund` for everything the screen keeps.
    pub fund_type: Option<String>,
    /// `U.S.`, `Global` or a state name for single-state munis.
    pub geo_focus: Option<String>,
    /// Cleared once a fund is delisted or liquidated.
    pub active: bool,
    /// Primary listing of the fund, as opposed to a secondary line.
    pub primary: bool,
    /// Custom data elements, code → value.
    pub cde: BTreeMap<String, String>,
    /// In dollars.
    pub market_cap: Option<f64>,
    /// Worst peak-to-trough fall over the stored price history, as a
    /// non-positive fraction.
    pub max_drawdown: Option<f64>,
    /// Dated series per time-series item, ascending by date.
    pub series: BTreeMap<DataItem, Vec<Observation>>,
}

impl Security {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            primary: true,
            ..Self::default()
        }
    }

    pub fn with_cde(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        self.cde.insert(code.into(), value.into());
        self
    }

    pub fn with_fund_type(mut self, fund_type: impl Into<String>) -> Self {
        self.fund_type = Some(fund_type.into());
        self
    }

    pub fn with_geo_focus(mut self, geo: impl Into<String>) -> Self {
        self.geo_focus = Some(geo.into());
        self
    }

    pub fn with_market_cap(mut self, cap: f64) -> Self {
        self.market_cap = Some(cap);
        self
    }

    pub fn with_max_drawdown(mut self, dd: f64) -> Self {
        self.max_drawdown = Some(dd);
        self
    }

    /// Attach a series; observations are sorted by date.
    pub fn with_series(mut self, item: DataItem, mut obs: Vec<Observation>) -> Self {
        obs.sort_by_key(|o| o.date);
        self.series.insert(item, obs);
        self
    }

    pub fn observations(&self, item: &DataItem) -> &[Observation] {
        self.series.get(item).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Latest observation on or before `date`.
    pub fn value_on_or_before(&self, item: &DataItem, date: NaiveDate) -> Option<f64> {
        let obs = self.observations(item);
        let idx = obs.partition_point(|o| o.date <= date);
        idx.checked_sub(1).map(|i| obs[i].value)
    }

    /// Observation dated exactly `date`.
    pub fn value_on(&self, item: &DataItem, date: NaiveDate) -> Option<f64> {
        let obs = self.observations(item);
        obs.binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| obs[i].value)
    }

    /// Observations inside `[start, end]`.
    pub fn window(&self, item: &DataItem, start: NaiveDate, end: NaiveDate) -> &[Observation] {
        let obs = self.observations(item);
        let lo = obs.partition_point(|o| o.date < start);
        let hi = obs.partition_point(|o| o.date <= end);
        if lo >= hi {
            &[]
        } else {
            &obs[lo..hi]
        }
    }
}

/// Securities keyed by identifier; iteration is in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct SecurityStore {
    securities: BTreeMap<String, Security>,
}

impl SecurityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, security: Security) {
        self.securities.insert(security.id.clone(), security);
    }

    pub fn get(&self, id: &str) -> Option<&Security> {
        self.securities.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Security> {
        self.securities.values()
    }

    pub fn len(&self) -> usize {
        self.securities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.securities.is_empty()
    }
}

impl FromIterator<Security> for SecurityStore {
    fn from_iter<I: IntoIterator<Item = Security>>(iter: I) -> Self {
        let mut store = SecurityStore::new();
        for security in iter {
            store.insert(security);
        }
        store
    }
}
