//! Field expressions: an explicit tree of per-security computations.
//!
//! A field expression describes *what* to compute for each security; it never
//! computes anything itself. Two consumers walk the tree:
//! - [`serialize`] renders it as query text for the hosted service
//! - [`crate::engine`] evaluates it locally over a security store
//!
//! Construction goes through the named constructors and combinators below
//! (`Expr::item`, `.divided_by`, `.last()`, ...), so the shape of the tree is
//! always visible at the call site.

pub mod serialize;

use crate::offset::{DateOffset, DateRange};
use serde::{Deserialize, Serialize};

/// A data item the query service can look up for a security.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "item", content = "code", rename_all = "snake_case")]
pub enum DataItem {
    /// Last traded price.
    PxLast,
    /// Fund net asset value per share.
    FundNetAssetVal,
    /// Cash dividend amounts, one observation per ex-date.
    CashDivs,
    /// Trailing 12-month dividend yield.
    DividendYield,
    /// Latest regular cash dividend per share.
    RegularCashDividendPerShare,
    /// Traded volume.
    PxVolume,
    /// Current market capitalization in dollars.
    CurMktCap,
    /// Maximum drawdown statistic computed by the service.
    MaxDrawdown,
    /// Security display name.
    Name,
    /// Fund type classification, e.g. "Closed-End Fund".
    FundType,
    /// Fund geographic focus, e.g. "U.S." or a state name.
    FundGeoFocus,
    /// The security identifier itself.
    Id,
    /// Custom data element, by code (e.g. `UD_MAIN_GROUP`).
    Cde(String),
}

impl DataItem {
    /// Name of the item in query text.
    pub fn query_name(&self) -> &'static str {
        match self {
            DataItem::PxLast => "px_last",
            DataItem::FundNetAssetVal => "fund_net_asset_val",
            DataItem::CashDivs => "cash_divs",
            DataItem::DividendYield => "dividend_yield",
            DataItem::RegularCashDividendPerShare => "is_regular_cash_dividend_per_sh",
            DataItem::PxVolume => "px_volume",
            DataItem::CurMktCap => "cur_mkt_cap",
            DataItem::MaxDrawdown => "max_drawdown",
            DataItem::Name => "name",
            DataItem::FundType => "fund_typ",
            DataItem::FundGeoFocus => "fund_geo_focus",
            DataItem::Id => "id",
            DataItem::Cde(_) => "_cde",
        }
    }

    /// True for items backed by dated observations.
    pub fn is_time_series(&self) -> bool {
        matches!(
            self,
            DataItem::PxLast
                | DataItem::FundNetAssetVal
                | DataItem::CashDivs
                | DataItem::DividendYield
                | DataItem::RegularCashDividendPerShare
                | DataItem::PxVolume
        )
    }
}

/// Which dates a data item is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateSpec {
    /// A single point, relative to the as-of date.
    AsOf { offset: DateOffset },
    /// Every observation inside a window.
    Range { range: DateRange },
}

impl Default for DateSpec {
    fn default() -> Self {
        DateSpec::AsOf {
            offset: DateOffset::today(),
        }
    }
}

/// Missing-value fill policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Carry the most recent known value forward.
    Prev,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemParams {
    pub dates: DateSpec,
    pub fill: Option<Fill>,
}

impl ItemParams {
    pub fn is_default(&self) -> bool {
        self.dates == DateSpec::default() && self.fill.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => lhs / rhs,
        }
    }
}

/// Functions over a dated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesFn {
    /// Most recent value.
    Last,
    /// Drop missing observations.
    DropNa,
    /// Day-over-day differences.
    Diff,
    /// Standardize every point against the series mean and deviation.
    ZScore,
    /// Sample standard deviation.
    Std,
    /// Arithmetic mean.
    Avg,
}

impl SeriesFn {
    pub fn query_name(self) -> &'static str {
        match self {
            SeriesFn::Last => "last",
            SeriesFn::DropNa => "dropna",
            SeriesFn::Diff => "diff",
            SeriesFn::ZScore => "zscore",
            SeriesFn::Std => "std",
            SeriesFn::Avg => "avg",
        }
    }
}

/// A node of the field-expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    /// Data item lookup.
    Item { item: DataItem, params: ItemParams },
    /// Numeric literal.
    Const { value: f64 },
    /// Arithmetic on two sub-expressions.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Series function applied to a sub-expression.
    Apply { func: SeriesFn, input: Box<Expr> },
    /// Re-evaluate a point-in-time expression on every business day of a
    /// window, producing a series.
    Rolling { input: Box<Expr>, window: DateRange },
    /// Bucketed percentile rank of `input` among securities sharing `by`.
    Percentile {
        input: Box<Expr>,
        by: Box<Expr>,
        buckets: u32,
    },
    /// `input` values, ordered by `sort_by` within groups of `by`.
    GroupSort {
        input: Box<Expr>,
        sort_by: Box<Expr>,
        by: Box<Expr>,
    },
    /// Named binding; serialized once and referenced by name elsewhere.
    Let { name: String, expr: Box<Expr> },
    /// Number of securities per distinct value of `key`.
    GroupCount { key: Box<Expr> },
}

impl Expr {
    pub fn item(item: DataItem) -> Self {
        Expr::Item {
            item,
            params: ItemParams::default(),
        }
    }

    pub fn constant(value: f64) -> Self {
        Expr::Const { value }
    }

    pub fn cde(code: impl Into<String>) -> Self {
        Expr::item(DataItem::Cde(code.into()))
    }

    /// Request a data item at an offset from the as-of date.
    ///
    /// Only meaningful on `Item` nodes; other nodes are returned unchanged.
    pub fn at(self, offset: DateOffset) -> Self {
        self.with_params(|p| p.dates = DateSpec::AsOf { offset })
    }

    /// Request every observation of a data item inside a window.
    pub fn over(self, range: DateRange) -> Self {
        self.with_params(|p| p.dates = DateSpec::Range { range })
    }

    /// Carry the last known value forward when the current one is missing.
    pub fn fill_prev(self) -> Self {
        self.with_params(|p| p.fill = Some(Fill::Prev))
    }

    fn with_params(self, f: impl FnOnce(&mut ItemParams)) -> Self {
        match self {
            Expr::Item { item, mut params } => {
                f(&mut params);
                Expr::Item { item, params }
            }
            other => other,
        }
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn plus(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinOp::Add, self, rhs.into())
    }

    pub fn minus(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinOp::Sub, self, rhs.into())
    }

    pub fn times(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinOp::Mul, self, rhs.into())
    }

    pub fn divided_by(self, rhs: impl Into<Expr>) -> Self {
        Expr::binary(BinOp::Div, self, rhs.into())
    }

    pub fn apply(self, func: SeriesFn) -> Self {
        Expr::Apply {
            func,
            input: Box::new(self),
        }
    }

    pub fn last(self) -> Self {
        self.apply(SeriesFn::Last)
    }

    pub fn dropna(self) -> Self {
        self.apply(SeriesFn::DropNa)
    }

    pub fn diff(self) -> Self {
        self.apply(SeriesFn::Diff)
    }

    pub fn zscore(self) -> Self {
        self.apply(SeriesFn::ZScore)
    }

    pub fn std(self) -> Self {
        self.apply(SeriesFn::Std)
    }

    pub fn avg(self) -> Self {
        self.apply(SeriesFn::Avg)
    }

    pub fn rolling(self, window: DateRange) -> Self {
        Expr::Rolling {
            input: Box::new(self),
            window,
        }
    }

    pub fn percentile_within(self, by: Expr, buckets: u32) -> Self {
        Expr::Percentile {
            input: Box::new(self),
            by: Box::new(by),
            buckets,
        }
    }

    pub fn group_sorted(self, sort_by: Expr, by: Expr) -> Self {
        Expr::GroupSort {
            input: Box::new(self),
            sort_by: Box::new(sort_by),
            by: Box::new(by),
        }
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Expr::Let {
            name: name.into(),
            expr: Box::new(self),
        }
    }

    pub fn count_per(key: Expr) -> Self {
        Expr::GroupCount { key: Box::new(key) }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Item { .. } | Expr::Const { .. } => Vec::new(),
            Expr::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Expr::Apply { input, .. } | Expr::Rolling { input, .. } => vec![&**input],
            Expr::Percentile { input, by, .. } => vec![&**input, &**by],
            Expr::GroupSort {
                input, sort_by, by, ..
            } => vec![&**input, &**sort_by, &**by],
            Expr::Let { expr, .. } => vec![&**expr],
            Expr::GroupCount { key } => vec![&**key],
        }
    }

    /// True when evaluating this expression needs the whole universe at once.
    pub fn is_cross_sectional(&self) -> bool {
        matches!(
            self,
            Expr::Percentile { .. } | Expr::GroupSort { .. } | Expr::GroupCount { .. }
        ) || self.children().iter().any(|c| c.is_cross_sectional())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::constant(value)
    }
}

impl From<DataItem> for Expr {
    fn from(item: DataItem) -> Self {
        Expr::item(item)
    }
}
