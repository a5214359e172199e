//! Screen query builder.
//!
//! Turns an explicit [`ScreenParams`] (selected main group, minimum market cap)
//! into a [`Request`]: the filtered fund universe plus the ordered output
//! fields. Nothing here touches a client; the request is plain data.

use cefscreen_core::expr::{DataItem, Expr};
use cefscreen_core::offset::{DateOffset, DateRange};
use cefscreen_core::predicate::{Predicate, Universe};
use cefscreen_core::request::{ExecOptions, NamedField, Request};
use cefscreen_core::states::STATES;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const SUB_GROUP: &str = "CDE sub group";
pub const SCORE: &str = "score";
pub const PRICE: &str = "price";
pub const TRAILING_1Q_PERFORMANCE: &str = "trailing 1q performance";
pub const DIV_INDICATED: &str = "div indicated";
pub const YIELD_12M: &str = "12-month yield";
pub const DIV_GROWTH_3Y: &str = "3-year dividend growth";
pub const PREMIUM_DISCOUNT: &str = "current premium/ discount";
pub const ZSCORE_1Y: &str = "1-year Zscore NAV premium";
pub const ZSCORE_90D: &str = "90-day Zscore";
pub const NAV_STD_5Y: &str = "5-year NAV std";
pub const MAX_DRAWDOWN: &str = "max drawdown";
pub const NAV_RETURN_5Y: &str = "5-year NAV return";
pub const MARKET_CAP_MM: &str = "current market cap (millions)";
pub const TRADE_COST_400K: &str = "assuming 400k trade";

/// Output columns, in request order.
pub const FIELD_NAMES: [&str; 16] = [
    NAME,
    SUB_GROUP,
    SCORE,
    PRICE,
    TRAILING_1Q_PERFORMANCE,
    DIV_INDICATED,
    YIELD_12M,
    DIV_GROWTH_3Y,
    PREMIUM_DISCOUNT,
    ZSCORE_1Y,
    ZSCORE_90D,
    NAV_STD_5Y,
    MAX_DRAWDOWN,
    NAV_RETURN_5Y,
    MARKET_CAP_MM,
    TRADE_COST_400K,
];

pub const DEFAULT_MAIN_GROUP_FIELD: &str = "UD_MAIN_GROUP";
pub const DEFAULT_SUB_GROUP_FIELD: &str = "UD_SUB_GROUP";

const CLOSED_END_FUND: &str = "Closed-End Fund";
const US_FOCUS: &str = "U.S.";
const PERCENTILE_BUCKETS: u32 = 100;
const TRADE_NOTIONAL: f64 = 400_000.0;

/// Parameters of one screen, read from the UI on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenParams {
    pub main_group: String,
    /// Minimum market cap in millions of dollars.
    pub min_market_cap_mm: u64,
    /// Evaluation date; `None` means the service's current date.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl ScreenParams {
    pub fn new(main_group: impl Into<String>, min_market_cap_mm: u64) -> Self {
        Self {
            main_group: main_group.into(),
            min_market_cap_mm,
            as_of: None,
        }
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Threshold in dollars.
    pub fn min_market_cap(&self) -> f64 {
        self.min_market_cap_mm as f64 * 1_000_000.0
    }
}

/// Builds screen and group-discovery requests.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    pub main_group_field: String,
    pub sub_group_field: String,
    pub options: ExecOptions,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            main_group_field: DEFAULT_MAIN_GROUP_FIELD.into(),
            sub_group_field: DEFAULT_SUB_GROUP_FIELD.into(),
            options: ExecOptions::default(),
        }
    }
}

fn px_last() -> Expr {
    Expr::item(DataItem::PxLast)
}

fn fund_nav() -> Expr {
    Expr::item(DataItem::FundNetAssetVal)
}

/// Price over NAV, minus one.
pub fn nav_premium() -> Expr {
    px_last().divided_by(fund_nav()).minus(1.0)
}

/// Last dividend of the trailing three years, annualized, over price.
pub fn div_indicated() -> Expr {
    Expr::item(DataItem::CashDivs)
        .over(DateRange::trailing(DateOffset::years(-3)))
        .dropna()
        .last()
        .times(12.0)
        .divided_by(px_last())
}

/// Latest value of the premium z-score over a trailing window.
fn premium_zscore(window: DateOffset) -> Expr {
    nav_premium()
        .rolling(DateRange::trailing(window))
        .dropna()
        .zscore()
        .last()
}

impl QueryBuilder {
    pub fn new(main_group_field: impl Into<String>, sub_group_field: impl Into<String>) -> Self {
        Self {
            main_group_field: main_group_field.into(),
            sub_group_field: sub_group_field.into(),
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    fn main_group(&self) -> Expr {
        Expr::cde(self.main_group_field.as_str())
    }

    fn sub_group(&self) -> Expr {
        Expr::cde(self.sub_group_field.as_str())
    }

    /// U.S. closed-end funds (or state-focused funds) in the selected main
    /// group with at least the minimum market cap.
    pub fn universe(&self, params: &ScreenParams) -> Universe {
        let us_closed_end = Predicate::equals(Expr::item(DataItem::FundType), CLOSED_END_FUND)
            .and(Predicate::equals(Expr::item(DataItem::FundGeoFocus), US_FOCUS));
        let state_focus =
            Predicate::is_in(Expr::item(DataItem::FundGeoFocus), STATES.iter().copied());

        let filter = us_closed_end
            .or(state_focus)
            .and(Predicate::at_least(
                Expr::item(DataItem::CurMktCap),
                params.min_market_cap(),
            ))
            .and(Predicate::equals(self.main_group(), params.main_group.as_str()));

        Universe::active_primary_funds().filtered(filter)
    }

    /// The output fields, in display order.
    pub fn fields(&self) -> Vec<NamedField> {
        let pct_div = div_indicated()
            .percentile_within(self.sub_group(), PERCENTILE_BUCKETS)
            .named("percentile_divindicated");
        let pct_premium = nav_premium()
            .percentile_within(self.sub_group(), PERCENTILE_BUCKETS)
            .named("percentile_navpremium");
        let score = pct_div
            .plus(Expr::constant(100.0).minus(pct_premium))
            .named("score");

        let five_years = DateRange::trailing(DateOffset::years(-5));
        let avg_volume = Expr::item(DataItem::PxVolume)
            .over(DateRange::trailing(DateOffset::months(-6)))
            .avg();

        vec![
            NamedField::new(
                NAME,
                Expr::item(DataItem::Name).group_sorted(score.clone(), self.sub_group()),
            ),
            NamedField::new(SUB_GROUP, self.sub_group()),
            NamedField::new(SCORE, score),
            NamedField::new(PRICE, px_last()),
            NamedField::new(
                TRAILING_1Q_PERFORMANCE,
                px_last()
                    .divided_by(px_last().at(DateOffset::months(-3)))
                    .minus(1.0),
            ),
            NamedField::new(DIV_INDICATED, div_indicated()),
            NamedField::new(YIELD_12M, Expr::item(DataItem::DividendYield).fill_prev()),
            NamedField::new(
                DIV_GROWTH_3Y,
                Expr::item(DataItem::RegularCashDividendPerShare)
                    .divided_by(Expr::item(DataItem::CashDivs).at(DateOffset::years(-3)))
                    .minus(1.0),
            ),
            NamedField::new(PREMIUM_DISCOUNT, nav_premium()),
            NamedField::new(ZSCORE_1Y, premium_zscore(DateOffset::years(-1))),
            NamedField::new(ZSCORE_90D, premium_zscore(DateOffset::days(-90))),
            NamedField::new(
                NAV_STD_5Y,
                fund_nav().over(five_years).diff().std().divided_by(100.0),
            ),
            NamedField::new(MAX_DRAWDOWN, Expr::item(DataItem::MaxDrawdown)),
            NamedField::new(
                NAV_RETURN_5Y,
                fund_nav()
                    .divided_by(fund_nav().at(DateOffset::years(-5)))
                    .minus(1.0),
            ),
            NamedField::new(
                MARKET_CAP_MM,
                Expr::item(DataItem::CurMktCap).divided_by(1_000_000.0),
            ),
            NamedField::new(
                TRADE_COST_400K,
                Expr::constant(TRADE_NOTIONAL).divided_by(avg_volume.times(px_last())),
            ),
        ]
    }

    /// The full screen request for `params`.
    pub fn request(&self, params: &ScreenParams) -> Request {
        let request = Request::new(self.universe(params), self.fields())
            .with_options(self.options)
            .with_as_of(params.as_of);
        tracing::debug!(
            main_group = %params.main_group,
            min_market_cap_mm = params.min_market_cap_mm,
            fingerprint = %request.fingerprint(),
            "built screen request"
        );
        request
    }

    /// Count of funds per main-group value, over funds that carry one.
    pub fn group_discovery(&self) -> Request {
        let universe =
            Universe::active_primary_funds().filtered(Predicate::not_missing(self.main_group()));
        Request::new(
            universe,
            vec![NamedField::new(
                self.main_group_field.as_str(),
                Expr::count_per(self.main_group().fill_prev()),
            )],
        )
        .with_options(self.options)
    }
}
