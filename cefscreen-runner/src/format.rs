//! Presentation formatter.
//!
//! Maps each output column to a display rule (number format, color scale,
//! text color) and bundles the merged table with its rules into a
//! [`GridSpec`] that any renderer can paint. Colors are plain RGB so the
//! terminal shell and exports share the same scale logic.

use crate::merge::{ResultTable, TableColumn};
use crate::screen;
use cefscreen_core::frame::Cell;
use serde::Serialize;
use std::collections::BTreeMap;

/// Width of a column without an explicit entry.
pub const BASE_COLUMN_SIZE: u16 = 200;

// ─── Number formats ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumberFormat {
    /// `.2f`
    Fixed2,
    /// `$.2f`
    Dollar2,
    /// `.2%`
    Percent2,
}

impl NumberFormat {
    pub fn pattern(self) -> &'static str {
        match self {
            NumberFormat::Fixed2 => ".2f",
            NumberFormat::Dollar2 => "$.2f",
            NumberFormat::Percent2 => ".2%",
        }
    }

    pub fn format(self, value: f64) -> String {
        match self {
            NumberFormat::Fixed2 => format!("{value:.2}"),
            NumberFormat::Dollar2 if value < 0.0 => format!("-${:.2}", -value),
            NumberFormat::Dollar2 => format!("${value:.2}"),
            NumberFormat::Percent2 => format!("{:.2}%", value * 100.0),
        }
    }
}

// ─── Colors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

const RED: Rgb = Rgb(215, 48, 39);
const YELLOW: Rgb = Rgb(255, 255, 191);
const GREEN: Rgb = Rgb(26, 152, 80);
const PALE: Rgb = Rgb(247, 247, 247);
const WHITE: Rgb = Rgb(255, 255, 255);

/// Color scheme names follow the low → high end of the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scheme {
    RdYlGn,
    RdGn,
    GnRd,
    GnYlRd,
    /// One-sided: red for the low end fading to white.
    RdWt,
}

impl Scheme {
    fn stops(self) -> &'static [Rgb] {
        match self {
            Scheme::RdYlGn => &[RED, YELLOW, GREEN],
            Scheme::RdGn => &[RED, PALE, GREEN],
            Scheme::GnRd => &[GREEN, PALE, RED],
            Scheme::GnYlRd => &[GREEN, YELLOW, RED],
            Scheme::RdWt => &[RED, WHITE],
        }
    }

    /// Color at `position` in `[0, 1]`.
    pub fn color_at(self, position: f64) -> Rgb {
        let stops = self.stops();
        let p = position.clamp(0.0, 1.0) * (stops.len() - 1) as f64;
        let i = (p.floor() as usize).min(stops.len() - 2);
        stops[i].lerp(stops[i + 1], p - i as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextColor {
    Black,
    White,
    Default,
}

// ─── Scales ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScaleKind {
    /// Position proportional to the value.
    Linear,
    /// Position by rank among the column's values.
    Percentile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Midpoint {
    None,
    Zero,
    /// Middle element of the column, see [`find_middle`].
    Median,
}

/// The static half of a color scale; bounds come from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleRule {
    pub scheme: Scheme,
    pub mid: Midpoint,
    pub kind: ScaleKind,
}

/// A color scale fitted to one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub mid: Option<f64>,
    pub max: f64,
    pub scheme: Scheme,
    pub kind: ScaleKind,
    /// Sorted non-missing values, kept for rank lookups.
    samples: Vec<f64>,
}

/// Middle element of `values`, in the order given.
///
/// Odd count: the middle element. Even count: the mean of the two elements
/// around the middle. The input is not sorted, so on an unsorted column this
/// is the middle row rather than the median. Empty input or a NaN element at
/// the middle gives NaN.
pub fn find_middle(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2] + values[n / 2 - 1]) / 2.0
    }
}

/// Rank of `v` in sorted `set`, as a fraction in `[0, 1]`; ties share the
/// average rank.
fn rank_fraction(set: &[f64], v: f64) -> f64 {
    if set.len() < 2 {
        return 0.5;
    }
    let below = set.partition_point(|x| *x < v);
    let through = set.partition_point(|x| *x <= v);
    let rank = if through > below {
        (below + through - 1) as f64 / 2.0
    } else {
        below as f64 - 0.5
    };
    (rank / (set.len() - 1) as f64).clamp(0.0, 1.0)
}

fn linear_fraction(lo: f64, hi: f64, v: f64) -> f64 {
    if hi > lo {
        ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
    } else {
        0.5
    }
}

impl ColorScale {
    /// Fit `rule` to a column; `None` when the column has no values.
    pub fn fit(rule: ScaleRule, column: &TableColumn) -> Option<Self> {
        let values = column.values();
        let mut samples: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if samples.is_empty() {
            return None;
        }
        samples.sort_by(f64::total_cmp);
        let min = samples[0];
        let max = samples[samples.len() - 1];
        let mid = match rule.mid {
            Midpoint::None => None,
            Midpoint::Zero => Some(0.0),
            Midpoint::Median => Some(find_middle(&values)).filter(|m| m.is_finite()),
        };
        Some(Self {
            min,
            mid,
            max,
            scheme: rule.scheme,
            kind: rule.kind,
            samples,
        })
    }

    /// Position of `value` on the scale, `0..=1`, with the midpoint (when
    /// set) at exactly 0.5. `None` for non-finite values.
    pub fn position(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let pos = match (self.kind, self.mid) {
            (ScaleKind::Linear, None) => linear_fraction(self.min, self.max, value),
            (ScaleKind::Linear, Some(m)) => {
                if value <= m {
                    0.5 * linear_fraction(self.min.min(m), m, value)
                } else {
                    0.5 + 0.5 * linear_fraction(m, self.max.max(m), value)
                }
            }
            (ScaleKind::Percentile, None) => rank_fraction(&self.samples, value),
            (ScaleKind::Percentile, Some(m)) => {
                // The midpoint anchors the top of the lower half and the
                // bottom of the upper half.
                if value <= m {
                    let mut lower: Vec<f64> =
                        self.samples.iter().copied().filter(|x| *x <= m).collect();
                    lower.push(m);
                    0.5 * rank_fraction(&lower, value)
                } else {
                    let mut upper = vec![m];
                    upper.extend(self.samples.iter().copied().filter(|x| *x >= m));
                    0.5 + 0.5 * rank_fraction(&upper, value)
                }
            }
        };
        Some(pos)
    }

    pub fn color(&self, value: f64) -> Option<Rgb> {
        self.position(value).map(|p| self.scheme.color_at(p))
    }
}

// ─── Column rules ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRule {
    pub column: String,
    /// `None` renders the cell as plain text.
    pub format: Option<NumberFormat>,
    pub scale: Option<ScaleRule>,
    pub text: TextColor,
}

fn scaled(scheme: Scheme, mid: Midpoint, kind: ScaleKind) -> Option<ScaleRule> {
    Some(ScaleRule { scheme, mid, kind })
}

/// Display rule for a column, by name.
pub fn rule_for(column: &str) -> ColumnRule {
    use Midpoint as M;
    use NumberFormat::*;
    use ScaleKind::*;
    use Scheme::*;

    let (format, scale, text) = match column {
        screen::SCORE => (Some(Fixed2), scaled(RdYlGn, M::None, Linear), TextColor::Black),
        screen::PRICE => (Some(Dollar2), None, TextColor::White),
        screen::TRAILING_1Q_PERFORMANCE => {
            (Some(Percent2), scaled(RdGn, M::Zero, Percentile), TextColor::Black)
        }
        screen::DIV_INDICATED => {
            (Some(Fixed2), scaled(RdYlGn, M::Median, Linear), TextColor::Black)
        }
        screen::YIELD_12M => {
            (Some(Percent2), scaled(RdYlGn, M::Median, Percentile), TextColor::Black)
        }
        screen::DIV_GROWTH_3Y => {
            (Some(Percent2), scaled(RdGn, M::Zero, Percentile), TextColor::White)
        }
        screen::PREMIUM_DISCOUNT => {
            (Some(Percent2), scaled(GnRd, M::Zero, Percentile), TextColor::Black)
        }
        screen::ZSCORE_1Y | screen::ZSCORE_90D => {
            (Some(Fixed2), scaled(GnRd, M::Zero, Linear), TextColor::Black)
        }
        screen::NAV_STD_5Y => {
            (Some(Percent2), scaled(GnYlRd, M::Median, Percentile), TextColor::Black)
        }
        screen::MAX_DRAWDOWN => {
            (Some(Percent2), scaled(RdWt, M::None, Percentile), TextColor::Black)
        }
        screen::NAV_RETURN_5Y => {
            (Some(Percent2), scaled(RdGn, M::Zero, Percentile), TextColor::White)
        }
        screen::MARKET_CAP_MM => (Some(Dollar2), None, TextColor::Default),
        screen::TRADE_COST_400K => (Some(Percent2), None, TextColor::Default),
        _ => (None, None, TextColor::Default),
    };
    ColumnRule {
        column: column.to_string(),
        format,
        scale,
        text,
    }
}

/// Render one cell under `rule`. Missing cells render empty.
pub fn format_cell(cell: &Cell, rule: &ColumnRule) -> String {
    match (cell, rule.format) {
        (Cell::Missing, _) => String::new(),
        (Cell::Num(v), Some(fmt)) => fmt.format(*v),
        (other, _) => other.to_string(),
    }
}

/// Explicit column widths; everything else uses [`BASE_COLUMN_SIZE`].
pub fn column_widths() -> BTreeMap<String, u16> {
    [
        ("key", 100),
        ("name", 200),
        ("ud_main_group", 200),
        ("ud_sub_group", 200),
    ]
    .into_iter()
    .map(|(k, w)| (k.to_string(), w))
    .collect()
}

// ─── Grid ───────────────────────────────────────────────────────────

/// A renderable grid: the table, one rule and fitted scale per column, and
/// column widths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSpec {
    pub table: ResultTable,
    pub rules: Vec<ColumnRule>,
    pub scales: Vec<Option<ColorScale>>,
    pub widths: BTreeMap<String, u16>,
    pub base_column_size: u16,
}

impl GridSpec {
    pub fn build(table: ResultTable) -> Self {
        let rules: Vec<ColumnRule> = table.columns.iter().map(|c| rule_for(&c.name)).collect();
        let scales = rules
            .iter()
            .zip(&table.columns)
            .map(|(rule, col)| rule.scale.and_then(|s| ColorScale::fit(s, col)))
            .collect();
        tracing::debug!(
            rows = table.row_count(),
            columns = table.column_count(),
            "built grid"
        );
        Self {
            table,
            rules,
            scales,
            widths: column_widths(),
            base_column_size: BASE_COLUMN_SIZE,
        }
    }

    pub fn column_width(&self, column: &str) -> u16 {
        self.widths
            .get(column)
            .copied()
            .unwrap_or(self.base_column_size)
    }

    pub fn cell_text(&self, row: usize, col: usize) -> String {
        format_cell(&self.table.columns[col].cells[row], &self.rules[col])
    }

    /// Background color of a cell, if its column is color-scaled.
    pub fn cell_background(&self, row: usize, col: usize) -> Option<Rgb> {
        let value = self.table.columns[col].cells[row].as_f64()?;
        self.scales[col].as_ref()?.color(value)
    }

    pub fn text_color(&self, col: usize) -> TextColor {
        self.rules[col].text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<f64>]) -> TableColumn {
        TableColumn {
            name: "x".into(),
            cells: values
                .iter()
                .map(|v| v.map(Cell::Num).unwrap_or(Cell::Missing))
                .collect(),
        }
    }

    #[test]
    fn find_middle_odd_and_even() {
        assert_eq!(find_middle(&[1.0, 3.0, 5.0]), 3.0);
        assert_eq!(find_middle(&[1.0, 2.0, 3.0, 4.0]), 2.5);
        assert_eq!(find_middle(&[7.0, 1.0]), 4.0);
        assert!(find_middle(&[]).is_nan());
    }

    #[test]
    fn find_middle_does_not_sort() {
        // The median would be 3; the middle row is 9.
        assert_eq!(find_middle(&[1.0, 9.0, 3.0]), 9.0);
        assert!(find_middle(&[1.0, f64::NAN, 3.0]).is_nan());
    }

    #[test]
    fn number_formats() {
        assert_eq!(NumberFormat::Fixed2.format(1.005_1), "1.01");
        assert_eq!(NumberFormat::Dollar2.format(12.5), "$12.50");
        assert_eq!(NumberFormat::Dollar2.format(-3.0), "-$3.00");
        assert_eq!(NumberFormat::Percent2.format(-0.0525), "-5.25%");
    }

    #[test]
    fn linear_scale_with_midpoint() {
        let rule = ScaleRule {
            scheme: Scheme::GnRd,
            mid: Midpoint::Zero,
            kind: ScaleKind::Linear,
        };
        let scale = ColorScale::fit(rule, &column(&[Some(-2.0), Some(1.0), Some(4.0)])).unwrap();
        assert_eq!(scale.position(-2.0), Some(0.0));
        assert_eq!(scale.position(0.0), Some(0.5));
        assert_eq!(scale.position(4.0), Some(1.0));
        assert_eq!(scale.position(2.0), Some(0.75));
        assert_eq!(scale.position(f64::NAN), None);
    }

    #[test]
    fn percentile_scale_ranks() {
        let rule = ScaleRule {
            scheme: Scheme::RdWt,
            mid: Midpoint::None,
            kind: ScaleKind::Percentile,
        };
        let scale =
            ColorScale::fit(rule, &column(&[Some(-0.5), Some(-0.1), None, Some(-0.3)])).unwrap();
        assert_eq!((scale.min, scale.max), (-0.5, -0.1));
        assert_eq!(scale.position(-0.5), Some(0.0));
        assert_eq!(scale.position(-0.3), Some(0.5));
        assert_eq!(scale.position(-0.1), Some(1.0));
        assert_eq!(scale.color(-0.5), Some(RED));
    }

    #[test]
    fn median_midpoint_follows_row_order() {
        let rule = ScaleRule {
            scheme: Scheme::RdYlGn,
            mid: Midpoint::Median,
            kind: ScaleKind::Linear,
        };
        let scale = ColorScale::fit(rule, &column(&[Some(1.0), Some(9.0), Some(3.0)])).unwrap();
        assert_eq!(scale.mid, Some(9.0));

        // A missing middle cell leaves the scale without a midpoint.
        let scale = ColorScale::fit(rule, &column(&[Some(1.0), None, Some(3.0)])).unwrap();
        assert_eq!(scale.mid, None);
    }

    #[test]
    fn empty_column_has_no_scale() {
        let rule = rule_for(screen::SCORE).scale.unwrap();
        assert!(ColorScale::fit(rule, &column(&[None, None])).is_none());
    }

    #[test]
    fn rules_match_columns() {
        assert_eq!(rule_for(screen::PRICE).text, TextColor::White);
        assert_eq!(rule_for(screen::PRICE).scale, None);
        assert_eq!(
            rule_for(screen::MAX_DRAWDOWN).scale.map(|s| s.scheme),
            Some(Scheme::RdWt)
        );
        assert_eq!(rule_for(screen::NAME).format, None);
        for name in screen::FIELD_NAMES {
            assert_eq!(rule_for(name).column, name);
        }
    }

    #[test]
    fn scheme_endpoints() {
        assert_eq!(Scheme::RdYlGn.color_at(0.0), RED);
        assert_eq!(Scheme::RdYlGn.color_at(0.5), YELLOW);
        assert_eq!(Scheme::RdYlGn.color_at(1.0), GREEN);
        assert_eq!(Scheme::GnRd.color_at(0.0), GREEN);
    }

    #[test]
    fn grid_formats_and_colors_cells() {
        let table = ResultTable {
            index: vec!["AAA".into(), "BBB".into()],
            columns: vec![
                TableColumn {
                    name: screen::SCORE.into(),
                    cells: vec![Cell::Num(150.0), Cell::Num(50.0)],
                },
                TableColumn {
                    name: screen::NAME.into(),
                    cells: vec![Cell::Text("Alpha".into()), Cell::Missing],
                },
            ],
        };
        let grid = GridSpec::build(table);
        assert_eq!(grid.cell_text(0, 0), "150.00");
        assert_eq!(grid.cell_text(1, 1), "");
        assert_eq!(grid.cell_background(0, 0), Some(GREEN));
        assert_eq!(grid.cell_background(1, 0), Some(RED));
        assert_eq!(grid.cell_background(0, 1), None);
        assert_eq!(grid.column_width("name"), 200);
        assert_eq!(grid.column_width("key"), 100);
        assert_eq!(grid.column_width(screen::SCORE), BASE_COLUMN_SIZE);
    }
}
