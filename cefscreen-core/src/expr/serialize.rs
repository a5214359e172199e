//! Query-text rendering for expression trees.
//!
//! Named bindings (`Expr::Let`) render as `#name` references; their bodies are
//! hoisted by [`bindings`] into the request's `let(...)` block, dependencies
//! first, each exactly once.

use super::{DataItem, DateSpec, Expr, Fill, ItemParams};
use std::collections::HashSet;
use std::fmt;

/// A hoisted named binding: `#name=body;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub body: String,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}={};", self.name, self.body)
    }
}

/// Quote a text literal for query text.
pub fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Render a numeric literal without a trailing `.0` for whole numbers.
pub fn number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &ItemParams, leading: bool) -> fmt::Result {
    let mut parts = Vec::new();
    match params.dates {
        DateSpec::AsOf { offset } if offset.amount == 0 => {}
        DateSpec::AsOf { offset } => parts.push(format!("dates={offset}")),
        DateSpec::Range { range } => parts.push(format!("dates={range}")),
    }
    if let Some(Fill::Prev) = params.fill {
        parts.push("fill=prev".to_string());
    }
    if parts.is_empty() {
        return Ok(());
    }
    if leading {
        write!(f, ", ")?;
    }
    write!(f, "{}", parts.join(", "))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Item { item, params } => {
                write!(f, "{}(", item.query_name())?;
                if let DataItem::Cde(code) = item {
                    write!(f, "{}", quote(code))?;
                    write_params(f, params, true)?;
                } else {
                    write_params(f, params, false)?;
                }
                write!(f, ")")
            }
            Expr::Const { value } => write!(f, "{}", number(*value)),
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs}{}{rhs})", op.symbol()),
            Expr::Apply { func, input } => write!(f, "{}({input})", func.query_name()),
            Expr::Rolling { input, window } => {
                write!(f, "rolling({input}, iterationdates={window})")
            }
            Expr::Percentile { input, by, buckets } => {
                write!(f, "ungroup(cut(group({input}, {by}), {buckets}))")
            }
            Expr::GroupSort { input, sort_by, by } => {
                write!(f, "groupsort({input}, sortby={sort_by}, by={by})")
            }
            Expr::Let { name, .. } => write!(f, "#{name}"),
            Expr::GroupCount { key } => write!(f, "count(group(id(), {key}))"),
        }
    }
}

/// Collect the named bindings used by `exprs`, dependencies before
/// dependents, first definition wins.
pub fn bindings<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> Vec<Binding> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for expr in exprs {
        collect(expr, &mut seen, &mut out);
    }
    out
}

fn collect(expr: &Expr, seen: &mut HashSet<String>, out: &mut Vec<Binding>) {
    for child in expr.children() {
        collect(child, seen, out);
    }
    if let Expr::Let { name, expr: body } = expr {
        if seen.insert(name.clone()) {
            out.push(Binding {
                name: name.clone(),
                body: body.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offset::{DateOffset, DateRange};

    #[test]
    fn renders_item_params() {
        let e = Expr::item(DataItem::PxLast).at(DateOffset::months(-3));
        assert_eq!(e.to_string(), "px_last(dates=-3m)");

        let e = Expr::item(DataItem::CashDivs).over(DateRange::trailing(DateOffset::years(-3)));
        assert_eq!(e.to_string(), "cash_divs(dates=range(-3y,0d))");

        let e = Expr::cde("UD_MAIN_GROUP").fill_prev();
        assert_eq!(e.to_string(), "_cde('UD_MAIN_GROUP', fill=prev)");

        assert_eq!(
            Expr::item(DataItem::DividendYield).fill_prev().to_string(),
            "dividend_yield(fill=prev)"
        );
    }

    #[test]
    fn renders_arithmetic_and_functions() {
        let premium = Expr::item(DataItem::PxLast)
            .divided_by(Expr::item(DataItem::FundNetAssetVal))
            .minus(1.0);
        assert_eq!(premium.to_string(), "((px_last()/fund_net_asset_val())-1)");

        let z = premium
            .rolling(DateRange::trailing(DateOffset::days(-90)))
            .dropna()
            .zscore()
            .last();
        assert_eq!(
            z.to_string(),
            concat!(
                "last(zscore(dropna(rolling(((px_last()/fund_net_asset_val())-1), ",
                "iterationdates=range(-90d,0d)))))"
            )
        );
    }

    #[test]
    fn bindings_are_hoisted_once_in_dependency_order() {
        let a = Expr::item(DataItem::PxLast).named("a");
        let b = a.clone().plus(1.0).named("b");
        let fields = [b.clone(), a.clone().times(b)];
        let lets = bindings(fields.iter());
        let names: Vec<&str> = lets.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(lets[1].body, "(#a+1)");
        assert_eq!(lets[0].to_string(), "#a=px_last();");
    }

    #[test]
    fn quote_escapes() {
        assert_eq!(quote("O'Brien"), "'O\\'Brien'");
    }
}
