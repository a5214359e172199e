//! Vectorized evaluation of expression trees over a fixed set of securities.
//!
//! Every node evaluates to one [`Value`] per security, in the order of the
//! security slice. Cross-sectional nodes (percentile ranks) therefore see the
//! whole universe at once.

use super::store::{Observation, Security};
use crate::client::ClientError;
use crate::expr::{BinOp, DataItem, DateSpec, Expr, Fill, SeriesFn};
use crate::predicate::{Literal, Predicate};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

/// Intermediate value of a node for one security.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Text(String),
    /// Dated series; may contain NaN points until `dropna`.
    Series(Vec<Observation>),
    Missing,
}

impl Value {
    fn num(v: f64) -> Self {
        if v.is_finite() {
            Value::Num(v)
        } else {
            Value::Missing
        }
    }

    fn from_opt(v: Option<f64>) -> Self {
        v.map(Value::num).unwrap_or(Value::Missing)
    }

    fn text(t: Option<&String>) -> Self {
        t.map(|s| Value::Text(s.clone())).unwrap_or(Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Grouping key for cross-sectional nodes.
    fn group_key(&self) -> Option<String> {
        match self {
            Value::Text(t) => Some(t.clone()),
            Value::Num(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

fn eval_error(msg: impl Into<String>) -> ClientError {
    ClientError::Evaluation(msg.into())
}

fn finite(obs: &[Observation]) -> Vec<f64> {
    obs.iter().map(|o| o.value).filter(|v| v.is_finite()).collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Deviations below this share of the mean's magnitude count as zero.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Sample standard deviation (n − 1).
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Bucketed percentile rank of `values` within one peer group.
///
/// `values` are `(slot, value)` pairs in universe order; ties keep that order.
/// Returns `(slot, bucket)` with buckets in `1..=buckets`.
pub fn percentile_buckets(values: &[(usize, f64)], buckets: u32) -> Vec<(usize, u32)> {
    let mut ranked = values.to_vec();
    // Stable sort: equal values keep universe order.
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    let n = ranked.len() as u64;
    ranked
        .iter()
        .enumerate()
        .map(|(rank, (slot, _))| {
            let bucket = (rank as u64 * buckets as u64) / n + 1;
            (*slot, bucket as u32)
        })
        .collect()
}

type Memo = RefCell<HashMap<(String, NaiveDate), Vec<Value>>>;

pub struct Evaluator<'a> {
    secs: &'a [&'a Security],
    fill: Option<Fill>,
    memo: Memo,
}

impl<'a> Evaluator<'a> {
    pub fn new(secs: &'a [&'a Security], fill: Option<Fill>) -> Self {
        Self {
            secs,
            fill,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn securities(&self) -> &'a [&'a Security] {
        self.secs
    }

    pub fn eval(&self, expr: &Expr, as_of: NaiveDate) -> Result<Vec<Value>, ClientError> {
        match expr {
            Expr::Item { item, params } => Ok(self
                .secs
                .iter()
                .map(|sec| self.lookup(sec, item, params.dates, params.fill, as_of))
                .collect()),

            Expr::Const { value } => Ok(vec![Value::num(*value); self.secs.len()]),

            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, as_of)?;
                let r = self.eval(rhs, as_of)?;
                l.into_iter()
                    .zip(r)
                    .map(|(a, b)| combine(*op, a, b))
                    .collect()
            }

            Expr::Apply { func, input } => self
                .eval(input, as_of)?
                .into_iter()
                .map(|v| apply(*func, v))
                .collect(),

            Expr::Rolling { input, window } => {
                let mut out: Vec<Vec<Observation>> = vec![Vec::new(); self.secs.len()];
                for day in window.business_days(as_of) {
                    let values = self.eval(input, day)?;
                    for (series, value) in out.iter_mut().zip(values) {
                        let v = value.as_f64().unwrap_or(f64::NAN);
                        series.push(Observation::new(day, v));
                    }
                }
                Ok(out.into_iter().map(Value::Series).collect())
            }

            Expr::Percentile { input, by, buckets } => {
                if *buckets == 0 {
                    return Err(eval_error("percentile needs at least one bucket"));
                }
                let values = self.eval(input, as_of)?;
                let keys = self.eval(by, as_of)?;
                let mut groups: BTreeMap<String, Vec<(usize, f64)>> = BTreeMap::new();
                for (slot, (value, key)) in values.iter().zip(&keys).enumerate() {
                    if let (Some(v), Some(k)) = (value.as_f64(), key.group_key()) {
                        groups.entry(k).or_default().push((slot, v));
                    }
                }
                let mut out = vec![Value::Missing; self.secs.len()];
                for members in groups.values() {
                    for (slot, bucket) in percentile_buckets(members, *buckets) {
                        out[slot] = Value::Num(bucket as f64);
                    }
                }
                Ok(out)
            }

            // Ordering is applied when the result frame is built.
            Expr::GroupSort { input, .. } => self.eval(input, as_of),

            Expr::Let { name, expr } => {
                let key = (name.clone(), as_of);
                if let Some(hit) = self.memo.borrow().get(&key) {
                    return Ok(hit.clone());
                }
                let values = self.eval(expr, as_of)?;
                self.memo.borrow_mut().insert(key, values.clone());
                Ok(values)
            }

            Expr::GroupCount { .. } => Err(eval_error(
                "group count can only be requested as a top-level field",
            )),
        }
    }

    fn lookup(
        &self,
        sec: &Security,
        item: &DataItem,
        dates: DateSpec,
        fill: Option<Fill>,
        as_of: NaiveDate,
    ) -> Value {
        match item {
            DataItem::CurMktCap => Value::from_opt(sec.market_cap),
            DataItem::MaxDrawdown => Value::from_opt(sec.max_drawdown),
            DataItem::Name => Value::Text(sec.name.clone()),
            DataItem::Id => Value::Text(sec.id.clone()),
            DataItem::FundType => Value::text(sec.fund_type.as_ref()),
            DataItem::FundGeoFocus => Value::text(sec.geo_focus.as_ref()),
            DataItem::Cde(code) => Value::text(sec.cde.get(code)),
            series_item => match dates {
                DateSpec::AsOf { offset } => {
                    let target = offset.apply(as_of);
                    match fill.or(self.fill) {
                        Some(Fill::Prev) => {
                            Value::from_opt(sec.value_on_or_before(series_item, target))
                        }
                        None => Value::from_opt(sec.value_on(series_item, target)),
                    }
                }
                DateSpec::Range { range } => {
                    let (start, end) = range.resolve(as_of);
                    Value::Series(sec.window(series_item, start, end).to_vec())
                }
            },
        }
    }

    /// Evaluate a predicate; missing attributes compare false.
    pub fn test(&self, pred: &Predicate, as_of: NaiveDate) -> Result<Vec<bool>, ClientError> {
        match pred {
            Predicate::Compare { lhs, op, rhs } => self
                .eval(lhs, as_of)?
                .into_iter()
                .map(|value| match (&value, rhs) {
                    (Value::Missing, _) => Ok(false),
                    (Value::Num(a), Literal::Num(b)) => Ok(op.holds(a, b)),
                    (Value::Text(a), Literal::Text(b)) => Ok(op.holds(a.as_str(), b.as_str())),
                    (other, lit) => Err(eval_error(format!(
                        "cannot compare {other:?} with {lit}"
                    ))),
                })
                .collect(),

            Predicate::In { lhs, values } => Ok(self
                .eval(lhs, as_of)?
                .into_iter()
                .map(|value| match value {
                    Value::Text(t) => values.contains(&t),
                    Value::Num(v) => values.contains(&v.to_string()),
                    _ => false,
                })
                .collect()),

            Predicate::NotMissing { expr } => Ok(self
                .eval(expr, as_of)?
                .into_iter()
                .map(|v| v != Value::Missing)
                .collect()),

            Predicate::And { all } => {
                let mut acc = vec![true; self.secs.len()];
                for p in all {
                    for (a, b) in acc.iter_mut().zip(self.test(p, as_of)?) {
                        *a = *a && b;
                    }
                }
                Ok(acc)
            }

            Predicate::Or { any } => {
                let mut acc = vec![false; self.secs.len()];
                for p in any {
                    for (a, b) in acc.iter_mut().zip(self.test(p, as_of)?) {
                        *a = *a || b;
                    }
                }
                Ok(acc)
            }
        }
    }
}

fn combine(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ClientError> {
    match (lhs, rhs) {
        (Value::Text(_), _) | (_, Value::Text(_)) => {
            Err(eval_error(format!("arithmetic '{}' on text", op.symbol())))
        }
        (Value::Missing, _) | (_, Value::Missing) => Ok(Value::Missing),
        (Value::Num(a), Value::Num(b)) => Ok(Value::num(op.apply(a, b))),
        (Value::Series(s), Value::Num(b)) => Ok(Value::Series(
            s.into_iter()
                .map(|o| Observation::new(o.date, op.apply(o.value, b)))
                .collect(),
        )),
        (Value::Num(a), Value::Series(s)) => Ok(Value::Series(
            s.into_iter()
                .map(|o| Observation::new(o.date, op.apply(a, o.value)))
                .collect(),
        )),
        (Value::Series(l), Value::Series(r)) => {
            let right: HashMap<NaiveDate, f64> = r.iter().map(|o| (o.date, o.value)).collect();
            Ok(Value::Series(
                l.into_iter()
                    .filter_map(|o| {
                        right
                            .get(&o.date)
                            .map(|v| Observation::new(o.date, op.apply(o.value, *v)))
                    })
                    .collect(),
            ))
        }
    }
}

fn apply(func: SeriesFn, value: Value) -> Result<Value, ClientError> {
    if let Value::Text(_) = value {
        return match func {
            SeriesFn::Last | SeriesFn::DropNa => Ok(value),
            _ => Err(eval_error(format!("{} on text", func.query_name()))),
        };
    }
    let series = match value {
        Value::Series(s) => s,
        Value::Num(v) => {
            return Ok(match func {
                SeriesFn::Last | SeriesFn::DropNa | SeriesFn::Avg => Value::Num(v),
                SeriesFn::Diff | SeriesFn::ZScore | SeriesFn::Std => Value::Missing,
            })
        }
        _ => return Ok(Value::Missing),
    };

    Ok(match func {
        SeriesFn::Last => Value::from_opt(series.last().map(|o| o.value)),
        SeriesFn::DropNa => {
            Value::Series(series.into_iter().filter(|o| o.value.is_finite()).collect())
        }
        SeriesFn::Diff => Value::Series(
            series
                .windows(2)
                .map(|w| Observation::new(w[1].date, w[1].value - w[0].value))
                .collect(),
        ),
        SeriesFn::ZScore => {
            let values = finite(&series);
            match (mean(&values), sample_std(&values)) {
                (Some(m), Some(sd)) if sd > FLAT_TOLERANCE * m.abs().max(1.0) => Value::Series(
                    series
                        .into_iter()
                        .map(|o| Observation::new(o.date, (o.value - m) / sd))
                        .collect(),
                ),
                _ => Value::Missing,
            }
        }
        SeriesFn::Std => Value::from_opt(sample_std(&finite(&series))),
        SeriesFn::Avg => Value::from_opt(mean(&finite(&series))),
    })
}
