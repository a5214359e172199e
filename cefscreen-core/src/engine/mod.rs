//! In-process query engine.
//!
//! `LocalEngine` evaluates a [`Request`] against a [`SecurityStore`] with the
//! same semantics the hosted service applies, so the screener runs offline
//! (demo mode) and end-to-end tests need no network.

pub mod eval;
pub mod store;
pub mod synthetic;

use crate::client::{ClientError, QueryClient};
use crate::expr::Expr;
use crate::frame::{Cell, FieldFrame};
use crate::predicate::{FundStatus, Universe};
use crate::request::Request;
use chrono::{Local, NaiveDate};
use eval::{Evaluator, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub use store::{Observation, Security, SecurityStore};
pub use synthetic::synthetic_universe;

pub struct LocalEngine {
    store: SecurityStore,
    as_of: Option<NaiveDate>,
}

impl LocalEngine {
    pub fn new(store: SecurityStore) -> Self {
        Self { store, as_of: None }
    }

    /// Pin the default as-of date; requests carrying their own date win.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn store(&self) -> &SecurityStore {
        &self.store
    }

    pub fn resolve_as_of(&self, request: &Request) -> NaiveDate {
        request
            .as_of
            .or(self.as_of)
            .unwrap_or_else(|| Local::now().date_naive())
    }

    /// Securities in `universe`, ascending by id.
    pub fn select(
        &self,
        universe: &Universe,
        request: &Request,
        as_of: NaiveDate,
    ) -> Result<Vec<&Security>, ClientError> {
        let base: Vec<&Security> = self
            .store
            .iter()
            .filter(|sec| {
                universe.statuses.iter().all(|status| match status {
                    FundStatus::Active => sec.active,
                    FundStatus::Primary => sec.primary,
                })
            })
            .collect();

        let Some(filter) = &universe.filter else {
            return Ok(base);
        };
        let keep = Evaluator::new(&base, request.options.fill).test(filter, as_of)?;
        Ok(base
            .into_iter()
            .zip(keep)
            .filter_map(|(sec, k)| k.then_some(sec))
            .collect())
    }
}

fn to_cell(value: Value) -> Cell {
    match value {
        Value::Num(v) => Cell::num(v),
        Value::Text(t) => Cell::Text(t),
        // A bare series is not a per-security scalar.
        Value::Series(_) | Value::Missing => Cell::Missing,
    }
}

/// Strip named bindings to find the node that shapes the frame.
fn shaping_node(expr: &Expr) -> &Expr {
    match expr {
        Expr::Let { expr, .. } => shaping_node(expr),
        other => other,
    }
}

fn group_count_frame(
    name: &str,
    evaluator: &Evaluator<'_>,
    key: &Expr,
    as_of: NaiveDate,
) -> Result<FieldFrame, ClientError> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in evaluator.eval(key, as_of)? {
        match value {
            Value::Text(t) => *counts.entry(t).or_default() += 1,
            Value::Num(v) => *counts.entry(v.to_string()).or_default() += 1,
            _ => {}
        }
    }
    let mut frame = FieldFrame::new(name);
    for (group, n) in counts {
        frame.push(group, Cell::Num(n as f64));
    }
    Ok(frame)
}

/// Row order for a group-sorted field: group ascending, then the sort key
/// descending, then id. Missing keys sort last.
fn group_sort_order(
    evaluator: &Evaluator<'_>,
    sort_by: &Expr,
    by: &Expr,
    as_of: NaiveDate,
) -> Result<Vec<usize>, ClientError> {
    let keys = evaluator.eval(sort_by, as_of)?;
    let groups = evaluator.eval(by, as_of)?;
    let group_of = |i: usize| match &groups[i] {
        Value::Text(t) => Some(t.clone()),
        Value::Num(v) => Some(v.to_string()),
        _ => None,
    };

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        let by_group = match (group_of(a), group_of(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_group.then_with(|| match (keys[a].as_f64(), keys[b].as_f64()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
    Ok(order)
}

impl QueryClient for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    fn execute(&self, request: &Request) -> Result<Vec<FieldFrame>, ClientError> {
        let as_of = self.resolve_as_of(request);
        let secs = self.select(&request.universe, request, as_of)?;
        tracing::debug!(
            %as_of,
            universe = secs.len(),
            fields = request.fields.len(),
            "evaluating request locally"
        );

        let evaluator = Evaluator::new(&secs, request.options.fill);
        let mut frames = Vec::with_capacity(request.fields.len());
        for field in &request.fields {
            let frame = match shaping_node(&field.expr) {
                Expr::GroupCount { key } => group_count_frame(&field.name, &evaluator, key, as_of)?,
                node => {
                    let values = evaluator.eval(&field.expr, as_of)?;
                    let order = match node {
                        Expr::GroupSort { sort_by, by, .. } => {
                            group_sort_order(&evaluator, sort_by, by, as_of)?
                        }
                        _ => (0..values.len()).collect(),
                    };
                    let mut cells: Vec<Option<Value>> = values.into_iter().map(Some).collect();
                    let mut frame = FieldFrame::new(&field.name);
                    for i in order {
                        let cell = cells[i].take().map(to_cell).unwrap_or_default();
                        frame.push(secs[i].id.clone(), cell);
                    }
                    frame
                }
            };
            frames.push(frame);
        }
        Ok(frames)
    }
}
