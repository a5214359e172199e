//! Universe definition: a base fund universe narrowed by a boolean predicate.

use crate::expr::serialize::{number, quote};
use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Compared numerically; rendered without a trailing `.0`.
    Num(f64),
    /// Compared as exact text; rendered single-quoted.
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Num(v) => write!(f, "{}", number(*v)),
            Literal::Text(t) => write!(f, "{}", quote(t)),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Text(s)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Num(v)
    }
}

/// Comparison between an expression and a literal.
///
/// A missing left-hand value never satisfies a comparison, whatever the
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `<`
    Lt,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Lt => "<",
        }
    }

    pub fn holds<T: PartialOrd + ?Sized>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Lt => lhs < rhs,
        }
    }
}

/// Boolean predicate over security attributes.
///
/// A comparison against a missing attribute is false (`Ne` included), so a
/// security lacking a classification silently drops out of the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pred", rename_all = "snake_case")]
pub enum Predicate {
    Compare {
        lhs: Expr,
        op: CmpOp,
        rhs: Literal,
    },
    In {
        lhs: Expr,
        values: Vec<String>,
    },
    NotMissing {
        expr: Expr,
    },
    And {
        all: Vec<Predicate>,
    },
    Or {
        any: Vec<Predicate>,
    },
}

impl Predicate {
    pub fn compare(lhs: Expr, op: CmpOp, rhs: impl Into<Literal>) -> Self {
        Predicate::Compare {
            lhs,
            op,
            rhs: rhs.into(),
        }
    }

    pub fn equals(lhs: Expr, rhs: impl Into<Literal>) -> Self {
        Self::compare(lhs, CmpOp::Eq, rhs)
    }

    pub fn at_least(lhs: Expr, rhs: impl Into<Literal>) -> Self {
        Self::compare(lhs, CmpOp::Ge, rhs)
    }

    pub fn is_in(lhs: Expr, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Predicate::In {
            lhs,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_missing(expr: Expr) -> Self {
        Predicate::NotMissing { expr }
    }

    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And { mut all } => {
                all.push(other);
                Predicate::And { all }
            }
            first => Predicate::And {
                all: vec![first, other],
            },
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Or { mut any } => {
                any.push(other);
                Predicate::Or { any }
            }
            first => Predicate::Or {
                any: vec![first, other],
            },
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { lhs, op, rhs } => write!(f, "{lhs}{}{rhs}", op.symbol()),
            Predicate::In { lhs, values } => {
                let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
                write!(f, "in({lhs}, [{}])", quoted.join(","))
            }
            Predicate::NotMissing { expr } => write!(f, "{expr}!=NA"),
            Predicate::And { all } => write_joined(f, "and", all),
            Predicate::Or { any } => write_joined(f, "or", any),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, name: &str, parts: &[Predicate]) -> fmt::Result {
    let rendered: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
    write!(f, "{name}({})", rendered.join(", "))
}

/// Listing status a fund must carry to be in the base universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Active,
    Primary,
}

impl FundStatus {
    pub fn query_name(self) -> &'static str {
        match self {
            FundStatus::Active => "active",
            FundStatus::Primary => "primary",
        }
    }
}

/// The screened universe: funds carrying every status, then `filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub statuses: Vec<FundStatus>,
    pub filter: Option<Predicate>,
}

impl Universe {
    /// All active primary funds.
    pub fn active_primary_funds() -> Self {
        Self {
            statuses: vec![FundStatus::Active, FundStatus::Primary],
            filter: None,
        }
    }

    pub fn filtered(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }
}

impl fmt::Display for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let statuses: Vec<String> = self
            .statuses
            .iter()
            .map(|s| quote(s.query_name()))
            .collect();
        let base = format!("fundsuniv([{}])", statuses.join(","));
        match &self.filter {
            Some(pred) => write!(f, "filter({base}, {pred})"),
            None => write!(f, "{base}"),
        }
    }
}
