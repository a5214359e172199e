//! A complete query: universe, named output fields and execution options.

use crate::expr::serialize::{bindings, Binding};
use crate::expr::{Expr, Fill};
use crate::predicate::Universe;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the service may answer from its cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Cached,
    Live,
}

impl Mode {
    pub fn query_name(self) -> &'static str {
        match self {
            Mode::Cached => "cached",
            Mode::Live => "live",
        }
    }
}

/// Request-wide execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    pub fill: Option<Fill>,
    pub mode: Mode,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            fill: Some(Fill::Prev),
            mode: Mode::Cached,
        }
    }
}

/// One requested output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedField {
    pub name: String,
    pub expr: Expr,
}

impl NamedField {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }

    /// Identifier-safe alias for query text (`current premium/ discount` →
    /// `current_premium_discount`).
    pub fn alias(&self) -> String {
        let mut alias = String::with_capacity(self.name.len());
        let mut pending_sep = false;
        for ch in self.name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_sep && !alias.is_empty() {
                    alias.push('_');
                }
                alias.push(ch);
                pending_sep = false;
            } else {
                pending_sep = true;
            }
        }
        if alias.is_empty() || alias.starts_with(|c: char| c.is_ascii_digit()) {
            alias.insert(0, 'f');
            alias.insert(1, '_');
        }
        alias
    }
}

/// One round trip to a query client: the securities, the fields and the
/// evaluation options.
///
/// Fields come back in the order given here, each keyed by security id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Securities the fields are evaluated over.
    pub universe: Universe,
    /// Named fields, in output order.
    pub fields: Vec<NamedField>,
    /// Fill and cache mode applied to every field.
    pub options: ExecOptions,
    /// Evaluation date; `None` means the service's current date.
    pub as_of: Option<NaiveDate>,
}

impl Request {
    pub fn new(universe: Universe, fields: Vec<NamedField>) -> Self {
        Self {
            universe,
            fields,
            options: ExecOptions::default(),
            as_of: None,
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_as_of(mut self, as_of: Option<NaiveDate>) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Named bindings used by any field, hoisted in dependency order.
    pub fn bindings(&self) -> Vec<Binding> {
        bindings(self.fields.iter().map(|f| &f.expr))
    }

    /// Full query text as sent to the service.
    pub fn to_query_string(&self) -> String {
        self.to_string()
    }

    /// Content-addressed fingerprint of the query text.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(self.to_query_string().as_bytes());
        hash.to_hex()[..16].to_string()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lets = self.bindings();
        if !lets.is_empty() {
            write!(f, "let(")?;
            for binding in &lets {
                write!(f, "{binding}")?;
            }
            write!(f, ") ")?;
        }
        let items: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{} as #{}", field.expr, field.alias()))
            .collect();
        write!(f, "get({}) for({})", items.join(", "), self.universe)?;

        let mut with = Vec::new();
        if let Some(Fill::Prev) = self.options.fill {
            with.push("fill=prev".to_string());
        }
        with.push(format!("mode={}", self.options.mode.query_name()));
        if let Some(as_of) = self.as_of {
            with.push(format!("dates={}", as_of.format("%Y-%m-%d")));
        }
        write!(f, " with({})", with.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::DataItem;

    #[test]
    fn alias_is_identifier_safe() {
        let cases = [
            ("current premium/ discount", "current_premium_discount"),
            ("12-month yield", "f_12_month_yield"),
            ("CDE sub group", "CDE_sub_group"),
            ("current market cap (millions)", "current_market_cap_millions"),
        ];
        for (name, expected) in cases {
            assert_eq!(NamedField::new(name, Expr::constant(1.0)).alias(), expected);
        }
    }

    #[test]
    fn query_string_layout() {
        let px = Expr::item(DataItem::PxLast).named("px");
        let req = Request::new(
            Universe::active_primary_funds(),
            vec![
                NamedField::new("price", px.clone()),
                NamedField::new("double", px.times(2.0)),
            ],
        );
        assert_eq!(
            req.to_query_string(),
            "let(#px=px_last();) get(#px as #price, (#px*2) as #double) \
             for(fundsuniv(['active','primary'])) with(fill=prev, mode=cached)"
        );
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Request::new(
            Universe::active_primary_funds(),
            vec![NamedField::new("price", Expr::item(DataItem::PxLast))],
        );
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.options.mode = Mode::Live;
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);
    }
}
