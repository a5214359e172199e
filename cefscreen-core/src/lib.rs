//! CEF Screen Core: query model, query clients and the local evaluation engine.
//!
//! This crate holds everything below the screener itself:
//! - Relative date offsets and windows
//! - The field expression tree and its query-text serializer
//! - Universe predicates and the request model
//! - Per-field result frames
//! - The `QueryClient` seam with an HTTP client and an in-process engine
//! - A seeded synthetic fund universe for demo mode and tests

pub mod client;
pub mod engine;
pub mod expr;
pub mod frame;
pub mod offset;
pub mod predicate;
pub mod request;
pub mod states;

pub use client::{ClientError, HttpQueryClient, QueryClient};
pub use engine::{synthetic_universe, LocalEngine, Security, SecurityStore};
pub use expr::{DataItem, Expr};
pub use frame::{Cell, FieldFrame};
pub use offset::{DateOffset, DateRange};
pub use predicate::{Predicate, Universe};
pub use request::{ExecOptions, Mode, NamedField, Request};
