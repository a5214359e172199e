//! CEF Screen Runner: screen building, merging, formatting and the dashboard.
//!
//! This crate builds on `cefscreen-core` to provide:
//! - The screen query builder (universe filter + the sixteen output fields)
//! - Column-wise merging of per-field frames into one result table
//! - The presentation formatter (number formats, color scales, grid spec)
//! - The refresh / reload pipeline with typed errors
//! - The UI-agnostic dashboard controller and activity log
//! - TOML configuration and table exports

pub mod config;
pub mod dashboard;
pub mod export;
pub mod format;
pub mod merge;
pub mod pipeline;
pub mod screen;

pub use config::{ConfigError, ScreenerConfig};
pub use dashboard::{Action, ActionOutcome, ActivityLog, Dashboard, Display, LogEntry, LogLevel};
pub use format::{find_middle, format_cell, ColorScale, ColumnRule, GridSpec, Rgb, TextColor};
pub use merge::{ResultTable, TableColumn};
pub use pipeline::{ScreenError, ScreenOutcome, Screener};
pub use screen::{QueryBuilder, ScreenParams, FIELD_NAMES};
