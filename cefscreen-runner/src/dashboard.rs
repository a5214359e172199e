//! Dashboard controller: UI-agnostic shell state.
//!
//! Owns the screen parameters, the group option set, the display region and
//! the activity log. A front end queues an [`Action`], paints the busy state,
//! then calls [`Dashboard::run_pending`]. No failure escapes: errors land in
//! the log and the display falls back to empty.

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use cefscreen_core::client::QueryClient;

use crate::format::GridSpec;
use crate::pipeline::{ScreenError, Screener};
use crate::screen::ScreenParams;

pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Severity of a log entry; drives the color in the log panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// One line of the activity log.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Local wall-clock time the entry was pushed.
    pub at: DateTime<Local>,
    pub level: LogLevel,
    /// Rendered verbatim, query text included.
    pub message: String,
}

/// Bounded activity log, oldest first.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!(target: "cefscreen::activity", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "cefscreen::activity", "{message}"),
            LogLevel::Error => tracing::error!(target: "cefscreen::activity", "{message}"),
        }
        self.entries.push_back(LogEntry {
            at: Local::now(),
            level,
            message,
        });
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// What the display region currently shows.
#[derive(Debug, Clone, Default)]
pub enum Display {
    #[default]
    Empty,
    Updating,
    Grid(GridSpec),
}

/// A user-triggered operation, queued until the busy frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    ReloadGroups,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    Failed(String),
}

fn issue_message(err: &ScreenError) -> String {
    format!("Issue when retrieving the data :{err}")
}

/// Controller behind the screen: owns the current parameters, the group
/// options, what the display region shows and the activity log.
///
/// At most one [`Action`] is pending at a time. Requests made while one is
/// queued are ignored.
pub struct Dashboard<C> {
    screener: Screener<C>,
    params: ScreenParams,
    groups: Vec<String>,
    display: Display,
    log: ActivityLog,
    pending: Option<Action>,
}

impl<C: QueryClient> Dashboard<C> {
    pub fn new(screener: Screener<C>, params: ScreenParams, log_capacity: usize) -> Self {
        let groups = if params.main_group.is_empty() {
            Vec::new()
        } else {
            vec![params.main_group.clone()]
        };
        Self {
            screener,
            params,
            groups,
            display: Display::Empty,
            log: ActivityLog::new(log_capacity),
            pending: None,
        }
    }

    pub fn screener(&self) -> &Screener<C> {
        &self.screener
    }

    pub fn params(&self) -> &ScreenParams {
        &self.params
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn pending(&self) -> Option<Action> {
        self.pending
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_min_market_cap(&mut self, mm: u64) {
        self.params.min_market_cap_mm = mm;
    }

    /// Select a main group from the option set; unknown values are ignored.
    pub fn select_group(&mut self, group: &str) -> bool {
        if self.groups.iter().any(|g| g == group) {
            self.params.main_group = group.to_string();
            true
        } else {
            false
        }
    }

    pub fn selected_group_index(&self) -> Option<usize> {
        self.groups.iter().position(|g| *g == self.params.main_group)
    }

    /// Queue an action. Refresh switches the display to the busy indicator
    /// right away so the front end can paint it before the blocking call.
    /// Returns false if another action is already queued.
    pub fn request(&mut self, action: Action) -> bool {
        if self.pending.is_some() {
            return false;
        }
        if action == Action::Refresh {
            self.display = Display::Updating;
        }
        self.pending = Some(action);
        true
    }

    /// Run the queued action, if any.
    pub fn run_pending(&mut self) -> Option<ActionOutcome> {
        let action = self.pending.take()?;
        Some(match action {
            Action::Refresh => self.refresh(),
            Action::ReloadGroups => self.reload_groups(),
        })
    }

    pub fn refresh(&mut self) -> ActionOutcome {
        self.display = Display::Updating;
        self.log.info("Pulling Bql Data");
        let request = self.screener.screen_request(&self.params);
        self.log.info(request.to_query_string());

        match self.screener.run(request) {
            Ok(outcome) => {
                self.log.info("Pulling Data Finished");
                self.display = Display::Grid(outcome.grid);
                ActionOutcome::Completed
            }
            Err(err) => {
                let message = issue_message(&err);
                self.log.error(message.clone());
                self.display = Display::Empty;
                ActionOutcome::Failed(message)
            }
        }
    }

    pub fn reload_groups(&mut self) -> ActionOutcome {
        let code = &self.screener.builder().main_group_field;
        self.log.info(format!("Reload {code} CDE"));
        match self.screener.reload_groups() {
            Ok(groups) => {
                self.groups = groups;
                if self.selected_group_index().is_none() {
                    let previous = std::mem::take(&mut self.params.main_group);
                    self.params.main_group = self.groups.first().cloned().unwrap_or_default();
                    if !previous.is_empty() {
                        self.log.push(
                            LogLevel::Warning,
                            format!(
                                "{previous} is no longer offered, selected {}",
                                self.params.main_group
                            ),
                        );
                    }
                }
                self.log.info("Done");
                ActionOutcome::Completed
            }
            Err(err) => {
                let message = issue_message(&err);
                self.log.error(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }
}
