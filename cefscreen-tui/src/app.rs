//! Application state: single-owner, main-thread only.
//!
//! Wraps the runner's [`Dashboard`] with the terminal-only concerns: which
//! control has focus, the text being typed into the market-cap field, the
//! group picker and the grid/log scroll positions.

use cefscreen_core::client::QueryClient;
use cefscreen_runner::dashboard::{Action, ActionOutcome, Dashboard, Display};

pub type ScreenDashboard = Dashboard<Box<dyn QueryClient>>;

/// Longest accepted market-cap entry, in digits.
const MAX_CAP_DIGITS: usize = 9;

/// Focusable regions, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    MarketCap,
    Group,
    Reload,
    Refresh,
    Grid,
    Log,
}

impl Focus {
    const ORDER: [Focus; 6] = [
        Focus::MarketCap,
        Focus::Group,
        Focus::Reload,
        Focus::Refresh,
        Focus::Grid,
        Focus::Log,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Focus {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Focus {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

pub struct App {
    pub dashboard: ScreenDashboard,
    pub focus: Focus,
    pub running: bool,
    /// Digits typed into the market-cap field ($MM).
    pub cap_input: String,
    /// Highlighted option while the group picker is open.
    pub group_picker: Option<usize>,
    pub grid_row: usize,
    pub grid_col: usize,
    /// Lines scrolled back from the newest log entry.
    pub log_scroll: usize,
}

impl App {
    pub fn new(dashboard: ScreenDashboard) -> Self {
        let cap_input = dashboard.params().min_market_cap_mm.to_string();
        Self {
            dashboard,
            focus: Focus::MarketCap,
            running: true,
            cap_input,
            group_picker: None,
            grid_row: 0,
            grid_col: 0,
            log_scroll: 0,
        }
    }

    pub fn focus_next(&mut self) {
        self.leave_field();
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.leave_field();
        self.focus = self.focus.prev();
    }

    fn leave_field(&mut self) {
        if self.focus == Focus::MarketCap {
            self.commit_market_cap();
        }
        self.group_picker = None;
    }

    // ── Market cap ──

    pub fn push_cap_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.cap_input.len() < MAX_CAP_DIGITS {
            if self.cap_input == "0" {
                self.cap_input.clear();
            }
            self.cap_input.push(c);
        }
    }

    pub fn pop_cap_digit(&mut self) {
        self.cap_input.pop();
    }

    /// Push the typed value into the screen parameters; empty means zero.
    pub fn commit_market_cap(&mut self) {
        let mm = self.cap_input.parse().unwrap_or(0);
        self.dashboard.set_min_market_cap(mm);
        self.cap_input = mm.to_string();
    }

    // ── Group picker ──

    pub fn open_group_picker(&mut self) {
        if self.dashboard.groups().is_empty() {
            return;
        }
        self.group_picker = Some(self.dashboard.selected_group_index().unwrap_or(0));
    }

    pub fn move_group_picker(&mut self, down: bool) {
        let count = self.dashboard.groups().len();
        if let Some(cursor) = self.group_picker.as_mut() {
            *cursor = if down {
                (*cursor + 1).min(count.saturating_sub(1))
            } else {
                cursor.saturating_sub(1)
            };
        }
    }

    pub fn pick_group(&mut self) {
        if let Some(cursor) = self.group_picker.take() {
            if let Some(group) = self.dashboard.groups().get(cursor).cloned() {
                self.dashboard.select_group(&group);
            }
        }
    }

    // ── Actions ──

    /// Queue an action; it runs after the next frame is drawn.
    pub fn trigger(&mut self, action: Action) {
        self.commit_market_cap();
        self.group_picker = None;
        if self.dashboard.request(action) && action == Action::Refresh {
            self.grid_row = 0;
            self.grid_col = 0;
        }
    }

    pub fn run_pending(&mut self) -> Option<ActionOutcome> {
        let action = self.dashboard.pending()?;
        let outcome = self.dashboard.run_pending()?;
        match &outcome {
            ActionOutcome::Completed => tracing::info!(?action, "action completed"),
            ActionOutcome::Failed(reason) => tracing::warn!(?action, %reason, "action failed"),
        }
        self.log_scroll = 0;
        Some(outcome)
    }

    // ── Scrolling ──

    fn grid_shape(&self) -> (usize, usize) {
        match self.dashboard.display() {
            Display::Grid(grid) => (grid.table.row_count(), grid.table.column_count()),
            _ => (0, 0),
        }
    }

    pub fn scroll_grid(&mut self, rows: isize, cols: isize) {
        let (row_count, col_count) = self.grid_shape();
        self.grid_row = step(self.grid_row, rows, row_count);
        self.grid_col = step(self.grid_col, cols, col_count);
    }

    pub fn scroll_log(&mut self, back: isize) {
        let len = self.dashboard.log().len();
        self.log_scroll = step(self.log_scroll, back, len);
    }
}

/// Move `pos` by `delta` within `0..len`.
fn step(pos: usize, delta: isize, len: usize) -> usize {
    let max = len.saturating_sub(1);
    pos.saturating_add_signed(delta).min(max)
}
