//! Display region: the color-scaled result grid, or the busy / empty
//! placeholder.
//!
//! The security id column stays frozen on the left; the remaining columns
//! scroll horizontally from `App::grid_col`.

use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use cefscreen_runner::dashboard::Display;
use cefscreen_runner::format::GridSpec;

use crate::app::{App, Focus};
use crate::theme;

/// Grid widths are in pixels; the terminal renders roughly this many per
/// character.
const PIXELS_PER_CHAR: u16 = 10;
const MIN_CHARS: usize = 6;

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let block = super::panel_block("Results", app.focus == Focus::Grid);
    let inner = block.inner(area);
    f.render_widget(block, area);

    match app.dashboard.display() {
        Display::Empty => {
            let para = Paragraph::new(Line::from(Span::styled(
                "No data. Choose a main group and press Refresh (F5).",
                theme::muted(),
            )));
            f.render_widget(para, inner);
        }
        Display::Updating => {
            let mut lines = vec![Line::from(""); (inner.height / 2) as usize];
            lines.push(Line::from(Span::styled("Updating...", theme::warning())));
            f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), inner);
        }
        Display::Grid(grid) => render_grid(f, inner, app, grid),
    }
}

/// Character width of a grid column.
pub fn char_width(grid: &GridSpec, column: &str) -> usize {
    ((grid.column_width(column) / PIXELS_PER_CHAR) as usize).max(MIN_CHARS)
}

fn fit(text: &str, width: usize, right: bool) -> String {
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    if right {
        format!("{cut:>w$} ", w = width - 1)
    } else {
        format!("{cut:<w$} ", w = width - 1)
    }
}

fn render_grid(f: &mut Frame, area: Rect, app: &App, grid: &GridSpec) {
    let table = &grid.table;
    let id_width = table
        .index
        .iter()
        .map(|id| id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2)
        + 1;

    // Columns that fit to the right of the frozen id column.
    let mut visible = Vec::new();
    let mut used = id_width;
    for col in app.grid_col..table.column_count() {
        let w = char_width(grid, &table.columns[col].name);
        if used + w > area.width as usize && !visible.is_empty() {
            break;
        }
        used += w;
        visible.push((col, w));
    }

    let mut lines = Vec::with_capacity(area.height as usize);
    let mut header = vec![Span::styled(fit("id", id_width, false), theme::accent_bold())];
    header.extend(visible.iter().map(|&(col, w)| {
        let right = table.columns[col].is_numeric();
        Span::styled(fit(&table.columns[col].name, w, right), theme::accent_bold())
    }));
    lines.push(Line::from(header));

    let body_height = (area.height as usize).saturating_sub(1);
    let end = (app.grid_row + body_height).min(table.row_count());
    for row in app.grid_row..end {
        let mut spans = vec![Span::styled(
            fit(&table.index[row], id_width, false),
            theme::muted(),
        )];
        spans.extend(visible.iter().map(|&(col, w)| {
            let right = table.columns[col].is_numeric();
            let style = theme::grid_cell(grid.cell_background(row, col), grid.text_color(col));
            Span::styled(fit(&grid.cell_text(row, col), w, right), style)
        }));
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), area);
}
