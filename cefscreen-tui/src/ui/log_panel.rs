//! Activity log panel, newest entry at the bottom. Long lines are cut at
//! the panel edge so the newest entry is always visible.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use cefscreen_runner::dashboard::{LogEntry, LogLevel};

use crate::app::{App, Focus};
use crate::theme;

fn level_tag(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO ",
        LogLevel::Warning => "WARN ",
        LogLevel::Error => "ERROR",
    }
}

fn entry_line(entry: &LogEntry) -> Line<'_> {
    let style = theme::log_level(entry.level);
    Line::from(vec![
        Span::styled(entry.at.format("%H:%M:%S ").to_string(), theme::muted()),
        Span::styled(format!("{} ", level_tag(entry.level)), style),
        Span::styled(entry.message.as_str(), style),
    ])
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let log = app.dashboard.log();
    let title = format!("Log ({})", log.len());
    let block = super::panel_block(&title, app.focus == Focus::Log);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let height = inner.height as usize;
    let end = log.len().saturating_sub(app.log_scroll);
    let start = end.saturating_sub(height);
    let lines: Vec<Line> = log
        .entries()
        .skip(start)
        .take(end - start)
        .map(entry_line)
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}
