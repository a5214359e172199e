//! Top-level layout: control panel, display region, activity log and a
//! one-line key hint bar.

pub mod control_panel;
pub mod grid;
pub mod log_panel;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus};
use crate::theme;

const LOG_HEIGHT: u16 = 8;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(LOG_HEIGHT),
            Constraint::Length(1),
        ])
        .split(f.area());

    control_panel::render(f, chunks[0], app);
    grid::render(f, chunks[1], app);
    log_panel::render(f, chunks[2], app);
    render_hints(f, chunks[3], app);

    // The picker drops down over the display region.
    if app.group_picker.is_some() {
        control_panel::render_picker(f, chunks[0], chunks[1], app);
    }
}

/// Bordered block with the focus-dependent border and title style.
pub fn panel_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(focused))
        .title(format!(" {title} "))
        .title_style(theme::panel_title(focused))
}

fn render_hints(f: &mut Frame, area: Rect, app: &App) {
    let hints = match app.focus {
        _ if app.dashboard.is_busy() => " working...",
        Focus::MarketCap => " [0-9]edit [Enter]refresh [Tab]next [Ctrl-C]quit",
        Focus::Group => " [Enter]choose group [Tab]next [q]uit",
        Focus::Reload | Focus::Refresh => " [Enter]run [F5]refresh [Tab]next [q]uit",
        Focus::Grid => " [h/j/k/l]scroll [PgUp/PgDn]page [Home]top [F5]refresh [q]uit",
        Focus::Log => " [j/k]scroll [PgUp/PgDn]page [Tab]next [q]uit",
    };
    let para = Paragraph::new(Line::from(Span::styled(hints, theme::muted())));
    f.render_widget(para, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app;
    use cefscreen_runner::dashboard::Action;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn controls_are_drawn() {
        let text = screen_text(&app("Equity"));
        assert!(text.contains("Reload Main Group"));
        assert!(text.contains("Refresh"));
        assert!(text.contains("Equity"));
        assert!(text.contains("100"));
    }

    #[test]
    fn busy_frame_shows_indicator() {
        let mut app = app("Equity");
        app.trigger(Action::Refresh);
        assert!(screen_text(&app).contains("Updating..."));
    }

    #[test]
    fn reload_button_shows_progress_until_done() {
        let mut app = app("Equity");
        app.trigger(Action::ReloadGroups);
        let text = screen_text(&app);
        assert!(text.contains("[ Reloading...      ]"), "{text}");
        assert!(!text.contains("Reload Main Group"));

        app.run_pending();
        let text = screen_text(&app);
        assert!(text.contains("[ Reload Main Group ]"));
        assert!(!text.contains("Reloading..."));
    }

    #[test]
    fn failure_lands_in_log_panel() {
        let mut app = app("Equity");
        app.trigger(Action::Refresh);
        app.run_pending();
        let text = screen_text(&app);
        assert!(text.contains("Issue when retrieving the data"));
        assert!(!text.contains("Updating..."));
    }
}
