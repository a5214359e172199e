//! Control panel: market-cap input, group dropdown and the two buttons.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph};
use ratatui::Frame;

use cefscreen_runner::dashboard::Action;

use crate::app::{App, Focus};
use crate::theme;

const CAP_LABEL: &str = " Min market cap ($MM): ";
const GROUP_LABEL: &str = "   Main group: ";
const NO_GROUP: &str = "(reload)";
const RELOAD: &str = "Reload Main Group";
const RELOADING: &str = "Reloading...";

fn control_style(app: &App, focus: Focus) -> Style {
    if app.focus == focus {
        theme::focused_control()
    } else {
        theme::accent()
    }
}

fn cap_field(app: &App) -> String {
    let cursor = if app.focus == Focus::MarketCap { "_" } else { " " };
    format!("[ {:>9}{cursor}]", app.cap_input)
}

/// The reload button, relabelled while a reload is queued or running.
fn reload_button(app: &App) -> Span<'static> {
    if app.dashboard.pending() == Some(Action::ReloadGroups) {
        Span::styled(format!("[ {RELOADING:<17} ]"), theme::warning())
    } else {
        Span::styled(format!("[ {RELOAD} ]"), control_style(app, Focus::Reload))
    }
}

fn group_field(app: &App) -> String {
    let group = match app.dashboard.params().main_group.as_str() {
        "" => NO_GROUP,
        g => g,
    };
    format!("[ {group} v ]")
}

pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let focused = matches!(
        app.focus,
        Focus::MarketCap | Focus::Group | Focus::Reload | Focus::Refresh
    );
    let block = super::panel_block("Screen", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let line = Line::from(vec![
        Span::styled(CAP_LABEL, theme::muted()),
        Span::styled(cap_field(app), control_style(app, Focus::MarketCap)),
        Span::styled(GROUP_LABEL, theme::muted()),
        Span::styled(group_field(app), control_style(app, Focus::Group)),
        Span::raw("   "),
        reload_button(app),
        Span::raw("  "),
        Span::styled("[ Refresh ]", control_style(app, Focus::Refresh)),
    ]);
    f.render_widget(Paragraph::new(line), inner);
}

/// Drop-down list of group options, anchored under the group field.
pub fn render_picker(f: &mut Frame, panel: Rect, below: Rect, app: &App) {
    let Some(cursor) = app.group_picker else {
        return;
    };
    let groups = app.dashboard.groups();
    let offset = (CAP_LABEL.len() + cap_field(app).len() + GROUP_LABEL.len()) as u16;
    let width = groups.iter().map(|g| g.len()).max().unwrap_or(0) as u16 + 4;
    let x = (panel.x + 1 + offset).min(panel.right().saturating_sub(width));
    let area = Rect {
        x,
        y: below.y,
        width: width.min(panel.width),
        height: (groups.len() as u16 + 2).min(below.height),
    };

    let lines: Vec<Line> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let style = if i == cursor {
                theme::focused_control()
            } else {
                theme::accent()
            };
            Line::from(Span::styled(format!(" {g} "), style))
        })
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(super::panel_block("Group", true)),
        area,
    );
}
