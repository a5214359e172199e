//! Keyboard input dispatch: global keys, then the open picker, then the
//! focused control.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use cefscreen_runner::dashboard::Action;

use crate::app::{App, Focus};

const PAGE: isize = 10;

pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }
    // Input is ignored while an action is queued.
    if app.dashboard.is_busy() {
        return;
    }

    if app.group_picker.is_some() {
        handle_picker(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.running = false;
            return;
        }
        KeyCode::Char('q') | KeyCode::Esc if app.focus != Focus::MarketCap => {
            app.running = false;
            return;
        }
        KeyCode::Tab => {
            app.focus_next();
            return;
        }
        KeyCode::BackTab => {
            app.focus_prev();
            return;
        }
        KeyCode::F(5) => {
            app.trigger(Action::Refresh);
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::MarketCap => handle_market_cap(app, key),
        Focus::Group => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Down) {
                app.open_group_picker();
            }
        }
        Focus::Reload => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                app.trigger(Action::ReloadGroups);
            }
        }
        Focus::Refresh => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                app.trigger(Action::Refresh);
            }
        }
        Focus::Grid => handle_grid(app, key),
        Focus::Log => match key.code {
            KeyCode::Char('k') | KeyCode::Up => app.scroll_log(1),
            KeyCode::Char('j') | KeyCode::Down => app.scroll_log(-1),
            KeyCode::PageUp => app.scroll_log(PAGE),
            KeyCode::PageDown => app.scroll_log(-PAGE),
            _ => {}
        },
    }
}

fn handle_market_cap(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) if c.is_ascii_digit() => app.push_cap_digit(c),
        KeyCode::Backspace => app.pop_cap_digit(),
        KeyCode::Enter => app.trigger(Action::Refresh),
        KeyCode::Esc => app.commit_market_cap(),
        _ => {}
    }
}

fn handle_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.move_group_picker(true),
        KeyCode::Char('k') | KeyCode::Up => app.move_group_picker(false),
        KeyCode::Enter | KeyCode::Char(' ') => app.pick_group(),
        KeyCode::Esc | KeyCode::Char('q') => app.group_picker = None,
        _ => {}
    }
}

fn handle_grid(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_grid(1, 0),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_grid(-1, 0),
        KeyCode::Char('l') | KeyCode::Right => app.scroll_grid(0, 1),
        KeyCode::Char('h') | KeyCode::Left => app.scroll_grid(0, -1),
        KeyCode::PageDown => app.scroll_grid(PAGE, 0),
        KeyCode::PageUp => app.scroll_grid(-PAGE, 0),
        KeyCode::Home => {
            app.grid_row = 0;
            app.grid_col = 0;
        }
        _ => {}
    }
}
