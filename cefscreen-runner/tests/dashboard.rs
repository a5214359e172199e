//! Dashboard controller: success paths and the two failure points.

mod common;

use cefscreen_core::client::{ClientError, QueryClient};
use cefscreen_core::frame::FieldFrame;
use cefscreen_core::request::Request;
use cefscreen_runner::dashboard::{Action, ActionOutcome, Dashboard, Display, LogLevel};
use cefscreen_runner::screen::{QueryBuilder, ScreenParams};
use cefscreen_runner::Screener;

/// Fails every call the same way.
struct Unreachable;

impl QueryClient for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn execute(&self, _request: &Request) -> Result<Vec<FieldFrame>, ClientError> {
        Err(ClientError::Remote("connection refused".into()))
    }
}

fn messages<C: QueryClient>(dash: &Dashboard<C>) -> Vec<String> {
    dash.log().entries().map(|e| e.message.clone()).collect()
}

fn local_dashboard(params: ScreenParams) -> Dashboard<cefscreen_core::LocalEngine> {
    Dashboard::new(
        Screener::new(common::engine(), QueryBuilder::default()),
        params,
        50,
    )
}

#[test]
fn refresh_shows_grid_and_logs_progress() {
    let mut dash = local_dashboard(ScreenParams::new("A", 100));
    assert!(dash.request(Action::Refresh));
    assert!(matches!(dash.display(), Display::Updating));

    assert_eq!(dash.run_pending(), Some(ActionOutcome::Completed));
    match dash.display() {
        Display::Grid(grid) => assert_eq!(grid.table.row_count(), 2),
        other => panic!("expected grid, got {other:?}"),
    }

    let log = messages(&dash);
    assert_eq!(log[0], "Pulling Bql Data");
    assert!(log[1].starts_with("let("), "query text is logged: {}", log[1]);
    assert_eq!(log[2], "Pulling Data Finished");
    assert!(!dash.is_busy());
}

#[test]
fn refresh_failure_clears_display_and_logs_error() {
    let mut dash = Dashboard::new(
        Screener::new(Unreachable, QueryBuilder::default()),
        ScreenParams::new("A", 100),
        50,
    );
    dash.request(Action::Refresh);
    let outcome = dash.run_pending().unwrap();

    let expected = "Issue when retrieving the data :remote call failed: connection refused";
    assert_eq!(outcome, ActionOutcome::Failed(expected.to_string()));
    assert!(matches!(dash.display(), Display::Empty));
    let last = dash.log().last().unwrap();
    assert_eq!(last.level, LogLevel::Error);
    assert_eq!(last.message, expected);

    // Still usable afterwards.
    assert!(dash.request(Action::ReloadGroups));
}

#[test]
fn reload_failure_keeps_stale_options() {
    let mut dash = Dashboard::new(
        Screener::new(Unreachable, QueryBuilder::default()),
        ScreenParams::new("Equity", 0),
        50,
    );
    assert!(matches!(dash.reload_groups(), ActionOutcome::Failed(_)));
    assert_eq!(dash.groups(), ["Equity".to_string()]);
    assert_eq!(dash.params().main_group, "Equity");
    assert_eq!(
        messages(&dash),
        vec![
            "Reload UD_MAIN_GROUP CDE".to_string(),
            "Issue when retrieving the data :remote call failed: connection refused".to_string(),
        ]
    );
}

#[test]
fn reload_replaces_options_and_moves_stale_selection() {
    let mut dash = local_dashboard(ScreenParams::new("Gone", 100));
    assert_eq!(dash.reload_groups(), ActionOutcome::Completed);
    assert_eq!(dash.groups(), ["A".to_string(), "B".to_string()]);
    assert_eq!(dash.params().main_group, "A");
    assert!(dash
        .log()
        .entries()
        .any(|e| e.level == LogLevel::Warning && e.message.contains("Gone")));
    assert_eq!(dash.log().last().map(|e| e.message.as_str()), Some("Done"));
}

#[test]
fn selection_is_limited_to_options() {
    let mut dash = local_dashboard(ScreenParams::new("A", 100));
    dash.reload_groups();
    assert!(dash.select_group("B"));
    assert!(!dash.select_group("Z"));
    assert_eq!(dash.params().main_group, "B");
    assert_eq!(dash.selected_group_index(), Some(1));
}

#[test]
fn only_one_action_in_flight() {
    let mut dash = local_dashboard(ScreenParams::new("A", 100));
    assert!(dash.request(Action::ReloadGroups));
    assert!(!dash.request(Action::Refresh));
    assert_eq!(dash.pending(), Some(Action::ReloadGroups));
    dash.run_pending();
    assert_eq!(dash.run_pending(), None);
}

#[test]
fn reload_names_the_configured_group_code() {
    let mut dash = Dashboard::new(
        Screener::new(Unreachable, QueryBuilder::new("FUND_FAMILY", "UD_SUB_GROUP")),
        ScreenParams::new("Equity", 0),
        50,
    );
    dash.reload_groups();
    assert_eq!(messages(&dash)[0], "Reload FUND_FAMILY CDE");
}
