use std::time::Duration;

use ratatui::widgets::ListState;

use crate::refresh::{Phase, RefreshState};
use crate::source::{Incident, ServiceCheck};

pub struct App {
    /// Latest snapshot published by the refresh controller.
    pub refresh: RefreshState,
    /// Static incident notes shown under the services.
    pub incidents: Vec<Incident>,
    /// Shown in the status bar as the auto-refresh period.
    pub poll_interval: Duration,
    /// Selected check, counted across all groups in display order.
    pub selected: Option<usize>,
    /// Render state of the service list (rows include group headers).
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Set by the `r` key; the main loop turns it into a refetch.
    refetch_requested: bool,
}

impl App {
    pub fn new(incidents: Vec<Incident>, poll_interval: Duration) -> Self {
        Self {
            refresh: RefreshState::default(),
            incidents,
            poll_interval,
            selected: None,
            list_state: ListState::default(),
            quit: false,
            refetch_requested: false,
        }
    }

    /// Replace the displayed snapshot, keeping the selection in range.
    pub fn apply(&mut self, state: RefreshState) {
        self.refresh = state;
        let count = self.check_count();
        self.selected = match self.selected {
            Some(_) if count == 0 => None,
            Some(i) => Some(i.min(count - 1)),
            None => None,
        };
    }

    /// Number of checks across all groups.
    pub fn check_count(&self) -> usize {
        self.refresh.data.iter().map(|g| g.checks.len()).sum()
    }

    pub fn selected_check(&self) -> Option<&ServiceCheck> {
        let i = self.selected?;
        self.refresh.data.iter().flat_map(|g| &g.checks).nth(i)
    }

    /// List row of the selected check, counting one header row per group.
    pub fn selected_row(&self) -> Option<usize> {
        let mut remaining = self.selected?;
        let mut row = 0;
        for group in &self.refresh.data {
            row += 1;
            if remaining < group.checks.len() {
                return Some(row + remaining);
            }
            remaining -= group.checks.len();
            row += group.checks.len();
        }
        None
    }

    /// One-line summary of the refresh state for the status bar.
    pub fn status_text(&self) -> String {
        let state = &self.refresh;
        match state.phase {
            Phase::Idle => "Starting…".into(),
            Phase::Loading if state.data.is_empty() => "Loading services…".into(),
            Phase::Loading => "Refreshing…".into(),
            Phase::Ready => format!(
                "{} services in {} groups",
                self.check_count(),
                state.data.len()
            ),
            Phase::Error => format!(
                "Error: {}",
                state.error_message.as_deref().unwrap_or("unknown failure")
            ),
        }
    }

    // -- actions -------------------------------------------------------------

    pub fn request_refetch(&mut self) {
        self.refetch_requested = true;
    }

    /// Consume a pending refetch request.
    pub fn take_refetch_request(&mut self) -> bool {
        std::mem::take(&mut self.refetch_requested)
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let count = self.check_count();
        if count == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) => (i + 1).min(count - 1),
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn select_previous(&mut self) {
        if self.check_count() == 0 {
            return;
        }
        let i = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.selected = Some(i);
    }

    pub fn select_first(&mut self) {
        if self.check_count() > 0 {
            self.selected = Some(0);
        }
    }

    pub fn select_last(&mut self) {
        let count = self.check_count();
        if count > 0 {
            self.selected = Some(count - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ServiceGroup, ServiceStatus};

    fn make_check(name: &str) -> ServiceCheck {
        ServiceCheck {
            id: None,
            name: name.to_string(),
            url: None,
            check_type: None,
            current_status: ServiceStatus::Operational,
            last_checked_at: None,
        }
    }

    fn make_group(title: &str, names: &[&str]) -> ServiceGroup {
        ServiceGroup {
            title: title.to_string(),
            checks: names.iter().map(|n| make_check(n)).collect(),
            status: None,
        }
    }

    fn ready(data: Vec<ServiceGroup>) -> RefreshState {
        RefreshState {
            phase: Phase::Ready,
            data,
            error_message: None,
            last_updated: None,
        }
    }

    fn sample_app() -> App {
        let mut app = App::new(Vec::new(), Duration::from_secs(30));
        app.apply(ready(vec![
            make_group("My Services", &["GitHub", "Render"]),
            make_group("External", &["Hacker News"]),
        ]));
        app
    }

    // -- construction --------------------------------------------------------

    #[test]
    fn new_app_starts_empty() {
        let app = App::new(Vec::new(), Duration::from_secs(30));
        assert!(app.refresh.data.is_empty());
        assert_eq!(app.refresh.phase, Phase::Idle);
        assert!(!app.quit);
        assert!(app.selected.is_none());
    }

    // -- apply ---------------------------------------------------------------

    #[test]
    fn apply_replaces_snapshot() {
        let mut app = sample_app();
        app.apply(ready(vec![make_group("Core", &["API"])]));

        assert_eq!(app.check_count(), 1);
        assert_eq!(app.refresh.data[0].title, "Core");
    }

    #[test]
    fn apply_clamps_selection_when_list_shrinks() {
        let mut app = sample_app();
        app.select_last();
        assert_eq!(app.selected, Some(2));

        app.apply(ready(vec![make_group("Core", &["API"])]));
        assert_eq!(app.selected, Some(0));

        app.apply(ready(Vec::new()));
        assert!(app.selected.is_none());
    }

    // -- selection mapping ---------------------------------------------------

    #[test]
    fn selected_check_walks_groups_in_order() {
        let mut app = sample_app();
        app.selected = Some(2);
        assert_eq!(app.selected_check().unwrap().name, "Hacker News");
    }

    #[test]
    fn selected_row_skips_group_headers() {
        let mut app = sample_app();

        app.selected = Some(0);
        assert_eq!(app.selected_row(), Some(1));

        app.selected = Some(1);
        assert_eq!(app.selected_row(), Some(2));

        // Second group's header sits on row 3.
        app.selected = Some(2);
        assert_eq!(app.selected_row(), Some(4));
    }

    // -- status text ---------------------------------------------------------

    #[test]
    fn status_text_follows_phase() {
        let mut app = App::new(Vec::new(), Duration::from_secs(30));
        assert_eq!(app.status_text(), "Starting…");

        app.refresh.phase = Phase::Loading;
        assert_eq!(app.status_text(), "Loading services…");

        app.refresh.phase = Phase::Error;
        app.refresh.error_message = Some("HTTP 502: Bad Gateway".into());
        assert_eq!(app.status_text(), "Error: HTTP 502: Bad Gateway");

        let app = sample_app();
        assert_eq!(app.status_text(), "3 services in 2 groups");
    }

    // -- refetch -------------------------------------------------------------

    #[test]
    fn refetch_request_is_consumed_once() {
        let mut app = sample_app();
        assert!(!app.take_refetch_request());

        app.request_refetch();
        assert!(app.take_refetch_request());
        assert!(!app.take_refetch_request());
    }

    // -- navigation ----------------------------------------------------------

    #[test]
    fn navigation_on_empty_is_noop() {
        let mut app = App::new(Vec::new(), Duration::from_secs(30));
        app.select_next();
        app.select_previous();
        app.select_first();
        app.select_last();
        assert!(app.selected.is_none());
    }

    #[test]
    fn select_next_starts_at_zero_then_advances() {
        let mut app = sample_app();

        app.select_next();
        assert_eq!(app.selected, Some(0));

        app.select_next();
        assert_eq!(app.selected, Some(1));

        app.select_next();
        assert_eq!(app.selected, Some(2));
    }

    #[test]
    fn select_next_clamps_at_last_check() {
        let mut app = sample_app();

        app.select_last();
        app.select_next();
        assert_eq!(app.selected, Some(2));
    }

    #[test]
    fn select_previous_clamps_at_zero() {
        let mut app = sample_app();

        app.select_first();
        app.select_previous();
        assert_eq!(app.selected, Some(0));
    }

    #[test]
    fn select_previous_moves_up() {
        let mut app = sample_app();

        app.select_last(); // index 2
        app.select_previous();
        assert_eq!(app.selected, Some(1));
    }
}
