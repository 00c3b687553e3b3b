use crate::monitor::MonitorCommand;
use crate::source::SourceKind;
use crate::status::ServiceStatus;

use ratatui::widgets::ListState;

pub struct App {
    /// Latest snapshot published by the monitor.
    pub status: ServiceStatus,
    /// Source used by the next `Start`.
    pub next_source: SourceKind,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Short-lived feedback for the last key press.
    pub notice: Option<String>,
    /// Commands waiting to be sent to the monitor.
    pending: Vec<MonitorCommand>,
}

impl App {
    pub fn new(status: ServiceStatus, next_source: SourceKind) -> Self {
        Self {
            status,
            next_source,
            list_state: ListState::default(),
            quit: false,
            notice: None,
            pending: Vec::new(),
        }
    }

    /// Replace the snapshot, keeping the selection in range.
    pub fn sync(&mut self, status: ServiceStatus) {
        self.status = status;
        let len = self.status.recent_posts.len();
        match self.list_state.selected() {
            Some(_) if len == 0 => self.list_state.select(None),
            Some(i) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    pub fn take_commands(&mut self) -> Vec<MonitorCommand> {
        std::mem::take(&mut self.pending)
    }

    // -- monitor control -----------------------------------------------------

    pub fn toggle_running(&mut self) {
        let cmd = if self.status.is_running {
            MonitorCommand::Stop
        } else {
            MonitorCommand::Start(self.next_source)
        };
        self.notice = None;
        self.pending.push(cmd);
    }

    pub fn switch_source(&mut self) {
        self.next_source = self.next_source.other();
        let when = if self.status.is_running { " (after restart)" } else { "" };
        self.notice = Some(format!("Next start uses {}{when}", self.next_source.describe()));
    }

    pub fn check_now(&mut self) {
        if self.status.is_running {
            self.notice = None;
            self.pending.push(MonitorCommand::CheckNow);
        } else {
            self.notice = Some("Press s to start monitoring first".into());
        }
    }

    // -- navigation ----------------------------------------------------------

    fn len(&self) -> usize {
        self.status.recent_posts.len()
    }

    pub fn select_next(&mut self) {
        if self.len() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.len() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.len() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if self.len() > 0 {
            self.list_state.select(Some(self.len() - 1));
        }
    }
}
