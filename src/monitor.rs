//! Background monitoring.
//!
//! A single tokio task owns the timer, the active source and the check
//! cycle.  Dashboards talk to it through a [`MonitorHandle`]: commands go in
//! over an [`mpsc`] channel, status snapshots come out over a [`watch`]
//! channel.
//!
//! ## Why cycles never overlap
//!
//! Commands are only read between cycles, and the timer is only polled
//! between cycles.  A manual check requested mid-cycle waits in the channel;
//! timer ticks that elapse mid-cycle are skipped
//! ([`MissedTickBehavior::Skip`]).  So at most one cycle touches the store
//! at any time, without a lock.
//!
//! `Stop` only cancels future ticks.  A cycle that is already running always
//! finishes and persists.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::cycle::CheckCycle;
use crate::source::{PostSource, SourceKind, SourceSet};
use crate::status::ServiceStatus;

/// Commands accepted by the monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Begin a session with this source; runs a first cycle immediately.
    Start(SourceKind),
    /// Stop scheduling further cycles.
    Stop,
    /// Run one cycle now (only while a session is active).
    CheckNow,
    /// Finish any in-flight cycle and end the task.
    Shutdown,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("monitor is busy, try again")]
    Busy,
    #[error("monitor has shut down")]
    Closed,
}

/// Cloneable handle for dashboards.
#[derive(Clone)]
pub struct MonitorHandle {
    commands: mpsc::Sender<MonitorCommand>,
    status: watch::Receiver<ServiceStatus>,
}

impl MonitorHandle {
    /// Queue a command without waiting.
    pub fn send(&self, cmd: MonitorCommand) -> Result<(), CommandError> {
        self.commands.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CommandError::Busy,
            mpsc::error::TrySendError::Closed(_) => CommandError::Closed,
        })
    }

    /// Latest published status.
    pub fn status(&self) -> ServiceStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceStatus> {
        self.status.clone()
    }
}

struct Session {
    kind: SourceKind,
    source: Arc<dyn PostSource>,
    ticker: Interval,
}

enum Event {
    Tick,
    Command(Option<MonitorCommand>),
}

pub struct Monitor {
    cycle: CheckCycle,
    sources: SourceSet,
    interval: Duration,
    status: watch::Sender<ServiceStatus>,
    commands: mpsc::Receiver<MonitorCommand>,
}

/// Start the monitor task.  It idles until it receives `Start`.
pub fn spawn(
    cycle: CheckCycle,
    sources: SourceSet,
    interval: Duration,
    initial: ServiceStatus,
) -> (MonitorHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (status_tx, status_rx) = watch::channel(initial);

    let monitor = Monitor {
        cycle,
        sources,
        interval,
        status: status_tx,
        commands: cmd_rx,
    };
    let task = tokio::spawn(monitor.run());

    (
        MonitorHandle {
            commands: cmd_tx,
            status: status_rx,
        },
        task,
    )
}

impl Monitor {
    async fn run(mut self) {
        let mut session: Option<Session> = None;

        loop {
            let event = match session.as_mut() {
                // Queued commands win over a ready tick, so a `Stop` sent
                // during a cycle is seen before the next one starts.
                Some(s) => tokio::select! {
                    biased;
                    cmd = self.commands.recv() => Event::Command(cmd),
                    _ = s.ticker.tick() => Event::Tick,
                },
                None => Event::Command(self.commands.recv().await),
            };

            match event {
                Event::Tick => {
                    if let Some(s) = &session {
                        self.run_cycle(s.source.as_ref()).await;
                    }
                }
                Event::Command(None) | Event::Command(Some(MonitorCommand::Shutdown)) => {
                    info!("monitor shutting down");
                    break;
                }
                Event::Command(Some(MonitorCommand::Start(kind))) => {
                    if let Some(s) = &session {
                        let running = s.kind;
                        self.set_message(format!("Already monitoring using {}", running.describe()));
                        continue;
                    }
                    session = self.start_session(kind).await;
                }
                Event::Command(Some(MonitorCommand::Stop)) => {
                    if session.take().is_some() {
                        info!("monitoring stopped");
                        self.status.send_modify(|st| {
                            st.is_running = false;
                            st.status_message = "Service stopped by user".into();
                        });
                    } else {
                        self.set_message("Service is not running".into());
                    }
                }
                Event::Command(Some(MonitorCommand::CheckNow)) => match &session {
                    Some(s) => {
                        info!("manual check requested");
                        self.set_message("Manual check initiated...".into());
                        self.run_cycle(s.source.as_ref()).await;
                    }
                    None => self.set_message("Start monitoring before checking".into()),
                },
            }
        }
    }

    async fn start_session(&self, kind: SourceKind) -> Option<Session> {
        let source = match self.sources.get(kind) {
            Ok(source) => source,
            Err(e) => {
                warn!(source = %kind, error = %e, "cannot start monitoring");
                self.set_message(format!("Cannot start: {e}"));
                return None;
            }
        };

        if let Err(e) = source.preflight().await {
            warn!(source = %kind, error = %e, "source preflight failed");
            let hint = match kind {
                SourceKind::Api => " (try the scraping source)",
                SourceKind::Scrape => "",
            };
            self.set_message(format!("Cannot start: {e}{hint}"));
            return None;
        }

        // The first tick completes immediately, giving the initial check.
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(source = %kind, interval_secs = self.interval.as_secs(), "monitoring started");
        self.status.send_modify(|st| {
            st.is_running = true;
            st.source = Some(kind);
            st.status_message = format!("Monitoring using {}", kind.describe());
        });

        Some(Session { kind, source, ticker })
    }

    async fn run_cycle(&self, source: &dyn PostSource) {
        self.status.send_modify(|st| {
            st.cycle_in_progress = true;
            st.status_message = "Checking for new posts...".into();
        });
        let outcome = self.cycle.run(source).await;
        info!(target: "status", "{}", outcome.status_line());
        self.status.send_modify(|st| st.apply(&outcome));
    }

    fn set_message(&self, message: String) {
        self.status.send_modify(|st| st.status_message = message);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
