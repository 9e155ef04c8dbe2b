//! Single-threaded event loop
//!
//! All mutation of session state happens here, reacting to host-delivered
//! events: user commands, process output/exit, file saves, and the periodic
//! status tick. No operation blocks the loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant};

use crate::events::{ProcessEvent, ReloadTrigger};
use crate::prelude::*;
use crate::session::RunController;
use crate::watcher::SaveEvent;

/// Fixed period of the status re-derivation tick
pub const STATUS_REFRESH_INTERVAL: Duration = Duration::from_secs(4);

/// Quiescence window coalescing save-triggered reloads
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

/// A user action delivered by the host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// Run, or hot-restart when a session is already active
    Run,
    /// Run the web target in a browser tab
    RunWebTab,
    Stop,
    HotReload,
    HotRestart,
    OpenDevTools,
    Quit,
}

/// Drives the run controller from the event sources
pub struct Supervisor {
    controller: RunController,
    events_rx: mpsc::Receiver<ProcessEvent>,
    saves_rx: mpsc::Receiver<SaveEvent>,
    commands_rx: mpsc::Receiver<UserCommand>,
}

impl Supervisor {
    pub fn new(
        controller: RunController,
        events_rx: mpsc::Receiver<ProcessEvent>,
        saves_rx: mpsc::Receiver<SaveEvent>,
        commands_rx: mpsc::Receiver<UserCommand>,
    ) -> Self {
        Self {
            controller,
            events_rx,
            saves_rx,
            commands_rx,
        }
    }

    pub fn controller_mut(&mut self) -> &mut RunController {
        &mut self.controller
    }

    /// Run until a quit command or until every command source closes
    pub async fn run_loop(&mut self) {
        let mut status_tick = interval(STATUS_REFRESH_INTERVAL);
        // A pending save-reload deadline; reset, not stacked, on each save
        let mut reload_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => {
                    let Some(command) = command else { break };
                    if self.handle_command(command).await {
                        break;
                    }
                }

                event = self.events_rx.recv() => {
                    if let Some(event) = event {
                        self.controller.on_process_event(event).await;
                    }
                }

                save = self.saves_rx.recv() => {
                    if save.is_some() && self.should_reload_on_save() {
                        debug!("Save observed, (re)arming reload debounce");
                        reload_deadline = Some(Instant::now() + RELOAD_DEBOUNCE);
                    }
                }

                _ = maybe_sleep_until(reload_deadline), if reload_deadline.is_some() => {
                    reload_deadline = None;
                    self.controller.hot_reload(ReloadTrigger::Save).await;
                }

                _ = status_tick.tick() => {
                    // Compensates for state changes the loop cannot observe
                    // directly (device selection changing elsewhere)
                    self.controller.refresh_status();
                }
            }
        }

        info!("Supervisor loop finished");
        self.controller.stop();
    }

    fn should_reload_on_save(&self) -> bool {
        self.controller.is_session_active() && self.controller.store().hot_reload_on_save()
    }

    /// Returns true when the loop should exit
    async fn handle_command(&mut self, command: UserCommand) -> bool {
        match command {
            UserCommand::Run => self.controller.run().await,
            UserCommand::RunWebTab => self.controller.start(true).await,
            UserCommand::Stop => self.controller.stop(),
            UserCommand::HotReload => self.controller.hot_reload(ReloadTrigger::Manual).await,
            UserCommand::HotRestart => self.controller.hot_restart(ReloadTrigger::Manual).await,
            UserCommand::OpenDevTools => self.controller.open_devtools(),
            UserCommand::Quit => return true,
        }
        self.controller.refresh_status();
        false
    }
}

/// Sleep until the deadline; pends forever when there is none.
///
/// Paired with the `if deadline.is_some()` select guard, this keeps the
/// branch inert while no reload is pending.
async fn maybe_sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
