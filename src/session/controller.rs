//! Run session lifecycle controller
//!
//! Owns the single external process instance and all session-scoped state.
//! Public operations never propagate errors: every failure path is handled
//! where it is detected and communicated through the host surface and the
//! log, per the session's error taxonomy.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{ProfileStore, RunProfile};
use crate::device::{effective_device_id, is_web_device, resolve_selected_device};
use crate::events::{ProcessEvent, ReloadTrigger};
use crate::host::EditorHost;
use crate::prelude::*;
use crate::project::ProjectResolver;
use crate::scanner::OutputScanner;
use crate::session::process::RunProcess;
use crate::status::{project_status, ContextFlag, StatusInputs, StatusView};

/// Hot reload directive written to the process input stream
const RELOAD_DIRECTIVE: &str = "r";
/// Hot restart directive
const RESTART_DIRECTIVE: &str = "R";

/// Build the `flutter run` argument list.
///
/// Pure function of (entrypoint, device id, flavor); flag order is always
/// `-t` before `-d` before `--flavor`, and `--flavor` is omitted when the
/// flavor is empty.
pub fn build_run_args(entrypoint: &str, device_id: &str, flavor: &str) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-t".to_string(),
        entrypoint.to_string(),
        "-d".to_string(),
        device_id.to_string(),
    ];
    if !flavor.is_empty() {
        args.push("--flavor".to_string());
        args.push(flavor.to_string());
    }
    args
}

/// Controls the lifecycle of at most one `flutter run` session
pub struct RunController {
    host: Arc<dyn EditorHost>,
    store: ProfileStore,
    resolver: ProjectResolver,
    /// Workspace root folders considered by the resolver
    roots: Vec<PathBuf>,
    /// Active editor file, if any, for resolver affinity ordering
    active_file: Option<PathBuf>,
    /// Channel the spawned process reports into
    event_tx: mpsc::Sender<ProcessEvent>,

    // Session-scoped state, reset atomically by `teardown`
    process: Option<RunProcess>,
    starting: bool,
    running: bool,
    /// The live session targets a web-class device
    web_target: bool,
    scanner: OutputScanner,
    selected_device: Option<String>,
}

impl RunController {
    pub fn new(
        host: Arc<dyn EditorHost>,
        store: ProfileStore,
        roots: Vec<PathBuf>,
        event_tx: mpsc::Sender<ProcessEvent>,
    ) -> Self {
        Self {
            host,
            store,
            resolver: ProjectResolver::new(),
            roots,
            active_file: None,
            event_tx,
            process: None,
            starting: false,
            running: false,
            web_target: false,
            scanner: OutputScanner::idle(),
            selected_device: None,
        }
    }

    pub fn set_active_file(&mut self, file: Option<PathBuf>) {
        self.active_file = file;
    }

    pub fn is_session_active(&self) -> bool {
        self.process.is_some()
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// The conventional "run" entry point: a repeated run request while a
    /// session is active is redefined as a hot restart, never a second
    /// spawn.
    pub async fn run(&mut self) {
        if self.is_session_active() {
            self.hot_restart(ReloadTrigger::Rerun).await;
        } else {
            self.start(false).await;
        }
    }

    /// Start a run session.
    ///
    /// `force_web_tab` requests the web-in-tab flow: the selected device
    /// must be web-class, and the spawn substitutes the web-server device.
    pub async fn start(&mut self, force_web_tab: bool) {
        if self.starting {
            self.host.show_warning("A run is already starting");
            return;
        }
        if force_web_tab && self.is_session_active() {
            self.host
                .show_warning("Stop the current session before opening a new tab");
            return;
        }

        // Guards concurrent start requests across the awaits below
        self.starting = true;
        self.push_context_flags();

        let Some(project) = self
            .resolver
            .resolve(&self.roots, self.active_file.as_deref())
        else {
            self.host
                .show_warning("No Flutter project found in the workspace");
            self.starting = false;
            self.push_context_flags();
            return;
        };

        let profile = match self.store.active() {
            Ok(profile) => profile,
            Err(err) => {
                warn!("No usable run profile: {}", err);
                self.host.show_warning("No run profiles configured");
                self.starting = false;
                self.push_context_flags();
                return;
            }
        };

        let config = self.store.load().unwrap_or_default();
        let Some(selected) = resolve_selected_device(self.host.as_ref(), &config) else {
            self.host.show_warning("No device selected");
            self.host.prompt_device_selection();
            self.starting = false;
            self.push_context_flags();
            return;
        };

        if force_web_tab && !is_web_device(&selected) {
            self.host
                .show_warning("Running in a tab requires a web device (chrome, edge, web-server)");
            self.starting = false;
            self.push_context_flags();
            return;
        }

        let device_id = effective_device_id(&selected, force_web_tab);
        let args = build_run_args(profile.entrypoint(), &device_id, profile.flavor());

        info!(
            "Starting session: profile={} device={} project={}",
            profile.name,
            device_id,
            project.display()
        );

        match RunProcess::spawn(&project, &args, self.event_tx.clone()) {
            Ok(process) => {
                let web = is_web_device(&selected);
                self.process = Some(process);
                self.starting = false;
                self.running = true;
                self.web_target = web;
                self.scanner = OutputScanner::new(web && force_web_tab);
                self.selected_device = Some(selected);
                self.push_context_flags();
            }
            Err(err) => {
                error!("Failed to spawn Flutter: {}", err);
                self.host.append_output(&format!("[spawn failed: {}]", err));
                self.host.show_error(
                    "Failed to launch 'flutter'. Is the Flutter SDK on your PATH?",
                );
                self.teardown();
            }
        }
    }

    /// Stop the session. Idempotent: resets all session flags regardless of
    /// whether a process existed.
    pub fn stop(&mut self) {
        if let Some(mut process) = self.process.take() {
            info!("Stopping Flutter process (pid {:?})", process.id());
            process.kill();
        }
        self.teardown();
    }

    /// Write the hot reload directive to the live process
    pub async fn hot_reload(&mut self, trigger: ReloadTrigger) {
        self.send_directive(RELOAD_DIRECTIVE, "hot reload", trigger)
            .await;
    }

    /// Write the hot restart directive to the live process
    pub async fn hot_restart(&mut self, trigger: ReloadTrigger) {
        self.send_directive(RESTART_DIRECTIVE, "hot restart", trigger)
            .await;
    }

    async fn send_directive(&mut self, directive: &str, action: &str, trigger: ReloadTrigger) {
        let Some(process) = &self.process else {
            if trigger.is_manual() {
                self.host
                    .show_warning(&format!("No running session to {}", action));
            }
            return;
        };

        match process.send(directive).await {
            Ok(()) => info!("{} requested ({} trigger)", action, trigger),
            Err(err) => {
                warn!("{} failed: {}", action, err);
                if trigger.is_manual() {
                    self.host
                        .show_warning(&format!("Session input stream unusable; cannot {}", action));
                }
            }
        }
    }

    /// Open DevTools: the known URL when the classifier has seen one,
    /// otherwise the host's dedicated provider.
    pub fn open_devtools(&self) {
        match self.scanner.devtools_url() {
            Some(url) => self.host.open_url(url, false),
            None => self.host.open_devtools_fallback(),
        }
    }

    /// React to an event from the spawned process
    pub async fn on_process_event(&mut self, event: ProcessEvent) {
        match event {
            ProcessEvent::Stdout(line) | ProcessEvent::Stderr(line) => {
                self.host.append_output(&line);

                let outcome = self.scanner.scan_chunk(&line);
                if outcome.devtools_accepted.is_some() {
                    self.push_context_flags();
                }
                if let Some(url) = outcome.open_preview {
                    info!("Opening web preview: {}", url);
                    self.host.open_url(&url, true);
                }
            }
            ProcessEvent::Exited { code } => {
                info!("Flutter process exited with code {:?}", code);
                self.host
                    .append_output(&format!("[process exited with code {:?}]", code));
                self.process = None;
                self.teardown();
            }
        }
    }

    /// Reset all session-scoped state and republish context flags
    fn teardown(&mut self) {
        self.process = None;
        self.starting = false;
        self.running = false;
        self.web_target = false;
        self.scanner = OutputScanner::idle();
        self.selected_device = None;
        self.push_context_flags();
    }

    /// Current observable state, the status projection input
    pub fn status_inputs(&mut self) -> StatusInputs {
        let is_project = self
            .resolver
            .resolve(&self.roots, self.active_file.as_deref())
            .is_some();
        let config = self.store.load().unwrap_or_default();
        let device = self
            .selected_device
            .clone()
            .or_else(|| resolve_selected_device(self.host.as_ref(), &config));

        // While a session is live, its target class is authoritative
        let has_web_device = if self.is_session_active() {
            self.web_target
        } else {
            device.as_deref().map(is_web_device).unwrap_or(false)
        };

        StatusInputs {
            is_flutter_project: is_project,
            has_device: device.is_some(),
            has_web_device,
            is_running: self.running,
            is_starting: self.starting,
            has_devtools_url: self.scanner.devtools_url().is_some(),
        }
    }

    /// Re-derive the toolbar view; called on state changes and on the
    /// periodic refresh tick.
    pub fn refresh_status(&mut self) -> StatusView {
        let inputs = self.status_inputs();
        self.publish_flags(inputs);
        project_status(inputs)
    }

    /// Push only the session flags the controller owns directly.
    ///
    /// Avoids re-running project resolution on every transition; the
    /// periodic refresh covers externally-observed state.
    fn push_context_flags(&self) {
        self.host
            .set_context_flag(ContextFlag::IsRunning, self.running);
        self.host
            .set_context_flag(ContextFlag::IsStarting, self.starting);
        self.host.set_context_flag(
            ContextFlag::HasDevToolsUrl,
            self.scanner.devtools_url().is_some(),
        );
    }

    fn publish_flags(&self, inputs: StatusInputs) {
        let host = self.host.as_ref();
        host.set_context_flag(ContextFlag::IsFlutterProject, inputs.is_flutter_project);
        host.set_context_flag(ContextFlag::HasDevice, inputs.has_device);
        host.set_context_flag(ContextFlag::HasWebDevice, inputs.has_web_device);
        host.set_context_flag(ContextFlag::IsRunning, inputs.is_running);
        host.set_context_flag(ContextFlag::IsStarting, inputs.is_starting);
        host.set_context_flag(ContextFlag::HasDevToolsUrl, inputs.has_devtools_url);
    }

    /// Active profile helper for the UI layer
    pub fn active_profile(&self) -> Option<RunProfile> {
        self.store.active().ok()
    }
}
