//! Status projection
//!
//! Derives every visible UI affordance purely from current state. Nothing
//! here mutates anything; the supervisor re-runs the projection on each
//! state change and on the periodic refresh tick.

/// Context flags pushed to the collaborating editor surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextFlag {
    IsFlutterProject,
    HasDevice,
    HasWebDevice,
    IsRunning,
    IsStarting,
    HasDevToolsUrl,
}

impl ContextFlag {
    pub fn key(&self) -> &'static str {
        match self {
            ContextFlag::IsFlutterProject => "is_flutter_project",
            ContextFlag::HasDevice => "has_device",
            ContextFlag::HasWebDevice => "has_web_device",
            ContextFlag::IsRunning => "is_running",
            ContextFlag::IsStarting => "is_starting",
            ContextFlag::HasDevToolsUrl => "has_devtools_url",
        }
    }
}

/// The observable state the projection is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusInputs {
    pub is_flutter_project: bool,
    pub has_device: bool,
    pub has_web_device: bool,
    pub is_running: bool,
    pub is_starting: bool,
    pub has_devtools_url: bool,
}

/// Derived toolbar view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    /// Label of the primary run button
    pub run_label: &'static str,
    pub run_enabled: bool,
    pub stop_visible: bool,
    pub reload_enabled: bool,
    pub restart_enabled: bool,
    pub devtools_enabled: bool,
    /// "Run in browser tab" affordance, shown only for web-class devices
    pub web_tab_visible: bool,
}

/// Pure function from state to view
pub fn project_status(inputs: StatusInputs) -> StatusView {
    if !inputs.is_flutter_project {
        return StatusView {
            run_label: "Run",
            run_enabled: false,
            stop_visible: false,
            reload_enabled: false,
            restart_enabled: false,
            devtools_enabled: false,
            web_tab_visible: false,
        };
    }

    let session_active = inputs.is_running;
    StatusView {
        run_label: if inputs.is_starting {
            "Starting…"
        } else if session_active {
            "Restart"
        } else {
            "Run"
        },
        run_enabled: !inputs.is_starting && (session_active || inputs.has_device),
        stop_visible: session_active || inputs.is_starting,
        reload_enabled: session_active,
        restart_enabled: session_active,
        devtools_enabled: session_active && inputs.has_devtools_url,
        web_tab_visible: inputs.has_web_device && !session_active && !inputs.is_starting,
    }
}
