//! Process lifecycle events and reload triggers

/// Event emitted by the spawned `flutter run` process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// A line of standard output
    Stdout(String),
    /// A line of standard error
    Stderr(String),
    /// The process exited, with its exit code when known
    Exited { code: Option<i32> },
}

/// What caused a hot reload / hot restart request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// Explicit user action (toolbar button, key press)
    Manual,
    /// Debounced file-save notification
    Save,
    /// A repeated run request while a session is active
    Rerun,
}

impl ReloadTrigger {
    /// Only manual triggers surface a warning when no session is live
    pub fn is_manual(&self) -> bool {
        matches!(self, ReloadTrigger::Manual)
    }
}

impl std::fmt::Display for ReloadTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadTrigger::Manual => write!(f, "manual"),
            ReloadTrigger::Save => write!(f, "save"),
            ReloadTrigger::Rerun => write!(f, "rerun"),
        }
    }
}
