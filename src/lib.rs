//! Flutter Pilot - supervises a `flutter run` subprocess
//!
//! The core is the run-session lifecycle controller: resolve a target
//! project and device, spawn `flutter run`, classify its output stream for
//! DevTools/web-app URLs, and project process state onto status indicators
//! and context flags. Controls: run, stop, hot reload, hot restart, profile
//! selection, DevTools access, web-in-tab preview.

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod prelude;
pub mod project;
pub mod scanner;
pub mod session;
pub mod status;
pub mod supervisor;
pub mod watcher;

pub use config::{ProfileStore, RunProfile};
pub use error::{Error, Result};
pub use session::{build_run_args, RunController};
pub use supervisor::{Supervisor, UserCommand};
