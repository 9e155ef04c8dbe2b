//! The collaborating editor surface
//!
//! Everything user-visible is delegated through [`EditorHost`]: messages,
//! the output log sink, URL opening, device providers, and context flags.
//! The supervisor binary plugs in a console implementation; tests use a
//! recording double.

use std::sync::Mutex;
use url::Url;

use crate::status::ContextFlag;

/// Host surface the run controller communicates through.
///
/// No method returns an error: failures in the host are the host's problem,
/// never the controller's.
pub trait EditorHost: Send + Sync {
    /// Blocking user-facing error message
    fn show_error(&self, message: &str);

    /// Non-blocking warning
    fn show_warning(&self, message: &str);

    /// Append a chunk of process output to the log sink
    fn append_output(&self, chunk: &str);

    /// Show a URL inside the editor, optionally beside the current view
    fn open_url(&self, url: &Url, beside: bool);

    /// Open DevTools via the dedicated provider (no URL known yet)
    fn open_devtools_fallback(&self);

    /// Guided follow-up when no device is selected
    fn prompt_device_selection(&self);

    /// Primary selected-device provider
    fn selected_device(&self) -> Option<String>;

    /// Secondary selected-device provider
    fn selected_device_fallback(&self) -> Option<String>;

    /// Publish a context flag for the editor surface to honor
    fn set_context_flag(&self, flag: ContextFlag, value: bool);
}

/// Console-backed host used by the `fpilot` binary
pub struct ConsoleHost {
    /// Device id handed over on the command line, if any
    device: Mutex<Option<String>>,
}

impl ConsoleHost {
    pub fn new(device: Option<String>) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }

    pub fn set_device(&self, device: Option<String>) {
        *self.device.lock().expect("device lock poisoned") = device;
    }
}

impl EditorHost for ConsoleHost {
    fn show_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn show_warning(&self, message: &str) {
        eprintln!("warning: {}", message);
    }

    fn append_output(&self, chunk: &str) {
        println!("{}", chunk);
    }

    fn open_url(&self, url: &Url, beside: bool) {
        if beside {
            println!("→ preview: {}", url);
        } else {
            println!("→ open: {}", url);
        }
    }

    fn open_devtools_fallback(&self) {
        eprintln!("warning: no DevTools URL seen yet; start a debug session first");
    }

    fn prompt_device_selection(&self) {
        eprintln!("hint: pass a device with --device <id> (e.g. --device chrome)");
    }

    fn selected_device(&self) -> Option<String> {
        self.device
            .lock()
            .expect("device lock poisoned")
            .clone()
            .filter(|id| !id.trim().is_empty())
    }

    fn selected_device_fallback(&self) -> Option<String> {
        None
    }

    fn set_context_flag(&self, flag: ContextFlag, value: bool) {
        tracing::debug!("context {} = {}", flag.key(), value);
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording host double for controller and scanner tests

    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    pub struct Recorded {
        pub errors: Vec<String>,
        pub warnings: Vec<String>,
        pub output: Vec<String>,
        pub opened_urls: Vec<(Url, bool)>,
        pub devtools_fallbacks: usize,
        pub device_prompts: usize,
        pub flags: HashMap<&'static str, bool>,
    }

    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub device: Option<String>,
        pub device_fallback: Option<String>,
        recorded: Mutex<Recorded>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_device(device: &str) -> Self {
            Self {
                device: Some(device.to_string()),
                ..Self::default()
            }
        }

        pub fn with_fallback_device(device: &str) -> Self {
            Self {
                device_fallback: Some(device.to_string()),
                ..Self::default()
            }
        }

        pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
            self.recorded.lock().expect("recorded lock poisoned")
        }
    }

    impl EditorHost for RecordingHost {
        fn show_error(&self, message: &str) {
            self.recorded().errors.push(message.to_string());
        }

        fn show_warning(&self, message: &str) {
            self.recorded().warnings.push(message.to_string());
        }

        fn append_output(&self, chunk: &str) {
            self.recorded().output.push(chunk.to_string());
        }

        fn open_url(&self, url: &Url, beside: bool) {
            self.recorded().opened_urls.push((url.clone(), beside));
        }

        fn open_devtools_fallback(&self) {
            self.recorded().devtools_fallbacks += 1;
        }

        fn prompt_device_selection(&self) {
            self.recorded().device_prompts += 1;
        }

        fn selected_device(&self) -> Option<String> {
            self.device.clone()
        }

        fn selected_device_fallback(&self) -> Option<String> {
            self.device_fallback.clone()
        }

        fn set_context_flag(&self, flag: ContextFlag, value: bool) {
            self.recorded().flags.insert(flag.key(), value);
        }
    }
}
