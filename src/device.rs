//! Device selection
//!
//! Device ids are opaque strings owned by the collaborating selector; this
//! module only classifies them and runs the fallback chain that resolves
//! the currently selected one.

use crate::config::ConfigFile;
use crate::host::EditorHost;

/// Device id substituted when a web-class device runs in a browser tab
pub const WEB_SERVER_DEVICE: &str = "web-server";

/// Known browser/web-server device ids.
///
/// A fixed allowlist plus the `web-` prefix. Inherently incomplete for
/// future device ids; treated as an approximation, not exhaustive.
const WEB_DEVICE_IDS: &[&str] = &["chrome", "edge", "web-server"];

/// Classify a device id as web-class
pub fn is_web_device(id: &str) -> bool {
    WEB_DEVICE_IDS.contains(&id) || id.starts_with("web-")
}

/// Resolve the currently selected device id.
///
/// Three-tier fallback, first non-empty wins: primary host provider,
/// secondary host provider, then the two configuration keys. A tier that
/// yields a blank id is skipped, not terminal.
pub fn resolve_selected_device(host: &dyn EditorHost, config: &ConfigFile) -> Option<String> {
    non_blank(host.selected_device())
        .or_else(|| non_blank(host.selected_device_fallback()))
        .or_else(|| non_blank(config.preferred_device.clone()))
        .or_else(|| non_blank(config.fallback_device.clone()))
}

fn non_blank(id: Option<String>) -> Option<String> {
    id.map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Effective device id for the spawn: web-in-tab substitutes the fixed
/// web-server id, everything else passes through verbatim.
pub fn effective_device_id(selected: &str, force_web_tab: bool) -> String {
    if force_web_tab && is_web_device(selected) {
        WEB_SERVER_DEVICE.to_string()
    } else {
        selected.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;

    #[test]
    fn test_web_device_classification() {
        assert!(is_web_device("chrome"));
        assert!(is_web_device("edge"));
        assert!(is_web_device("web-server"));
        assert!(is_web_device("web-javascript"));
        assert!(!is_web_device("emulator-5554"));
        assert!(!is_web_device("macos"));
    }

    #[test]
    fn test_fallback_chain_prefers_host_provider() {
        let host = RecordingHost::with_device("chrome");
        let config = ConfigFile {
            preferred_device: Some("emulator-5554".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(
            resolve_selected_device(&host, &config),
            Some("chrome".to_string())
        );
    }

    #[test]
    fn test_fallback_chain_reaches_config_keys() {
        let host = RecordingHost::new();
        let config = ConfigFile {
            fallback_device: Some("emulator-5554".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(
            resolve_selected_device(&host, &config),
            Some("emulator-5554".to_string())
        );
    }

    #[test]
    fn test_fallback_chain_secondary_provider_before_config() {
        let host = RecordingHost::with_fallback_device("macos");
        let config = ConfigFile {
            preferred_device: Some("chrome".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(
            resolve_selected_device(&host, &config),
            Some("macos".to_string())
        );
    }

    #[test]
    fn test_blank_tier_falls_through_to_later_tiers() {
        let host = RecordingHost::with_device("   ");
        let config = ConfigFile {
            fallback_device: Some("emulator-5554".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(
            resolve_selected_device(&host, &config),
            Some("emulator-5554".to_string())
        );
    }

    #[test]
    fn test_no_device_resolves_to_none() {
        let host = RecordingHost::new();
        assert_eq!(resolve_selected_device(&host, &ConfigFile::default()), None);
    }

    #[test]
    fn test_effective_device_substitutes_web_server_for_tab() {
        assert_eq!(effective_device_id("chrome", true), WEB_SERVER_DEVICE);
        assert_eq!(effective_device_id("chrome", false), "chrome");
        assert_eq!(effective_device_id("emulator-5554", true), "emulator-5554");
    }
}
