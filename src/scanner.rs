//! Output classification
//!
//! Two independent scanners run over every process output chunk: one
//! extracts the DevTools URL, the other (web-in-tab sessions only) the
//! local web app URL. Line-oriented pattern matching; no parser.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::{Host, Url};

/// URL-shaped substrings inside process output
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s'"]+"#).expect("invalid URL regex"));

/// Validate a candidate substring: must parse as an absolute http/https
/// URL. The canonicalized form is what gets stored.
fn validate_url(candidate: &str) -> Option<Url> {
    let url = Url::parse(candidate).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Loopback hosts accepted by the web-app scanner
fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr.is_loopback(),
        Some(Host::Ipv6(addr)) => addr.is_loopback(),
        None => false,
    }
}

/// What a scan pass observed
#[derive(Debug, Default, PartialEq)]
pub struct ScanOutcome {
    /// Set the first time a DevTools URL is accepted this session
    pub devtools_accepted: Option<Url>,
    /// Set at most once per session: the web app URL to preview
    pub open_preview: Option<Url>,
}

/// Incremental scanner over one session's output stream.
///
/// Accepted URLs latch until the scanner is replaced on session teardown.
#[derive(Debug)]
pub struct OutputScanner {
    devtools_url: Option<Url>,
    web_app_url: Option<Url>,
    /// One-shot guard: the preview side effect fires at most once
    preview_fired: bool,
    /// Web-app scanning is active only for web-targeted, tab-opening runs
    watch_web_app: bool,
}

impl OutputScanner {
    pub fn new(watch_web_app: bool) -> Self {
        Self {
            devtools_url: None,
            web_app_url: None,
            preview_fired: false,
            watch_web_app,
        }
    }

    /// Scanner for an idle controller; scans nothing of consequence
    pub fn idle() -> Self {
        Self::new(false)
    }

    pub fn devtools_url(&self) -> Option<&Url> {
        self.devtools_url.as_ref()
    }

    pub fn web_app_url(&self) -> Option<&Url> {
        self.web_app_url.as_ref()
    }

    /// Run both scanners over an output chunk
    pub fn scan_chunk(&mut self, chunk: &str) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        if self.devtools_url.is_none() {
            outcome.devtools_accepted = self.scan_devtools(chunk);
        }
        if self.watch_web_app && !self.preview_fired {
            outcome.open_preview = self.scan_web_app(chunk);
        }

        outcome
    }

    /// A line matches only if it mentions "devtools" case-insensitively AND
    /// carries an http/https URL; the first URL substring on that line wins.
    fn scan_devtools(&mut self, chunk: &str) -> Option<Url> {
        for line in chunk.lines() {
            if !line.to_lowercase().contains("devtools") {
                continue;
            }
            let Some(candidate) = URL_RE.find(line) else {
                continue;
            };
            if let Some(url) = validate_url(candidate.as_str()) {
                debug!("DevTools URL detected: {}", url);
                self.devtools_url = Some(url.clone());
                return Some(url);
            }
        }
        None
    }

    /// Scan the whole chunk for the first loopback URL; fire the one-shot
    /// preview on first acceptance.
    fn scan_web_app(&mut self, chunk: &str) -> Option<Url> {
        for found in URL_RE.find_iter(chunk) {
            let Some(url) = validate_url(found.as_str()) else {
                continue;
            };
            if !is_loopback(&url) {
                continue;
            }
            debug!("Web app URL detected: {}", url);
            self.web_app_url = Some(url.clone());
            self.preview_fired = true;
            return Some(url);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devtools_line_accepted_and_canonicalized() {
        let mut scanner = OutputScanner::new(false);
        let outcome = scanner
            .scan_chunk("Flutter DevTools debugger at: http://127.0.0.1:9100?uri=ws://x\n");

        let url = outcome.devtools_accepted.expect("URL should be accepted");
        // url canonicalization inserts the root path
        assert_eq!(url.as_str(), "http://127.0.0.1:9100/?uri=ws://x");
        assert!(scanner.devtools_url().is_some());
    }

    #[test]
    fn test_url_without_devtools_marker_ignored() {
        let mut scanner = OutputScanner::new(false);
        let outcome = scanner.scan_chunk("Serving app at http://127.0.0.1:8080\n");
        assert_eq!(outcome.devtools_accepted, None);
        assert!(scanner.devtools_url().is_none());
    }

    #[test]
    fn test_devtools_marker_without_url_ignored() {
        let mut scanner = OutputScanner::new(false);
        let outcome = scanner.scan_chunk("Launching DevTools...\n");
        assert_eq!(outcome.devtools_accepted, None);
    }

    #[test]
    fn test_devtools_url_latches_until_teardown() {
        let mut scanner = OutputScanner::new(false);
        scanner.scan_chunk("DevTools at http://127.0.0.1:9100\n");
        let first = scanner.devtools_url().cloned();

        // A later URL never replaces the accepted one
        let outcome = scanner.scan_chunk("DevTools at http://127.0.0.1:9999\n");
        assert_eq!(outcome.devtools_accepted, None);
        assert_eq!(scanner.devtools_url().cloned(), first);
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert_eq!(validate_url("ftp://127.0.0.1/x"), None);
        assert_eq!(validate_url("ws://127.0.0.1/x"), None);
        assert!(validate_url("https://127.0.0.1/x").is_some());
    }

    #[test]
    fn test_web_app_scanner_inactive_for_non_tab_sessions() {
        let mut scanner = OutputScanner::new(false);
        let outcome = scanner.scan_chunk("App at http://localhost:8080\n");
        assert_eq!(outcome.open_preview, None);
    }

    #[test]
    fn test_web_app_preview_fires_once_across_chunks() {
        let mut scanner = OutputScanner::new(true);

        let first = scanner.scan_chunk("lib served at http://127.0.0.1:8080\n");
        assert!(first.open_preview.is_some());

        let second = scanner.scan_chunk("also at http://localhost:8081\n");
        assert_eq!(second.open_preview, None);

        let third = scanner.scan_chunk("and http://127.0.0.1:8082\n");
        assert_eq!(third.open_preview, None);
    }

    #[test]
    fn test_web_app_scanner_rejects_non_loopback() {
        let mut scanner = OutputScanner::new(true);
        let outcome = scanner.scan_chunk("docs at http://example.com/page\n");
        assert_eq!(outcome.open_preview, None);
        assert!(scanner.web_app_url().is_none());

        // A later loopback URL is still eligible
        let outcome = scanner.scan_chunk("app at http://localhost:9000\n");
        assert!(outcome.open_preview.is_some());
    }

    #[test]
    fn test_web_app_scanner_accepts_ipv6_loopback() {
        let mut scanner = OutputScanner::new(true);
        let outcome = scanner.scan_chunk("app at http://[::1]:8080/\n");
        assert!(outcome.open_preview.is_some());
    }
}
