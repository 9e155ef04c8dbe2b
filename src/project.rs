//! Flutter project resolution
//!
//! Resolves which on-disk folder is "the" Flutter project for the current
//! workspace: direct workspace roots, the monorepo `apps/<name>` convention,
//! or a recursive `pubspec.yaml` search. Detection pattern-matches the
//! manifest text; it does not parse YAML structurally.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Manifest file that marks a Dart/Flutter package root
pub const MANIFEST_FILENAME: &str = "pubspec.yaml";

/// How long a resolution (positive or negative) stays cached
pub const RESOLUTION_CACHE_TTL: Duration = Duration::from_secs(5);

/// Maximum number of manifest files the recursive search will inspect
const MAX_MANIFEST_SCAN: usize = 50;

/// Directories to skip during the recursive manifest search
const SKIP_DIRECTORIES: &[&str] = &[
    "node_modules",
    "build",
    ".dart_tool",
    ".git",
    ".idea",
    ".vscode",
    "Pods",
    ".gradle",
    "__pycache__",
    "target",
    ".pub-cache",
    ".pub",
];

/// Top-level `flutter:` section at the start of a line
static TOP_LEVEL_FLUTTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^flutter:").expect("invalid top-level flutter regex"));

/// Inline-brace SDK dependency: `flutter: {sdk: flutter}` (also flutter_web_plugins)
static SDK_DEP_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s+flutter(?:_web_plugins)?\s*:\s*\{[^}]*sdk\s*:\s*flutter")
        .expect("invalid inline sdk dependency regex")
});

/// Block-form SDK dependency:
/// ```yaml
///   flutter:
///     sdk: flutter
/// ```
static SDK_DEP_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s+flutter(?:_web_plugins)?\s*:\s*\r?\n\s+sdk\s*:\s*flutter")
        .expect("invalid block sdk dependency regex")
});

/// Check if manifest text declares a Flutter dependency.
///
/// Matches a top-level `flutter:` section, or a `flutter` /
/// `flutter_web_plugins` dependency entry sourced from the SDK, in either
/// inline-brace or indented-block form.
pub fn is_flutter_manifest(content: &str) -> bool {
    TOP_LEVEL_FLUTTER_RE.is_match(content)
        || SDK_DEP_INLINE_RE.is_match(content)
        || SDK_DEP_BLOCK_RE.is_match(content)
}

/// Check if a directory contains a Flutter manifest
pub fn is_flutter_project_dir(path: &Path) -> bool {
    let manifest = path.join(MANIFEST_FILENAME);
    match fs::read_to_string(&manifest) {
        Ok(content) => is_flutter_manifest(&content),
        Err(_) => false,
    }
}

/// Resolves the active Flutter project folder with a short-lived cache
#[derive(Debug, Default)]
pub struct ProjectResolver {
    cache: Option<CachedResolution>,
}

#[derive(Debug)]
struct CachedResolution {
    key: String,
    folder: Option<PathBuf>,
    resolved_at: Instant,
}

impl ProjectResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the intended Flutter project folder, or `None`.
    ///
    /// A cache hit (keyed by the workspace roots and the active file, 5 s
    /// TTL) short-circuits the whole algorithm, including negative results.
    pub fn resolve(&mut self, roots: &[PathBuf], active_file: Option<&Path>) -> Option<PathBuf> {
        let key = cache_key(roots, active_file);

        if let Some(cached) = &self.cache {
            if cached.key == key && cached.resolved_at.elapsed() < RESOLUTION_CACHE_TTL {
                trace!("Project resolution cache hit: {:?}", cached.folder);
                return cached.folder.clone();
            }
        }

        let folder = resolve_uncached(roots, active_file);
        debug!("Resolved Flutter project: {:?}", folder);

        self.cache = Some(CachedResolution {
            key,
            folder: folder.clone(),
            resolved_at: Instant::now(),
        });
        folder
    }

    /// Drop any cached resolution
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

fn cache_key(roots: &[PathBuf], active_file: Option<&Path>) -> String {
    let mut key = String::new();
    for root in roots {
        key.push_str(&root.to_string_lossy());
        key.push(';');
    }
    key.push('|');
    if let Some(file) = active_file {
        key.push_str(&file.to_string_lossy());
    }
    key
}

/// The resolution algorithm, strict priority order, first match wins:
/// 1. `apps/<name>` children of each workspace root, lexicographic order
/// 2. The workspace roots themselves, active-file affinity ordered
/// 3. A recursive manifest search, deduped, same affinity ordering
fn resolve_uncached(roots: &[PathBuf], active_file: Option<&Path>) -> Option<PathBuf> {
    // 1. Monorepo convention: <root>/apps/<name>
    for root in roots {
        let apps = root.join("apps");
        if !apps.is_dir() {
            continue;
        }
        let mut children: Vec<PathBuf> = fs::read_dir(&apps)
            .into_iter()
            .flatten()
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        for child in children {
            if is_flutter_project_dir(&child) {
                return Some(child);
            }
        }
    }

    // 2. Workspace roots directly, roots containing the active file first
    let mut ordered_roots: Vec<PathBuf> = roots.to_vec();
    sort_by_active_file_affinity(&mut ordered_roots, active_file);
    for root in &ordered_roots {
        if is_flutter_project_dir(root) {
            return Some(root.clone());
        }
    }

    // 3. Recursive manifest search under each root
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut scanned = 0usize;
    for root in roots {
        collect_manifest_dirs(root, &mut candidates, &mut scanned);
    }
    candidates.dedup();
    sort_by_active_file_affinity(&mut candidates, active_file);
    candidates.into_iter().find(|dir| is_flutter_project_dir(dir))
}

/// Order paths so that any path which is an ancestor of (or equal to) the
/// active file sorts first, longer matching ancestor winning ties. The sort
/// is stable, so non-ancestors keep their original relative order.
fn sort_by_active_file_affinity(paths: &mut [PathBuf], active_file: Option<&Path>) {
    let Some(file) = active_file else {
        return;
    };
    paths.sort_by_key(|path| {
        let depth = if file.starts_with(path) {
            path.components().count()
        } else {
            0
        };
        std::cmp::Reverse(depth)
    });
}

/// Collect directories containing a manifest file, up to the scan cap
fn collect_manifest_dirs(dir: &Path, out: &mut Vec<PathBuf>, scanned: &mut usize) {
    if *scanned >= MAX_MANIFEST_SCAN {
        return;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            trace!("Cannot read directory {:?}: {}", dir, err);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        if path.is_file() {
            if path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILENAME) {
                *scanned += 1;
                if let Some(parent) = path.parent() {
                    out.push(parent.to_path_buf());
                }
                if *scanned >= MAX_MANIFEST_SCAN {
                    return;
                }
            }
            continue;
        }

        if !path.is_dir() {
            continue;
        }

        let dir_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };

        if dir_name.starts_with('.') || SKIP_DIRECTORIES.contains(&dir_name) {
            trace!("Skipping excluded directory: {:?}", path);
            continue;
        }

        collect_manifest_dirs(&path, out, scanned);
    }
}
