//! Centralized path conventions.
//!
//! Every stage agrees on where things live through this module:
//!
//! ```text
//! <root>/
//! ├── src/                         # Flattened root
//! │   └── campaigns/spring.mjml    # → dist/spring.html
//! ├── promo/launch.mjml            # → dist/promo/launch.html
//! ├── dist/                        # Compiled HTML
//! └── exports/
//!     ├── html/                    # Generic HTML export
//!     ├── outlook/                 # .oft / .emltpl / -outlook.html
//!     └── archives/                # <project>-<date>-<group>.tar.gz
//! ```
//!
//! ## Output Paths
//!
//! Templates under the source root lose their directory structure and land
//! directly in the output root by base name. Everything else keeps its
//! relative path. The extension always becomes `.html`:
//! - `src/welcome.mjml` → `dist/welcome.html`
//! - `src/campaigns/spring.mjml` → `dist/spring.html`
//! - `promo/launch.mjml` → `dist/promo/launch.html`
//! - `digest.mjml` → `dist/digest.html`

use crate::config::ProjectConfig;
use std::path::{Path, PathBuf};

/// Resolved project directories, all absolute or relative to the same root.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub output: PathBuf,
    pub exports: PathBuf,
    pub components: PathBuf,
}

impl Layout {
    pub fn new(root: &Path, config: &ProjectConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            source_root: root.join(&config.paths.source_root),
            output: root.join(&config.paths.output),
            exports: root.join(&config.paths.exports),
            components: root.join(&config.paths.components),
        }
    }

    /// `exports/<client>/`
    pub fn client_dir(&self, client: &str) -> PathBuf {
        self.exports.join(client)
    }

    /// `exports/archives/`
    pub fn archives_dir(&self) -> PathBuf {
        self.exports.join("archives")
    }
}

/// Map a template path (relative to the project root) to its HTML output path.
///
/// `flatten_root` is the source root relative to the project root (`src`).
pub fn output_path(source_rel: &Path, flatten_root: &Path, output_root: &Path) -> PathBuf {
    if source_rel.starts_with(flatten_root) {
        let stem = source_rel.file_stem().unwrap_or_default();
        let mut name = stem.to_os_string();
        name.push(".html");
        output_root.join(name)
    } else {
        output_root.join(source_rel.with_extension("html"))
    }
}

/// Base name of a compiled document: `dist/promo/launch.html` → `launch`.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// `<project>-<date>` prefix shared by every archive of one run.
pub fn archive_stem(project: &str, date: &str) -> String {
    format!("{project}-{date}")
}

/// `<project>-<date>-<suffix>.tar.gz`
pub fn archive_file_name(stem: &str, suffix: &str) -> String {
    format!("{stem}-{suffix}.tar.gz")
}

/// `<project>-<date>-manifest.json`
pub fn manifest_file_name(stem: &str) -> String {
    format!("{stem}-manifest.json")
}

/// Render a path relative to `root` with `/` separators, for globs and display.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
