//! Project configuration module.
//!
//! Handles loading, validating, and merging `mailpress.toml`. The file is
//! optional: stock defaults describe the conventional project layout, and a
//! user file only needs the keys it wants to override.
//!
//! ## Config File Location
//!
//! ```text
//! newsletter/
//! ├── mailpress.toml           # Project config (overrides stock defaults)
//! ├── welcome.mjml             # Root template → dist/welcome.html
//! ├── components/              # Shared fragments (never compiled directly)
//! │   └── header.mjml
//! └── src/                     # Flattened root
//!     └── campaigns/
//!         └── spring.mjml      # → dist/spring.html
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! project_name = "newsletter"   # Prefix for archive file names
//!
//! [paths]
//! source_root = "src"           # Files under here flatten into the output root
//! output = "dist"
//! exports = "exports"
//! components = "components"
//! include = ["src/**/*.mjml", "*.mjml"]
//! exclude = ["**/components/**", "node_modules/**"]
//! ignored_dirs = ["node_modules"]
//!
//! [compiler]
//! command = "mjml"
//! args = []
//!
//! [html]
//! title = "Newsletter"
//!
//! [outlook]
//! web_fonts = ["Montserrat"]
//! fallback_fonts = "Arial, sans-serif"
//! vml_width = "600px"
//! column_classes = ["mj-column-per-60", "mj-column-per-40"]
//!
//! [[outlook.cell_classes]]
//! class = "article-inner"
//! styles = { "background-color" = "#E4E7DB" }
//!
//! [archive]
//! compression = 9
//! source_files = ["*.mjml", "package.json"]
//! extra_files = ["README.md"]
//!
//! [processing]
//! max_processes = 4             # Omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the project config file, looked up in the project root.
pub const CONFIG_FILENAME: &str = "mailpress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `mailpress.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Prefix for archive bundle names (`<project>-<date>-html.tar.gz`).
    pub project_name: String,
    /// Where sources live and where generated files go.
    pub paths: PathsConfig,
    /// External markup compiler invocation.
    pub compiler: CompilerConfig,
    /// Generic HTML export settings.
    pub html: HtmlConfig,
    /// Outlook rewrite settings.
    pub outlook: OutlookConfig,
    /// Archive bundle settings.
    pub archive: ArchiveConfig,
    /// Parallel compilation settings.
    pub processing: ProcessingConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: "newsletter".to_string(),
            paths: PathsConfig::default(),
            compiler: CompilerConfig::default(),
            html: HtmlConfig::default(),
            outlook: OutlookConfig::default(),
            archive: ArchiveConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty()
            || self.project_name.contains(['/', '\\'])
        {
            return Err(ConfigError::Validation(
                "project_name must be a non-empty file name".into(),
            ));
        }
        if self.archive.compression > 9 {
            return Err(ConfigError::Validation(
                "archive.compression must be 0-9".into(),
            ));
        }
        if self.paths.include.is_empty() {
            return Err(ConfigError::Validation(
                "paths.include must not be empty".into(),
            ));
        }
        if self.compiler.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "compiler.command must not be empty".into(),
            ));
        }
        let globs = self
            .paths
            .include
            .iter()
            .chain(&self.paths.exclude)
            .chain(&self.archive.source_files)
            .chain(&self.archive.extra_files);
        for pattern in globs {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::Validation(format!(
                    "invalid glob '{pattern}': {e}"
                )));
            }
        }
        for rule in &self.outlook.cell_classes {
            if rule.class.trim().is_empty() || rule.styles.is_empty() {
                return Err(ConfigError::Validation(
                    "outlook.cell_classes entries need a class and at least one style".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Project layout settings. All paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Templates under this directory are written straight into the output root.
    pub source_root: String,
    /// Compiled HTML output root.
    pub output: String,
    /// Root for per-client exports and archives.
    pub exports: String,
    /// Shared fragments, included by templates but never compiled on their own.
    pub components: String,
    /// Globs selecting template sources.
    pub include: Vec<String>,
    /// Globs removing sources from the selection. Exclusion always wins.
    pub exclude: Vec<String>,
    /// Directory names never descended into.
    pub ignored_dirs: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: "src".to_string(),
            output: "dist".to_string(),
            exports: "exports".to_string(),
            components: "components".to_string(),
            include: vec!["src/**/*.mjml".to_string(), "*.mjml".to_string()],
            exclude: vec![
                "**/components/**".to_string(),
                "node_modules/**".to_string(),
            ],
            ignored_dirs: vec!["node_modules".to_string()],
        }
    }
}

/// External compiler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Executable to run, e.g. `mjml` or `npx`.
    pub command: String,
    /// Arguments placed before the stdin/stdout flags (`["mjml"]` for npx).
    pub args: Vec<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "mjml".to_string(),
            args: Vec::new(),
        }
    }
}

/// Generic HTML export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HtmlConfig {
    /// `<title>` injected into documents that have none.
    pub title: String,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            title: "Newsletter".to_string(),
        }
    }
}

/// A `td` style signature and the class injected when it matches.
///
/// Each `styles` entry is a property and its expected value; the value `*`
/// matches any value as long as the property is declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellClassRule {
    pub class: String,
    pub styles: BTreeMap<String, String>,
}

/// Outlook rewrite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlookConfig {
    /// Web fonts Outlook cannot load; declarations naming them are replaced.
    pub web_fonts: Vec<String>,
    /// Replacement `font-family` value.
    pub fallback_fonts: String,
    /// VML rectangle width when a table declares no pixel width.
    pub vml_width: String,
    /// Column classes whose presentation tables are stretched to full height.
    pub column_classes: Vec<String>,
    /// Cell signatures that receive a semantic class.
    pub cell_classes: Vec<CellClassRule>,
}

impl Default for OutlookConfig {
    fn default() -> Self {
        Self {
            web_fonts: vec!["Montserrat".to_string()],
            fallback_fonts: "Arial, sans-serif".to_string(),
            vml_width: "600px".to_string(),
            column_classes: vec![
                "mj-column-per-60".to_string(),
                "mj-column-per-40".to_string(),
            ],
            cell_classes: vec![
                CellClassRule {
                    class: "article-inner".to_string(),
                    styles: BTreeMap::from([(
                        "background-color".to_string(),
                        "#E4E7DB".to_string(),
                    )]),
                },
                CellClassRule {
                    class: "article-frame".to_string(),
                    styles: BTreeMap::from([
                        ("border".to_string(), "*".to_string()),
                        ("padding".to_string(), "*".to_string()),
                    ]),
                },
            ],
        }
    }
}

/// Archive bundle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Gzip level (0 = store, 9 = best).
    pub compression: u32,
    /// Root-level globs added to the source and complete bundles.
    pub source_files: Vec<String>,
    /// Root-level globs added to the complete bundle only.
    pub extra_files: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression: 9,
            source_files: vec!["*.mjml".to_string(), "package.json".to_string()],
            extra_files: vec!["README.md".to_string()],
        }
    }
}

/// Parallel compilation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of templates compiled at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ProjectConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `mailpress.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the project config, merging user values over stock defaults.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: ProjectConfig = merged.try_into()?;
    config.validate()?;
    log::debug!("Loaded config for project '{}'", config.project_name);
    Ok(config)
}

/// Returns a fully-commented stock `mailpress.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mailpress configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Prefix for archive bundle names: <project_name>-<YYYY-MM-DD>-<group>.tar.gz
project_name = "newsletter"

# ---------------------------------------------------------------------------
# Project layout (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
# Templates under this directory are written straight into the output root
# (src/campaigns/spring.mjml -> dist/spring.html). Templates elsewhere keep
# their directory structure (promo/launch.mjml -> dist/promo/launch.html).
source_root = "src"
output = "dist"
exports = "exports"

# Shared fragments pulled in with <mj-include>. Never compiled on their own,
# but edits to them still trigger a rebuild in watch mode.
components = "components"

# Globs selecting templates. "*.mjml" only matches files in the project root.
include = ["src/**/*.mjml", "*.mjml"]

# Globs removing templates from the selection. Exclusion always wins.
exclude = ["**/components/**", "node_modules/**"]

# Directory names never descended into.
ignored_dirs = ["node_modules"]

# ---------------------------------------------------------------------------
# Markup compiler
# ---------------------------------------------------------------------------
[compiler]
# Invoked as: <command> <args...> -i -s --config.filePath <template>
command = "mjml"
args = []

# ---------------------------------------------------------------------------
# Generic HTML export (exports/html/)
# ---------------------------------------------------------------------------
[html]
# Injected when a document has no <title>.
title = "Newsletter"

# ---------------------------------------------------------------------------
# Outlook export (exports/outlook/)
# ---------------------------------------------------------------------------
[outlook]
# font-family declarations naming any of these are replaced.
web_fonts = ["Montserrat"]
fallback_fonts = "Arial, sans-serif"

# Width of the VML rectangle behind tables without a pixel width.
vml_width = "600px"

# Column classes whose presentation tables get height: 100%.
column_classes = ["mj-column-per-60", "mj-column-per-40"]

# Table cells matching every style below receive the class.
# A value of "*" matches any value.
[[outlook.cell_classes]]
class = "article-inner"
styles = { "background-color" = "#E4E7DB" }

[[outlook.cell_classes]]
class = "article-frame"
styles = { "border" = "*", "padding" = "*" }

# ---------------------------------------------------------------------------
# Archives (exports/archives/)
# ---------------------------------------------------------------------------
[archive]
# Gzip level, 0-9.
compression = 9

# Root-level files added to the source and complete bundles.
source_files = ["*.mjml", "package.json"]

# Root-level files added to the complete bundle only.
extra_files = ["README.md"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum templates compiled in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
