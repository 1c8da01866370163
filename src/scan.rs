//! Template discovery.
//!
//! Stage 1 of the pipeline. Walks the project root and selects template
//! sources by glob, producing the ordered list the compile stage consumes.
//!
//! ## Selection Rules
//!
//! - A file is a candidate when its root-relative path matches any
//!   `paths.include` glob.
//! - A candidate is dropped when it matches any `paths.exclude` glob.
//!   Exclusion always wins over inclusion.
//! - Hidden directories, the configured `ignored_dirs`, and the output and
//!   exports directories are never descended into.
//!
//! Paths are matched with `/` separators and `require_literal_separator`, so
//! `*.mjml` selects root-level templates only while `src/**/*.mjml` selects
//! the whole source tree.
//!
//! ## Ordering
//!
//! The walk is sorted by file name, so the result is deterministic and
//! naturally free of duplicates. An empty result is a valid "nothing to
//! build" state, not an error.

use crate::config::ProjectConfig;
use crate::naming::{Layout, relative_slash_path};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid glob '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("Project root not found: {0}")]
    MissingRoot(PathBuf),
}

/// A template read from disk. Immutable once read.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub raw_text: String,
}

impl SourceFile {
    pub fn read(root: &Path, rel: &Path) -> std::io::Result<Self> {
        let raw_text = std::fs::read_to_string(root.join(rel))?;
        Ok(Self {
            path: rel.to_path_buf(),
            raw_text,
        })
    }
}

/// Compiled include/exclude globs.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl SourceFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        Ok(Self {
            include: compile_patterns(include)?,
            exclude: compile_patterns(exclude)?,
        })
    }

    pub fn from_config(config: &ProjectConfig) -> Result<Self, ScanError> {
        Self::new(&config.paths.include, &config.paths.exclude)
    }

    /// Whether a `/`-separated root-relative path is a template source.
    pub fn accepts(&self, rel: &str) -> bool {
        let included = self
            .include
            .iter()
            .any(|p| p.matches_with(rel, MATCH_OPTIONS));
        included
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(rel, MATCH_OPTIONS))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ScanError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| ScanError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Discover template sources under the project root.
///
/// Returns root-relative paths in sorted walk order.
pub fn discover(root: &Path, config: &ProjectConfig) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }
    let filter = SourceFilter::from_config(config)?;
    let layout = Layout::new(root, config);
    let pruned = [layout.output.clone(), layout.exports.clone()];

    let mut sources = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.')
                && !config.paths.ignored_dirs.iter().any(|d| *d == name)
                && !pruned.iter().any(|p| p == entry.path())
        });

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = relative_slash_path(entry.path(), root);
        if filter.accepts(&rel) {
            sources.push(PathBuf::from(rel));
        }
    }

    log::debug!("Discovered {} template(s) under {}", sources.len(), root.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<mjml></mjml>").unwrap();
    }

    fn discovered(root: &Path) -> Vec<String> {
        discover(root, &ProjectConfig::default())
            .unwrap()
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn finds_source_tree_and_root_templates() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/welcome.mjml");
        touch(tmp.path(), "src/campaigns/spring.mjml");
        touch(tmp.path(), "digest.mjml");

        assert_eq!(
            discovered(tmp.path()),
            vec!["digest.mjml", "src/campaigns/spring.mjml", "src/welcome.mjml"]
        );
    }

    #[test]
    fn components_are_excluded() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/welcome.mjml");
        touch(tmp.path(), "src/components/header.mjml");
        touch(tmp.path(), "components/footer.mjml");

        assert_eq!(discovered(tmp.path()), vec!["src/welcome.mjml"]);
    }

    #[test]
    fn exclusion_beats_inclusion() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/draft.mjml");
        touch(tmp.path(), "src/final.mjml");

        let mut config = ProjectConfig::default();
        config.paths.exclude.push("src/draft.mjml".to_string());
        let found = discover(tmp.path(), &config).unwrap();
        assert_eq!(found, vec![PathBuf::from("src/final.mjml")]);
    }

    #[test]
    fn dependency_directories_are_pruned() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "node_modules/mjml/sample.mjml");
        touch(tmp.path(), "src/node_modules/x.mjml");
        touch(tmp.path(), "src/.cache/y.mjml");
        touch(tmp.path(), "src/ok.mjml");

        assert_eq!(discovered(tmp.path()), vec!["src/ok.mjml"]);
    }

    #[test]
    fn root_glob_does_not_cross_directories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "promo/launch.mjml");

        assert!(discovered(tmp.path()).is_empty());
    }

    #[test]
    fn other_extensions_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/readme.md");
        touch(tmp.path(), "src/welcome.html");

        assert!(discovered(tmp.path()).is_empty());
    }

    #[test]
    fn empty_project_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), &ProjectConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = discover(&tmp.path().join("nope"), &ProjectConfig::default());
        assert!(matches!(result, Err(ScanError::MissingRoot(_))));
    }

    #[test]
    fn output_directory_is_never_scanned() {
        let tmp = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.paths.include.push("**/*.mjml".to_string());
        touch(tmp.path(), "dist/stale.mjml");
        touch(tmp.path(), "exports/outlook/copy.mjml");
        touch(tmp.path(), "promo/launch.mjml");

        let found = discover(tmp.path(), &config).unwrap();
        assert_eq!(found, vec![PathBuf::from("promo/launch.mjml")]);
    }

    #[test]
    fn filter_accepts_matches_globs() {
        let filter = SourceFilter::new(
            &["src/**/*.mjml".to_string()],
            &["**/components/**".to_string()],
        )
        .unwrap();
        assert!(filter.accepts("src/a.mjml"));
        assert!(filter.accepts("src/deep/a.mjml"));
        assert!(!filter.accepts("src/components/a.mjml"));
        assert!(!filter.accepts("a.mjml"));
    }

    #[test]
    fn source_file_reads_text() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/a.mjml");
        let file = SourceFile::read(tmp.path(), Path::new("src/a.mjml")).unwrap();
        assert_eq!(file.raw_text, "<mjml></mjml>");
        assert_eq!(file.path, PathBuf::from("src/a.mjml"));
    }
}
