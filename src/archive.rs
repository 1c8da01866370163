//! Archive bundles.
//!
//! Stage 4 of the pipeline. Packs the project's generated and source trees
//! into dated `.tar.gz` bundles under `exports/archives/`, then writes a
//! JSON manifest describing them.
//!
//! ## Bundles
//!
//! | Type | Contents | Suffix |
//! |------|----------|--------|
//! | HTML | `dist/` (at archive root) | `-html` |
//! | Export HTML | `exports/html/` (at archive root) | `-export-html` |
//! | Outlook | `exports/outlook/` (at archive root) | `-outlook` |
//! | Source | `components/`, `src/`, root source files | `-source` |
//! | Complete | all of the above plus extra root files | `-complete` |
//!
//! A bundle whose directories don't exist is skipped without error; an
//! existing but empty directory still produces an (empty) archive. The
//! complete bundle is always written.
//!
//! ## Durability
//!
//! Each archive streams `File` → `GzEncoder` → `tar::Builder`. It only
//! counts as written once the tar builder is finished, the gzip trailer is
//! written, and the file is synced to disk; size and SHA-256 are taken from
//! the file afterwards. If any step fails, the partial file is removed,
//! archives written earlier in the run are kept, and the error is returned.
//! Entries use deterministic headers (no mtimes or owners).

use crate::config::{ArchiveConfig, ProjectConfig};
use crate::naming::{self, Layout};
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::{Compression, write::GzEncoder};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tar::HeaderMode;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write {filename}: {source}")]
    Write { filename: String, source: io::Error },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid glob '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Logical bundle type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    Html,
    ExportHtml,
    Outlook,
    Source,
    Complete,
}

impl ArchiveKind {
    pub const ALL: [ArchiveKind; 5] = [
        ArchiveKind::Html,
        ArchiveKind::ExportHtml,
        ArchiveKind::Outlook,
        ArchiveKind::Source,
        ArchiveKind::Complete,
    ];

    /// Manifest `type` value.
    pub fn label(self) -> &'static str {
        match self {
            ArchiveKind::Html => "HTML",
            ArchiveKind::ExportHtml => "Export HTML",
            ArchiveKind::Outlook => "Outlook",
            ArchiveKind::Source => "Source",
            ArchiveKind::Complete => "Complete",
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveKind::Html => "html",
            ArchiveKind::ExportHtml => "export-html",
            ArchiveKind::Outlook => "outlook",
            ArchiveKind::Source => "source",
            ArchiveKind::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub filename: String,
    /// Bytes on disk.
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    /// RFC 3339 UTC timestamp.
    pub created: String,
    pub archives: Vec<ManifestEntry>,
}

#[derive(Debug, Clone)]
pub struct BundleReport {
    pub directory: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: ArchiveManifest,
    pub skipped: Vec<ArchiveKind>,
}

/// Something to put into an archive.
#[derive(Debug, Clone, PartialEq)]
enum Member {
    /// A directory's contents, optionally under a prefix.
    Tree { dir: PathBuf, prefix: Option<String> },
    File { path: PathBuf, name: String },
}

/// Members of a bundle, or `None` when it should be skipped.
fn plan(kind: ArchiveKind, layout: &Layout, config: &ArchiveConfig) -> Result<Option<Vec<Member>>, ArchiveError> {
    let tree_at_root = |dir: PathBuf| {
        dir.is_dir()
            .then(|| vec![Member::Tree { dir, prefix: None }])
    };
    let named_tree = |dir: &Path| {
        dir.is_dir().then(|| Member::Tree {
            dir: dir.to_path_buf(),
            prefix: Some(naming::relative_slash_path(dir, &layout.root)),
        })
    };

    let members = match kind {
        ArchiveKind::Html => tree_at_root(layout.output.clone()),
        ArchiveKind::ExportHtml => tree_at_root(layout.client_dir("html")),
        ArchiveKind::Outlook => tree_at_root(layout.client_dir("outlook")),
        ArchiveKind::Source => {
            let trees: Vec<Member> = [&layout.components, &layout.source_root]
                .into_iter()
                .filter_map(|d| named_tree(d))
                .collect();
            if trees.is_empty() {
                None
            } else {
                let mut members = trees;
                members.extend(root_files(&layout.root, &config.source_files)?);
                Some(members)
            }
        }
        ArchiveKind::Complete => {
            let dirs = [
                layout.output.clone(),
                layout.client_dir("html"),
                layout.client_dir("outlook"),
                layout.components.clone(),
                layout.source_root.clone(),
            ];
            let mut members: Vec<Member> = dirs.iter().filter_map(|d| named_tree(d)).collect();
            let patterns: Vec<String> = config
                .source_files
                .iter()
                .chain(&config.extra_files)
                .cloned()
                .collect();
            members.extend(root_files(&layout.root, &patterns)?);
            Some(members)
        }
    };
    Ok(members)
}

/// Files directly in `root` matching any pattern, sorted and deduplicated.
fn root_files(root: &Path, patterns: &[String]) -> Result<Vec<Member>, ArchiveError> {
    let compiled = patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| ArchiveError::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut names = BTreeSet::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if compiled.iter().any(|p| p.matches(&name)) {
            names.insert(name);
        }
    }
    Ok(names
        .into_iter()
        .map(|name| Member::File {
            path: root.join(&name),
            name,
        })
        .collect())
}

fn append_member<W: Write>(tar: &mut tar::Builder<W>, member: &Member) -> io::Result<()> {
    match member {
        Member::File { path, name } => tar.append_path_with_name(path, name),
        Member::Tree { dir, prefix } => {
            for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(io::Error::other)?;
                let rel = naming::relative_slash_path(entry.path(), dir);
                let name = match prefix {
                    Some(prefix) => format!("{prefix}/{rel}"),
                    None => rel,
                };
                if entry.file_type().is_dir() {
                    tar.append_dir(&name, entry.path())?;
                } else if entry.file_type().is_file() {
                    tar.append_path_with_name(entry.path(), &name)?;
                }
            }
            Ok(())
        }
    }
}

/// Stream members into a gzipped tar at `path`; returns the size on disk.
fn write_archive(path: &Path, members: &[Member], level: u32) -> io::Result<u64> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::new(level));
    let mut tar = tar::Builder::new(encoder);
    tar.mode(HeaderMode::Deterministic);

    for member in members {
        append_member(&mut tar, member)?;
    }

    let encoder = tar.into_inner()?;
    let mut file = encoder.finish()?;
    file.flush()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Write every applicable bundle and the manifest, dated today (UTC).
pub fn bundle(layout: &Layout, config: &ProjectConfig) -> Result<BundleReport, ArchiveError> {
    bundle_at(layout, config, Utc::now())
}

/// [`bundle`] with an explicit timestamp for names and the manifest.
pub fn bundle_at(
    layout: &Layout,
    config: &ProjectConfig,
    now: DateTime<Utc>,
) -> Result<BundleReport, ArchiveError> {
    let directory = layout.archives_dir();
    fs::create_dir_all(&directory)?;
    let stem = naming::archive_stem(&config.project_name, &now.format("%Y-%m-%d").to_string());

    let mut archives = Vec::new();
    let mut skipped = Vec::new();
    for kind in ArchiveKind::ALL {
        let Some(members) = plan(kind, layout, &config.archive)? else {
            log::debug!("Skipping {} archive: nothing to bundle", kind.label());
            skipped.push(kind);
            continue;
        };

        let filename = naming::archive_file_name(&stem, kind.suffix());
        let path = directory.join(&filename);
        let size = match write_archive(&path, &members, config.archive.compression) {
            Ok(size) => size,
            Err(source) => {
                if path.is_file() {
                    let _ = fs::remove_file(&path);
                }
                return Err(ArchiveError::Write { filename, source });
            }
        };
        let sha256 = hash_file(&path)?;
        log::info!("Wrote {} ({} bytes)", filename, size);
        archives.push(ManifestEntry {
            kind: kind.label().to_string(),
            filename,
            size,
            sha256,
        });
    }

    let manifest = ArchiveManifest {
        created: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        archives,
    };
    let manifest_path = directory.join(naming::manifest_file_name(&stem));
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    Ok(BundleReport {
        directory,
        manifest_path,
        manifest,
        skipped,
    })
}
