//! Per-client export.
//!
//! Stage 3 of the pipeline. Reads every compiled document from the output
//! root, rewrites a copy for the client, and writes the client's containers
//! to `exports/<client>/`:
//!
//! ```text
//! dist/welcome.html ──rewrite──► exports/outlook/welcome.oft
//!                                exports/outlook/welcome.emltpl
//!                                exports/outlook/welcome-outlook.html
//!                   ──rewrite──► exports/html/welcome.html
//! ```
//!
//! Container files are named by base name only, so two compiled documents
//! with the same base name (`dist/a/x.html`, `dist/b/x.html`) would write
//! the same files; the later one is reported as failed instead.
//!
//! The compiled documents in `dist/` are only read, never modified.

use crate::compile::write_if_changed;
use crate::naming::{self, Layout, relative_slash_path};
use crate::package::{self, BoundarySource, ContainerFormat, TemplateMeta};
use crate::rewrite::{self, Client, ClientProfile};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// One compiled document's export result.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    /// Compiled HTML, relative to the project root.
    pub source: PathBuf,
    /// Written container file names (within the client directory).
    pub files: Vec<String>,
    /// Rules that changed the document.
    pub applied: Vec<&'static str>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub client: Client,
    pub directory: PathBuf,
    pub documents: Vec<ExportedDocument>,
    /// Extra files such as the Outlook import notes.
    pub extras: Vec<String>,
}

impl ExportReport {
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.error.is_none()).count()
    }

    pub fn total(&self) -> usize {
        self.documents.len()
    }

    pub fn files_written(&self) -> usize {
        self.documents.iter().map(|d| d.files.len()).sum::<usize>() + self.extras.len()
    }
}

/// Compiled documents under the output root, in sorted order.
pub fn compiled_documents(output: &Path) -> Result<Vec<PathBuf>, ExportError> {
    if !output.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(output).sort_by_file_name() {
        let entry = entry?;
        let is_html = entry.path().extension().is_some_and(|e| e == "html");
        if entry.file_type().is_file() && is_html {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

/// Export every compiled document for one client.
pub fn export(
    profile: &ClientProfile,
    layout: &Layout,
    boundaries: &mut impl BoundarySource,
) -> Result<ExportReport, ExportError> {
    let client = profile.client;
    let directory = layout.client_dir(client.name());
    let inputs = compiled_documents(&layout.output)?;

    let mut report = ExportReport {
        client,
        directory: directory.clone(),
        documents: Vec::new(),
        extras: Vec::new(),
    };
    if inputs.is_empty() {
        log::warn!(
            "No compiled HTML in {}; run a build first",
            layout.output.display()
        );
        return Ok(report);
    }
    fs::create_dir_all(&directory)?;

    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    for input in inputs {
        let source = PathBuf::from(relative_slash_path(&input, &layout.root));
        let base = naming::base_name(&input);

        let result = match claimed.get(&base) {
            Some(first) => Err(format!(
                "base name '{base}' is already exported from {}",
                first.display()
            )),
            None => {
                claimed.insert(base.clone(), source.clone());
                export_one(profile, &input, &base, &directory, boundaries)
            }
        };

        let document = match result {
            Ok((files, applied)) => ExportedDocument {
                source,
                files,
                applied,
                error: None,
            },
            Err(error) => {
                log::warn!("[{client}] {}: {error}", source.display());
                ExportedDocument {
                    source,
                    files: Vec::new(),
                    applied: Vec::new(),
                    error: Some(error),
                }
            }
        };
        report.documents.push(document);
    }

    if client == Client::Outlook {
        let readme = outlook_readme(profile, &report);
        write_if_changed(&directory.join("README.md"), readme.as_bytes())?;
        report.extras.push("README.md".to_string());
    }

    log::info!(
        "[{client}] exported {}/{} document(s) to {}",
        report.succeeded(),
        report.total(),
        directory.display()
    );
    Ok(report)
}

fn export_one(
    profile: &ClientProfile,
    input: &Path,
    base: &str,
    directory: &Path,
    boundaries: &mut impl BoundarySource,
) -> Result<(Vec<String>, Vec<&'static str>), String> {
    let compiled = fs::read_to_string(input).map_err(|e| format!("cannot read: {e}"))?;
    let rewritten = rewrite::rewrite(&compiled, profile);
    let meta = TemplateMeta::from_html(&rewritten.html, base);
    let artifacts = package::package(profile, base, &rewritten.html, &meta, boundaries)
        .map_err(|e| e.to_string())?;

    let mut files = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        write_if_changed(&directory.join(&artifact.filename), &artifact.bytes)
            .map_err(|e| format!("cannot write {}: {e}", artifact.filename))?;
        files.push(artifact.filename);
    }
    Ok((files, rewritten.applied))
}

/// Import notes for the Outlook export directory.
fn outlook_readme(profile: &ClientProfile, report: &ExportReport) -> String {
    let mut listing = String::new();
    for doc in report.documents.iter().filter(|d| d.error.is_none()) {
        let base = naming::base_name(&doc.source);
        for format in &profile.containers {
            listing.push_str(&format!(
                "- {} ({})\n",
                format.file_name(&base, profile.client),
                format.description()
            ));
        }
    }
    let rules = profile.rule_names().join(", ");
    let single = ContainerFormat::SinglePart.file_name("<name>", Client::Outlook);
    let nested = ContainerFormat::NestedMultipart.file_name("<name>", Client::Outlook);

    format!(
        "# Outlook Template Import Instructions

## Outlook for Windows

Double-click `{single}` to open it as a new message, then save it with
File > Save As > Outlook Template.

## Outlook for Mac

Double-click `{nested}`, or use File > Import and pick
\"Outlook template file (.emltpl)\".

## Any Outlook (manual)

1. Open the matching `*-outlook.html` file and copy its source.
2. Create a new message in Outlook and switch the editor to HTML.
3. Paste, then save as a template.

## Files in this directory

{listing}
## Rewrite rules applied

{rules}

Test in Outlook 2016/2019/365 for Windows, Outlook for Mac and Outlook.com
before sending.
"
    )
}
