//! Template compilation.
//!
//! Stage 2 of the pipeline. Runs every discovered template through the
//! external markup compiler and writes the resulting HTML to the output root.
//!
//! ## The Compiler Seam
//!
//! The markup-to-HTML compiler is an external collaborator behind the
//! [`MarkupCompiler`] trait: `(source text, file path, base path) → HTML +
//! warnings`. The production implementation is [`MjmlCli`], which drives the
//! `mjml` executable over stdin/stdout. Tests substitute a fake.
//!
//! Warnings are diagnostics only. A file fails only when the compiler call
//! itself fails, and a failed file never aborts the run: it is recorded in
//! the [`BuildRun`] and the next file is compiled.
//!
//! ## Output Paths
//!
//! Output paths follow [`naming::output_path`]. They are planned for the
//! whole run before anything is compiled; when two sources map to the same
//! output path, the later one (in discovery order) is recorded as failed and
//! never written. Every write therefore targets a distinct path, which lets
//! the per-file work run in parallel on the rayon pool.
//!
//! ## Determinism
//!
//! Files are only rewritten when their content changed, so an unchanged
//! template leaves its output untouched (and does not wake file watchers).

use crate::config::{CompilerConfig, ProjectConfig};
use crate::naming::{self, Layout};
use crate::scan::{self, ScanError, SourceFile};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("compiler exited with {status}: {message}")]
    Failed { status: String, message: String },
    #[error("compiler produced non-UTF-8 output")]
    InvalidOutput,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// HTML produced by one compiler call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOutput {
    pub html: String,
    pub warnings: Vec<String>,
}

/// Markup-to-HTML compiler.
pub trait MarkupCompiler: Sync {
    /// Compile one template. `file_path` is the template's location and
    /// `base_path` the directory includes are resolved against.
    fn compile(
        &self,
        source: &str,
        file_path: &Path,
        base_path: &Path,
    ) -> Result<CompilerOutput, CompilerError>;
}

/// Runs the `mjml` command line tool: template on stdin, HTML on stdout.
#[derive(Debug, Clone)]
pub struct MjmlCli {
    command: String,
    args: Vec<String>,
}

impl MjmlCli {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }
}

impl MarkupCompiler for MjmlCli {
    fn compile(
        &self,
        source: &str,
        file_path: &Path,
        base_path: &Path,
    ) -> Result<CompilerOutput, CompilerError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .args(["-i", "-s", "--config.filePath"])
            .arg(file_path)
            .current_dir(base_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompilerError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a large stdout can't deadlock us.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            CompilerError::Io(std::io::Error::other("compiler stdin unavailable"))
        })?;
        let input = source.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let write_result = writer.join();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(CompilerError::Failed {
                status: output.status.to_string(),
                message: stderr.trim().to_string(),
            });
        }
        match write_result {
            Ok(result) => result?,
            Err(_) => {
                return Err(CompilerError::Io(std::io::Error::other(
                    "stdin writer panicked",
                )));
            }
        }

        let html = String::from_utf8(output.stdout).map_err(|_| CompilerError::InvalidOutput)?;
        let warnings = stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Ok(CompilerOutput { html, warnings })
    }
}

/// Success XOR failure of one template.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Compiled { html: String },
    Failed { error: String },
}

/// One template's result within a [`BuildRun`].
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    /// Template path relative to the project root.
    pub source_path: PathBuf,
    /// Planned HTML path relative to the project root. Only written on success.
    pub output_path: PathBuf,
    pub warnings: Vec<String>,
    pub outcome: Outcome,
}

impl CompiledDocument {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Compiled { .. })
    }

    pub fn html(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Compiled { html } => Some(html),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Compiled { .. } => None,
            Outcome::Failed { error } => Some(error),
        }
    }
}

/// Result of one discovery → compile → report cycle.
#[derive(Debug, Clone, Default)]
pub struct BuildRun {
    pub documents: Vec<CompiledDocument>,
    pub elapsed: Duration,
}

impl BuildRun {
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn total(&self) -> usize {
        self.documents.len()
    }

    /// Short status line, e.g. `1/2 succeeded`.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BuildRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} succeeded", self.succeeded(), self.total())
    }
}

/// An output path assignment, decided before compilation starts.
#[derive(Debug, Clone, PartialEq)]
struct PlannedOutput {
    source: PathBuf,
    output: PathBuf,
    /// Earlier source that already claimed `output`.
    collides_with: Option<PathBuf>,
}

fn plan_outputs(sources: &[PathBuf], source_root: &Path, output_root: &Path) -> Vec<PlannedOutput> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    sources
        .iter()
        .map(|source| {
            let output = naming::output_path(source, source_root, output_root);
            let collides_with = match claimed.get(&output) {
                Some(first) => Some(first.clone()),
                None => {
                    claimed.insert(output.clone(), source.clone());
                    None
                }
            };
            PlannedOutput {
                source: source.clone(),
                output,
                collides_with,
            }
        })
        .collect()
}

/// Discover and compile every template of the project.
///
/// Fails only when discovery fails or the output root cannot be created;
/// per-file problems are recorded in the returned [`BuildRun`].
pub fn build(
    root: &Path,
    config: &ProjectConfig,
    compiler: &impl MarkupCompiler,
) -> Result<BuildRun, BuildError> {
    let started = Instant::now();
    let layout = Layout::new(root, config);
    let sources = scan::discover(root, config)?;
    std::fs::create_dir_all(&layout.output)?;

    let plan = plan_outputs(
        &sources,
        Path::new(&config.paths.source_root),
        Path::new(&config.paths.output),
    );

    let documents: Vec<CompiledDocument> = plan
        .into_par_iter()
        .map(|planned| compile_one(root, planned, compiler))
        .collect();

    let run = BuildRun {
        documents,
        elapsed: started.elapsed(),
    };
    log::info!("Build finished: {}", run);
    Ok(run)
}

fn compile_one(root: &Path, planned: PlannedOutput, compiler: &impl MarkupCompiler) -> CompiledDocument {
    let PlannedOutput {
        source,
        output,
        collides_with,
    } = planned;
    let failed = |error: String, warnings: Vec<String>| {
        log::warn!("{}: {}", source.display(), error);
        CompiledDocument {
            source_path: source.clone(),
            output_path: output.clone(),
            warnings,
            outcome: Outcome::Failed { error },
        }
    };

    if let Some(first) = collides_with {
        return failed(
            format!(
                "output {} is already produced by {}",
                output.display(),
                first.display()
            ),
            Vec::new(),
        );
    }

    let file = match SourceFile::read(root, &source) {
        Ok(file) => file,
        Err(e) => return failed(format!("cannot read source: {e}"), Vec::new()),
    };
    let file_path = root.join(&file.path);
    let base_path = file_path.parent().unwrap_or(root);

    let compiled = match compiler.compile(&file.raw_text, &file_path, base_path) {
        Ok(compiled) => compiled,
        Err(e) => return failed(e.to_string(), Vec::new()),
    };
    for warning in &compiled.warnings {
        log::warn!("{}: {}", source.display(), warning);
    }

    if let Err(e) = write_if_changed(&root.join(&output), compiled.html.as_bytes()) {
        return failed(format!("cannot write output: {e}"), compiled.warnings);
    }

    CompiledDocument {
        source_path: source,
        output_path: output,
        warnings: compiled.warnings,
        outcome: Outcome::Compiled {
            html: compiled.html,
        },
    }
}

/// Write `bytes` unless the file already holds exactly them.
///
/// Creates missing parent directories. Returns whether a write happened.
pub fn write_if_changed(path: &Path, bytes: &[u8]) -> std::io::Result<bool> {
    if let Ok(existing) = std::fs::read(path)
        && existing == bytes
    {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(true)
}
