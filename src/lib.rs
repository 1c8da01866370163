//! # mailpress
//!
//! A build pipeline for responsive HTML email. Templates are written in MJML;
//! mailpress compiles them to HTML, rewrites a copy of each document for the
//! quirks of specific mail clients, wraps the results in the container files
//! those clients import, and bundles everything into dated archives.
//!
//! # Architecture: Staged Pipeline
//!
//! ```text
//! 1. Discover  project/        →  template list     (globs, ignored dirs)
//! 2. Compile   *.mjml          →  dist/*.html       (external compiler, parallel)
//! 3. Export    dist/*.html     →  exports/<client>/ (rewrite rules + containers)
//! 4. Archive   dist/, exports/ →  exports/archives/ (tar.gz + manifest)
//! ```
//!
//! Each stage reads what the previous one wrote to disk, so stages can be run
//! on their own (`mailpress export` after editing nothing but config) and
//! every intermediate file can be inspected. Watch mode repeats stages 1–2
//! whenever a template changes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: finds templates by include/exclude globs |
//! | [`compile`] | Stage 2: runs the compiler per template, records a [`compile::BuildRun`] |
//! | [`rewrite`] | Client rewrite rules over a lightweight tag tokenizer |
//! | [`package`] | MIME container files (`.oft`, `.emltpl`) for a rewritten document |
//! | [`export`] | Stage 3: rewrite + package every compiled document for one client |
//! | [`archive`] | Stage 4: deterministic tar.gz bundles and a checksum manifest |
//! | [`watch`] | Rebuild-on-change with at most one build in flight |
//! | [`config`] | `mailpress.toml` loading, defaults, validation |
//! | [`naming`] | Project layout and every derived path or file name |
//! | [`output`] | CLI output formatting for all stages |
//!
//! # Design Decisions
//!
//! ## The Compiler Is External
//!
//! MJML's reference compiler is the de-facto implementation of the language,
//! so mailpress drives it as a subprocess behind the
//! [`compile::MarkupCompiler`] trait instead of reimplementing it. Tests use a
//! fake implementation and never need Node installed.
//!
//! ## Tokenizer, Not DOM
//!
//! Client rewrites are surgical: add a class here, an attribute there, wrap
//! one table in VML. [`rewrite::markup`] tokenizes tags and records byte
//! spans, and rules emit span edits. Everything a rule does not touch stays
//! byte-for-byte identical, including conditional comments and whitespace
//! that a parse/serialize round-trip through a DOM would normalize away.
//!
//! ## Idempotent Rules
//!
//! Every rule checks for its own marker before editing, so exporting an
//! already-exported document changes nothing. That makes `export` safe to
//! rerun and lets tests assert `rewrite(rewrite(x)) == rewrite(x)`.
//!
//! ## Deterministic Archives
//!
//! Archive members are sorted and written with fixed metadata, so the same
//! tree produces the same bytes. The manifest's SHA-256 sums then identify
//! content, not build time.

pub mod archive;
pub mod compile;
pub mod config;
pub mod export;
pub mod naming;
pub mod output;
pub mod package;
pub mod rewrite;
pub mod scan;
pub mod watch;
