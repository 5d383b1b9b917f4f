//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;
mod watch;

pub use args::*;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use tracing_subscriber::EnvFilter;

use crate::analyzer::Analyzer;
use crate::config::Workspace;
use crate::document::LineIndex;
use crate::host::{RealFileSystem, SystemClock};
use crate::{clean_path, Diagnostic, Severity, SkinError};

// ─── CLI ─────────────────────────────────────────────────────────────

/// Static analyzer for skin XML packs
#[derive(Parser, Debug)]
#[command(
    name = "skinlint",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_DATE"), ")"),
    about,
    after_help = "Run 'skinlint <COMMAND> --help' for detailed options.\n\
        Diagnostics go to stdout, progress to stderr; exit code 1 on any error."
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Validate every skin file in a repository once
    Check(CheckArgs),

    /// Re-validate files as they change on disk
    Watch(WatchArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => cmd_check(args),
        Commands::Watch(args) => watch::cmd_watch(args),
    };

    match result {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

// ─── Shared plumbing ────────────────────────────────────────────────

pub(crate) fn split_ignore_patterns(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub(crate) fn open_workspace(dir: &str) -> Result<(Workspace, Analyzer), SkinError> {
    let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| PathBuf::from(dir));
    if !dir.exists() {
        return Err(SkinError::DirNotFound(dir.to_string_lossy().into_owned()));
    }
    let fs = RealFileSystem;
    let workspace = match Workspace::discover(&dir, &fs) {
        Ok(ws) => ws,
        // no repo.json above: treat the directory itself as the repository
        Err(SkinError::RepoNotFound(_)) => Workspace::open(dir.clone(), &fs)?,
        Err(e) => return Err(e),
    };

    let mut analyzer = Analyzer::new(RealFileSystem, SystemClock);
    analyzer.configure(&workspace);
    Ok((workspace, analyzer))
}

/// All candidate skin files under the workspace's skins locations (falling
/// back to the repository root when none exists), ignore patterns applied.
pub(crate) fn collect_skin_files(workspace: &Workspace, ignore: &[String]) -> Vec<String> {
    let mut roots: Vec<PathBuf> = workspace
        .skins_locations()
        .into_iter()
        .filter(|p| p.exists())
        .collect();
    if roots.is_empty() {
        roots.push(workspace.root.clone());
    }

    let mut files = Vec::new();
    for root in roots {
        let mut builder = WalkBuilder::new(&root);
        builder.hidden(false).git_ignore(true);
        for entry in builder.build().flatten() {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.path();
            if !path.extension().is_some_and(|e| e.eq_ignore_ascii_case("xml")) {
                continue;
            }
            let clean = clean_path(&path.to_string_lossy());
            if ignore.iter().any(|pat| clean.contains(pat.as_str())) {
                continue;
            }
            if !files.contains(&clean) {
                files.push(clean);
            }
        }
    }
    files.sort();
    files
}

/// `Error: <msg> at <path>:<line>:<col>` with related info appended as
/// `(msg file:line:col)`. Lines and columns are 1-based.
pub(crate) fn render_diagnostic(diag: &Diagnostic, path: &str, lines: &LineIndex) -> String {
    let severity = match diag.severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
    };
    let pos = lines.position(diag.range.start);
    let mut out = format!(
        "{}: {} at {}:{}:{}",
        severity,
        diag.message,
        path,
        pos.line + 1,
        pos.character + 1
    );
    for related in &diag.related {
        let rel_pos = match std::fs::read_to_string(&related.location.uri) {
            Ok(text) => LineIndex::new(&text).position(related.location.range.start),
            Err(_) => crate::Position::default(),
        };
        out.push_str(&format!(
            " ({} {}:{}:{})",
            related.message,
            related.location.uri,
            rel_pos.line + 1,
            rel_pos.character + 1
        ));
    }
    out
}

// ─── cmd_check ──────────────────────────────────────────────────────

fn cmd_check(args: CheckArgs) -> Result<i32, SkinError> {
    let start = Instant::now();
    let ignore = split_ignore_patterns(&args.ignore);
    let (workspace, mut analyzer) = open_workspace(&args.dir)?;

    if !analyzer.is_ready() {
        return Err(SkinError::ClassModelUnavailable {
            path: workspace.skin_elements_model(&RealFileSystem),
            message: "not found".to_string(),
        });
    }

    let files = collect_skin_files(&workspace, &ignore);
    eprintln!("[check] {} candidate files under {}", files.len(), workspace.root.display());

    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;

    for file in &files {
        let diagnostics = analyzer.check_document(file);
        if diagnostics.is_empty() {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(Path::new(file)) else {
            continue;
        };
        let lines = LineIndex::new(&text);
        for diag in &diagnostics {
            match diag.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
            if !args.quiet {
                println!("{}", render_diagnostic(diag, file, &lines));
            }
        }
    }

    println!("Total Errors: {}", total_errors);
    println!("Total Warnings: {}", total_warnings);
    println!("Finished in {:.2}s", start.elapsed().as_secs_f64());

    Ok(if total_errors > 0 { 1 } else { 0 })
}
