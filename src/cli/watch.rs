//! `skinlint watch`: re-validate skin files as they change on disk.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::document::LineIndex;
use crate::host::RealFileSystem;
use crate::{clean_path, Severity, SkinError};

use super::{collect_skin_files, open_workspace, render_diagnostic, split_ignore_patterns, WatchArgs};

pub(crate) fn cmd_watch(args: WatchArgs) -> Result<i32, SkinError> {
    let ignore = split_ignore_patterns(&args.ignore);
    let (workspace, mut analyzer) = open_workspace(&args.dir)?;

    if !analyzer.is_ready() {
        return Err(SkinError::ClassModelUnavailable {
            path: workspace.skin_elements_model(&RealFileSystem),
            message: "not found".to_string(),
        });
    }

    // initial pass so the first change reports against a warm index
    let files = collect_skin_files(&workspace, &ignore);
    eprintln!("[watch] initial check of {} files", files.len());
    for file in &files {
        report(&mut analyzer, file);
    }

    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())
        .map_err(|e| SkinError::Watch(e.to_string()))?;
    watcher
        .watch(&workspace.root, RecursiveMode::Recursive)
        .map_err(|e| SkinError::Watch(e.to_string()))?;

    let running = Arc::new(AtomicBool::new(true));
    let running_flag = running.clone();
    ctrlc::set_handler(move || {
        running_flag.store(false, Ordering::SeqCst);
    })
    .map_err(|e| SkinError::Watch(e.to_string()))?;

    info!(root = %workspace.root.display(), debounce_ms = args.debounce_ms, "watcher started");
    eprintln!("[watch] watching {} (Ctrl-C to stop)", workspace.root.display());

    let mut dirty: HashSet<PathBuf> = HashSet::new();
    let mut last_event: Option<Instant> = None;

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(args.debounce_ms)) {
            Ok(Ok(event)) => {
                if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
                    for path in event.paths {
                        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("xml")) {
                            let clean = clean_path(&path.to_string_lossy());
                            if !ignore.iter().any(|pat| clean.contains(pat.as_str())) {
                                dirty.insert(PathBuf::from(clean));
                            }
                        }
                    }
                    last_event = Some(Instant::now());
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "watch event error");
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                // debounce window expired: process the batch
                let quiet_long_enough = last_event
                    .is_some_and(|t| t.elapsed() >= Duration::from_millis(args.debounce_ms));
                if dirty.is_empty() || !quiet_long_enough {
                    continue;
                }
                let batch: Vec<PathBuf> = dirty.drain().collect();
                last_event = None;
                eprintln!("[watch] {} file(s) changed", batch.len());
                for path in batch {
                    let uri = path.to_string_lossy().into_owned();
                    if path.exists() {
                        report(&mut analyzer, &uri);
                    }
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    eprintln!("[watch] stopped");
    Ok(0)
}

fn report(analyzer: &mut crate::analyzer::Analyzer, uri: &str) {
    let diagnostics = analyzer.check_document(uri);
    if diagnostics.is_empty() {
        return;
    }
    let Ok(text) = std::fs::read_to_string(uri) else {
        return;
    };
    let lines = LineIndex::new(&text);
    let mut errors = 0usize;
    for diag in &diagnostics {
        if diag.severity == Severity::Error {
            errors += 1;
        }
        println!("{}", render_diagnostic(diag, uri, &lines));
    }
    if errors > 0 {
        eprintln!("[watch] {}: {} error(s)", uri, errors);
    }
}
