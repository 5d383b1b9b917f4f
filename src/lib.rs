//! # skinlint, a Skin XML Static Analyzer
//!
//! Language-understanding core for skin XML packs: class-model typed
//! validation, cross-file definition lookup, `$variable` expansion, and
//! IntelliSense queries (hover, completion, definitions, references, rename).
//!
//! ## Library usage
//!
//! This crate is primarily a CLI tool, but the whole analysis engine is
//! exposed as a library so editor front ends can drive it: construct an
//! [`analyzer::Analyzer`], feed it documents, and call `check_document` /
//! `find_*` on it.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod check;
pub mod cli;
pub mod color;
pub mod config;
pub mod document;
pub mod error;
pub mod expr;
pub mod host;
pub mod intel;
pub mod model;
pub mod pack;
pub mod xml;

#[cfg(test)]
pub mod testutil;

pub use error::SkinError;

/// Diagnostic source tag attached to every emitted diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "skinlint";

// ─── Core public types ───────────────────────────────────────────────

/// Half-open byte range `[start, end)` into a document's text.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-length range anchored at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Like `contains`, but accepts the end position too (cursor semantics).
    pub fn contains_inclusive(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }
}

/// Zero-based line/character pair produced by the line index.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// A range inside a specific document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub uri: String,
    pub range: TextRange,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: TextRange) -> Self {
        Self { uri: uri.into(), range }
    }
}

// ─── Diagnostics ─────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A pointer from a diagnostic to a second location that explains it
/// (the other definition of a duplicate, the requesting element of an
/// unresolved external, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RelatedInfo {
    pub location: Location,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: TextRange,
    pub message: String,
    pub source: String,
    pub related: Vec<RelatedInfo>,
}

impl Diagnostic {
    pub fn error(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            range,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE.to_string(),
            related: Vec::new(),
        }
    }

    pub fn warning(range: TextRange, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE.to_string(),
            related: Vec::new(),
        }
    }

    pub fn with_related(mut self, location: Location, message: impl Into<String>) -> Self {
        self.related.push(RelatedInfo { location, message: message.into() });
        self
    }
}

// ─── Shared helpers ─────────────────────────────────────────────────

/// Read a file as UTF-8, falling back to lossy conversion for files with
/// stray non-UTF8 bytes. Returns the text and whether conversion was lossy.
pub fn read_file_lossy(path: &Path) -> std::io::Result<(String, bool)> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    match String::from_utf8(bytes) {
        Ok(s) => Ok((s, false)),
        Err(e) => {
            let s = String::from_utf8_lossy(e.as_bytes()).into_owned();
            Ok((s, true))
        }
    }
}

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}


// ─── Property-based tests (proptest) ─────────────────────────────────

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// clean_path is idempotent.
        #[test]
        fn clean_path_idempotent(input in "\\PC{0,100}") {
            let once = clean_path(&input);
            let twice = clean_path(&once);
            prop_assert_eq!(once, twice);
        }

        /// A range never contains an offset outside [start, end].
        #[test]
        fn range_containment(start in 0usize..1000, len in 0usize..1000, probe in 0usize..3000) {
            let r = TextRange::new(start, start + len);
            if r.contains(probe) {
                prop_assert!(probe >= r.start && probe < r.end);
            }
            if r.contains_inclusive(probe) {
                prop_assert!(probe >= r.start && probe <= r.end);
            }
        }
    }
}
