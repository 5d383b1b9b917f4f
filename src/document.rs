//! Document manager: per-URI cached parses, byte-offset ↔ line/column
//! conversion, and token-at-position lookup for completion and hover.

use std::collections::HashMap;

use crate::host::FileSystem;
use crate::xml::{self, ScannedAttr, StructureReport, XmlDocument};
use crate::{Position, TextRange};

// ─── Line index ──────────────────────────────────────────────────────

/// Authoritative byte-offset to line/column converter for one text snapshot.
/// Every range the analyzer persists is resolved through the index built
/// from the file's current text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts, len: text.len() }
    }

    /// Zero-based line/character (byte column) for a byte offset.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(l) => l,
            Err(l) => l - 1,
        };
        Position {
            line: line as u32,
            character: (offset - self.line_starts[line]) as u32,
        }
    }

    /// Byte offset for a zero-based line/character, clamped to the text.
    pub fn offset(&self, pos: Position) -> usize {
        let line = (pos.line as usize).min(self.line_starts.len() - 1);
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|&next| next.saturating_sub(1))
            .unwrap_or(self.len);
        (line_start + pos.character as usize).min(line_end)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

// ─── Token at position ───────────────────────────────────────────────

/// What the cursor is on inside a tag, resolved from raw source so it works
/// for half-typed tags the DOM cannot represent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAt {
    TagName {
        tag: String,
        range: TextRange,
    },
    AttributeName {
        tag: String,
        idx: usize,
        attrs: Vec<ScannedAttr>,
        before_cursor: String,
    },
    AttributeValue {
        tag: String,
        idx: usize,
        attrs: Vec<ScannedAttr>,
        before_cursor: String,
    },
    Invalid,
}

// ─── Document ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Document {
    pub uri: String,
    pub text: String,
    pub lines: LineIndex,
    pub dom: XmlDocument,
    pub structure: StructureReport,
    pub version: u64,
}

impl Document {
    pub fn new(uri: impl Into<String>, text: impl Into<String>, version: u64) -> Self {
        let text = text.into();
        let lines = LineIndex::new(&text);
        let dom = xml::parse_document(&text);
        let structure = xml::scan_structure(&text);
        Self { uri: uri.into(), text, lines, dom, structure, version }
    }

    pub fn position(&self, offset: usize) -> Position {
        self.lines.position(offset)
    }

    pub fn offset(&self, pos: Position) -> usize {
        self.lines.offset(pos)
    }

    /// Resolve the token under the cursor by re-scanning the enclosing tag
    /// text. Returns `Invalid` when the cursor is outside any tag.
    pub fn token_at(&self, offset: usize) -> TokenAt {
        let offset = offset.min(self.text.len());
        let before = &self.text[..offset];
        let Some(lt) = before.rfind('<') else {
            return TokenAt::Invalid;
        };
        // a '>' between the last '<' and the cursor puts us outside the tag
        if self.text[lt..offset].contains('>') {
            return TokenAt::Invalid;
        }
        if self.text[lt..].starts_with("<!--") {
            return TokenAt::Invalid;
        }

        // slice the tag through its '>' (or to the next '<' / end of text)
        let tag_end = self.text[lt + 1..]
            .find(['<', '>'])
            .map(|p| {
                let abs = lt + 1 + p;
                if self.text.as_bytes()[abs] == b'>' { abs + 1 } else { abs }
            })
            .unwrap_or(self.text.len());
        let tag_src = &self.text[lt..tag_end];

        let Some(tag) = xml::scan_tag(tag_src, lt) else {
            // "<", "</" or "<?" with no name yet: an empty tag-name token
            let prefix_len = tag_src
                .bytes()
                .take_while(|&b| b == b'<' || b == b'/' || b == b'?')
                .count();
            if offset <= lt + prefix_len {
                return TokenAt::TagName {
                    tag: String::new(),
                    range: TextRange::empty(lt + prefix_len),
                };
            }
            return TokenAt::Invalid;
        };

        if tag.name_range.contains_inclusive(offset) {
            return TokenAt::TagName { tag: tag.name, range: tag.name_range };
        }

        for idx in 0..tag.attrs.len() {
            let attr = &tag.attrs[idx];
            if attr.name_range.contains_inclusive(offset) {
                let before_cursor = self.text[attr.name_range.start..offset].to_string();
                return TokenAt::AttributeName {
                    tag: tag.name,
                    idx,
                    attrs: tag.attrs,
                    before_cursor,
                };
            }
            if attr.has_value && attr.value_range.contains_inclusive(offset) {
                let before_cursor = self.text[attr.value_range.start..offset].to_string();
                return TokenAt::AttributeValue {
                    tag: tag.name,
                    idx,
                    attrs: tag.attrs,
                    before_cursor,
                };
            }
        }

        // between attributes: treat as a fresh attribute name being typed
        if offset > tag.name_range.end {
            let idx = tag.attrs.len();
            return TokenAt::AttributeName {
                tag: tag.name,
                idx,
                attrs: tag.attrs,
                before_cursor: String::new(),
            };
        }

        TokenAt::Invalid
    }
}

// ─── Store ──────────────────────────────────────────────────────────

/// Per-URI document cache. Open documents (editor buffers) shadow the
/// filesystem; everything else is loaded on demand and re-read when stale.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<String, Document>,
    open: std::collections::HashSet<String>,
    next_version: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an open editor buffer.
    pub fn open(&mut self, uri: &str, text: impl Into<String>) {
        self.next_version += 1;
        self.docs.insert(uri.to_string(), Document::new(uri, text, self.next_version));
        self.open.insert(uri.to_string());
    }

    /// Whole-document content update (didChange).
    pub fn update(&mut self, uri: &str, text: impl Into<String>) {
        self.open(uri, text);
    }

    pub fn close(&mut self, uri: &str) {
        self.open.remove(uri);
        self.docs.remove(uri);
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.docs.get(uri)
    }

    /// Cached parse, falling back to the filesystem for unopened files.
    pub fn get_or_load(&mut self, uri: &str, fs: &dyn FileSystem) -> Option<&Document> {
        if !self.docs.contains_key(uri) {
            let text = fs.read(std::path::Path::new(uri)).ok()?;
            self.next_version += 1;
            self.docs.insert(uri.to_string(), Document::new(uri, text, self.next_version));
        }
        self.docs.get(uri)
    }

    /// Drop a cached (non-open) parse so the next access re-reads the file.
    pub fn invalidate(&mut self, uri: &str) {
        if !self.open.contains(uri) {
            self.docs.remove(uri);
        }
    }

    pub fn version(&self, uri: &str) -> Option<u64> {
        self.docs.get(uri).map(|d| d.version)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
