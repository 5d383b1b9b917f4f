//! Lenient XML parsing into an arena DOM with byte ranges.
//!
//! The skin dialect is edited live, so the parser must survive unclosed
//! tags, mismatched closes, and half-typed attributes. We drive quick-xml in
//! its tolerant configuration for tokenization, re-scan each tag's source
//! text for attribute positions (the event stream does not expose them), and
//! recover structure instead of failing: a mismatched close pops to the
//! nearest matching open, leftovers are closed at end of input.
//!
//! Nodes live in a flat arena and point at each other by index, so scope
//! walks (parents, preceding siblings) are cheap lookups.

pub mod scan;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::TextRange;
pub use scan::{ScannedAttr, ScannedTag, StructureReport, TagRef, scan_structure, scan_tag, unescape_entities};

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Pi,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttr {
    pub name: String,
    pub value: String,
    pub name_range: TextRange,
    /// Value text range, excluding quotes.
    pub value_range: TextRange,
    pub has_value: bool,
}

impl From<ScannedAttr> for XmlAttr {
    fn from(a: ScannedAttr) -> Self {
        Self {
            name: a.name,
            value: a.value,
            name_range: a.name_range,
            value_range: a.value_range,
            has_value: a.has_value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Element tag name, or PI target; empty for text and comments.
    pub name: String,
    pub attrs: Vec<XmlAttr>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Full span: start tag through matching end tag (or recovery point).
    pub range: TextRange,
    /// The start tag `<name ...>` only; for PIs the whole `<?...?>`.
    pub open_range: TextRange,
    /// Tag-name byte range inside the open tag.
    pub name_range: TextRange,
    /// Text content for Text nodes; everything after the target for PIs.
    pub text: String,
    pub self_closing: bool,
    /// False when the element was recovered (no explicit close seen).
    pub closed: bool,
}

impl XmlNode {
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_pi(&self) -> bool {
        self.kind == NodeKind::Pi
    }

    pub fn attr(&self, name: &str) -> Option<&XmlAttr> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    pub nodes: Vec<XmlNode>,
    pub roots: Vec<NodeId>,
}

// ─── Parsing ─────────────────────────────────────────────────────────

/// Parse source text into an arena DOM. Never fails: on an unrecoverable
/// tokenizer error the document holds whatever was built so far (the raw
/// structural scanner reports the breakage separately).
pub fn parse_document(src: &str) -> XmlDocument {
    let mut reader = Reader::from_str(src);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut doc = XmlDocument::default();
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(_) => break,
        };
        let end = reader.buffer_position() as usize;

        match &event {
            Event::Start(_) | Event::Empty(_) => {
                let self_closing = matches!(event, Event::Empty(_));
                let Some(tag) = scan_tag(&src[start..end], start) else {
                    continue;
                };
                let id = push_node(
                    &mut doc,
                    &mut stack,
                    XmlNode {
                        kind: NodeKind::Element,
                        name: tag.name,
                        attrs: tag.attrs.into_iter().map(XmlAttr::from).collect(),
                        parent: None,
                        children: Vec::new(),
                        range: TextRange::new(start, end),
                        open_range: TextRange::new(start, end),
                        name_range: tag.name_range,
                        text: String::new(),
                        self_closing,
                        closed: self_closing,
                    },
                );
                if !self_closing {
                    stack.push(id);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if let Some(pos) = stack
                    .iter()
                    .rposition(|&id| doc.nodes[id].name == name)
                {
                    // abandon anything opened above the match
                    while stack.len() > pos + 1 {
                        if let Some(id) = stack.pop() {
                            doc.nodes[id].range.end = start;
                        }
                    }
                    if let Some(id) = stack.pop() {
                        doc.nodes[id].range.end = end;
                        doc.nodes[id].closed = true;
                    }
                }
                // unmatched closes carry no structure; the raw scanner reports them
            }
            Event::Text(_) | Event::CData(_) => {
                let raw = &src[start..end];
                if !raw.trim().is_empty() {
                    push_node(
                        &mut doc,
                        &mut stack,
                        XmlNode {
                            kind: NodeKind::Text,
                            name: String::new(),
                            attrs: Vec::new(),
                            parent: None,
                            children: Vec::new(),
                            range: TextRange::new(start, end),
                            open_range: TextRange::new(start, end),
                            name_range: TextRange::empty(start),
                            text: unescape_entities(raw),
                            self_closing: false,
                            closed: true,
                        },
                    );
                }
            }
            Event::PI(_) => {
                let raw = &src[start..end];
                let inner = raw
                    .strip_prefix("<?")
                    .map(|s| s.strip_suffix("?>").unwrap_or(s))
                    .unwrap_or(raw);
                let target_len = inner
                    .find(|c: char| c.is_whitespace())
                    .unwrap_or(inner.len());
                let (target, rest) = inner.split_at(target_len);
                push_node(
                    &mut doc,
                    &mut stack,
                    XmlNode {
                        kind: NodeKind::Pi,
                        name: target.to_string(),
                        attrs: Vec::new(),
                        parent: None,
                        children: Vec::new(),
                        range: TextRange::new(start, end),
                        open_range: TextRange::new(start, end),
                        name_range: TextRange::new(start + 2, start + 2 + target.len()),
                        text: rest.trim().to_string(),
                        self_closing: false,
                        closed: true,
                    },
                );
            }
            Event::Comment(_) => {
                push_node(
                    &mut doc,
                    &mut stack,
                    XmlNode {
                        kind: NodeKind::Comment,
                        name: String::new(),
                        attrs: Vec::new(),
                        parent: None,
                        children: Vec::new(),
                        range: TextRange::new(start, end),
                        open_range: TextRange::new(start, end),
                        name_range: TextRange::empty(start),
                        text: String::new(),
                        self_closing: false,
                        closed: true,
                    },
                );
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
            _ => {}
        }
    }

    // close everything still open at end of input
    while let Some(id) = stack.pop() {
        doc.nodes[id].range.end = src.len();
    }

    doc
}

fn push_node(doc: &mut XmlDocument, stack: &mut [NodeId], node: XmlNode) -> NodeId {
    let id = doc.nodes.len();
    let parent = stack.last().copied();
    doc.nodes.push(node);
    doc.nodes[id].parent = parent;
    match parent {
        Some(p) => doc.nodes[p].children.push(id),
        None => doc.roots.push(id),
    }
    id
}

// ─── Typed lookups (DOM helper) ──────────────────────────────────────

impl XmlDocument {
    pub fn node(&self, id: NodeId) -> &XmlNode {
        &self.nodes[id]
    }

    /// First element among the document roots.
    pub fn root_element(&self) -> Option<NodeId> {
        self.roots.iter().copied().find(|&id| self.nodes[id].is_element())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Child elements (skips text, PIs, comments).
    pub fn child_elements(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&c| self.nodes[c].is_element())
    }

    /// First child element with the given tag name.
    pub fn find_child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child_elements(id).find(|&c| self.nodes[c].name == name)
    }

    /// First child element with the given tag name carrying `attr=value`.
    pub fn find_child_with_attr(
        &self,
        id: NodeId,
        name: &str,
        attr: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.child_elements(id)
            .find(|&c| self.nodes[c].name == name && self.nodes[c].attr_value(attr) == Some(value))
    }

    /// Walk from `id` to the document root, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.nodes[id].parent;
        std::iter::from_fn(move || {
            let next = current?;
            current = self.nodes[next].parent;
            Some(next)
        })
    }

    /// Siblings before `id` in reverse document order (nearest first).
    /// Works for root-level nodes too.
    pub fn preceding_siblings(&self, id: NodeId) -> Vec<NodeId> {
        let siblings: &[NodeId] = match self.nodes[id].parent {
            Some(p) => &self.nodes[p].children,
            None => &self.roots,
        };
        match siblings.iter().position(|&s| s == id) {
            Some(pos) => siblings[..pos].iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Innermost element or PI whose full range contains `offset`.
    pub fn node_at_offset(&self, offset: usize) -> Option<NodeId> {
        let mut best: Option<NodeId> = None;
        let mut roots: Vec<NodeId> = self.roots.clone();
        while let Some(id) = roots.pop() {
            let node = &self.nodes[id];
            if node.range.contains_inclusive(offset) {
                if node.is_element() || node.is_pi() {
                    best = Some(id);
                }
                roots.clear();
                roots.extend(node.children.iter().copied());
            }
        }
        best
    }

    /// Text content between an element's open and close tags, sliced from
    /// source and unescaped. Robust against entity references splitting the
    /// tokenizer's text events.
    pub fn inner_text(&self, id: NodeId, src: &str) -> String {
        let node = &self.nodes[id];
        if node.self_closing {
            return String::new();
        }
        let inner_start = node.open_range.end.min(src.len());
        let inner_end = if node.closed {
            node.range
                .end
                .saturating_sub(node.name.len() + 3) // "</name>"
                .max(inner_start)
        } else {
            node.range.end
        }
        .min(src.len());
        unescape_entities(src[inner_start..inner_end].trim())
    }

    /// Innermost element whose *open tag* contains `offset`.
    pub fn element_with_open_tag_at(&self, offset: usize) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_element() && n.open_range.contains_inclusive(offset))
            .max_by_key(|(_, n)| n.open_range.start)
            .map(|(id, _)| id)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;
