//! IntelliSense queries: hover, completion, go-to-definition, find
//! references, and rename. All of them resolve the token under the cursor
//! first, then route by the attribute's type.

use std::collections::HashMap;
use std::path::Path;

use crate::color;
use crate::document::{Document, TokenAt};
use crate::model::AttrType;
use crate::pack::{self, DefinitionType, PackRegistry, QueryCtx, ScopeOptions};
use crate::{Location, TextRange};

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompletionKind {
    Class,
    Property,
    Value,
    EnumMember,
    Color,
    Variable,
    Module,
    Snippet,
    File,
    Folder,
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    pub insert_text: Option<String>,
    pub detail: Option<String>,
    pub preselect: bool,
}

impl CompletionItem {
    fn new(label: impl Into<String>, kind: CompletionKind) -> Self {
        Self { label: label.into(), kind, insert_text: None, detail: None, preselect: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    pub contents: String,
    pub range: TextRange,
}

/// Fixed processing-instruction vocabulary.
const PI_TARGETS: [&str; 7] =
    ["platform", "xstring", "language", "defined", "config", "desktop_platform", "not"];

fn completion_kind_for(ty: DefinitionType) -> CompletionKind {
    match ty {
        DefinitionType::Style | DefinitionType::AppStyle => CompletionKind::Module,
        DefinitionType::Color => CompletionKind::Color,
        DefinitionType::Form => CompletionKind::Class,
        DefinitionType::Variable => CompletionKind::Variable,
        _ => CompletionKind::Value,
    }
}

fn load_document(ctx: &QueryCtx, uri: &str) -> Option<Document> {
    if let Some(doc) = ctx.docs.get(uri) {
        return Some(doc.clone());
    }
    let text = ctx.fs.read(Path::new(uri)).ok()?;
    Some(Document::new(uri, text, 0))
}

// ─── Symbols ─────────────────────────────────────────────────────────

/// What the cursor is on, resolved far enough to route queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Element {
        name: String,
        range: TextRange,
    },
    /// An attribute name; `on_define` marks `<define x="…"/>` variable
    /// definitions, which are themselves navigation targets.
    Attribute {
        element: String,
        name: String,
        range: TextRange,
        on_define: bool,
    },
    /// A value token with the definition types its attribute can hold.
    Value {
        element: String,
        attribute: String,
        text: String,
        range: TextRange,
        types: Vec<DefinitionType>,
        is_uri: bool,
        elem_offset: usize,
    },
    /// A `$variable` token inside a value.
    Variable {
        name: String,
        range: TextRange,
        elem_offset: usize,
    },
}

impl Symbol {
    pub fn text(&self) -> &str {
        match self {
            Symbol::Element { name, .. } => name,
            Symbol::Attribute { name, .. } => name,
            Symbol::Value { text, .. } => text,
            Symbol::Variable { name, .. } => name,
        }
    }

    pub fn range(&self) -> TextRange {
        match self {
            Symbol::Element { range, .. }
            | Symbol::Attribute { range, .. }
            | Symbol::Value { range, .. }
            | Symbol::Variable { range, .. } => *range,
        }
    }
}

fn definition_types_of(mask: AttrType) -> Vec<DefinitionType> {
    let mut types = Vec::new();
    for (bit, ty) in [
        (AttrType::STYLE, DefinitionType::Style),
        (AttrType::STYLE_ARRAY, DefinitionType::Style),
        (AttrType::IMAGE, DefinitionType::Image),
        (AttrType::SHAPE, DefinitionType::Shape),
        (AttrType::FONT, DefinitionType::Font),
        (AttrType::FORM, DefinitionType::Form),
        (AttrType::COLOR, DefinitionType::Color),
    ] {
        if mask.contains(bit) && !types.contains(&ty) {
            types.push(ty);
        }
    }
    types
}

/// The whitespace-delimited token of `value` under the cursor.
fn value_token_at(doc: &Document, value_range: TextRange, offset: usize) -> (String, TextRange) {
    let value = &doc.text[value_range.start..value_range.end];
    let rel = offset.saturating_sub(value_range.start).min(value.len());
    let start = value[..rel]
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = value[rel..]
        .find(char::is_whitespace)
        .map(|i| rel + i)
        .unwrap_or(value.len());
    (
        value[start..end].to_string(),
        TextRange::new(value_range.start + start, value_range.start + end),
    )
}

/// The `$name` token of `value` containing the cursor, if any.
fn variable_token_at(doc: &Document, value_range: TextRange, offset: usize) -> Option<(String, TextRange)> {
    let value = &doc.text[value_range.start..value_range.end];
    let rel = offset.saturating_sub(value_range.start).min(value.len());
    let bytes = value.as_bytes();
    let dollar = value[..rel].rfind('$')?;
    let name_start = dollar + 1;
    let mut end = name_start;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'.')
    {
        end += 1;
    }
    if rel > end || end == name_start {
        return None;
    }
    Some((
        value[name_start..end].to_string(),
        TextRange::new(value_range.start + dollar, value_range.start + end),
    ))
}

/// Resolve the symbol at a position.
pub fn symbol_at(ctx: &QueryCtx, uri: &str, offset: usize) -> Option<Symbol> {
    let doc = load_document(ctx, uri)?;
    match doc.token_at(offset) {
        TokenAt::TagName { tag, range } => Some(Symbol::Element { name: tag, range }),
        TokenAt::AttributeName { tag, idx, attrs, .. } => {
            let attr = attrs.get(idx)?;
            Some(Symbol::Attribute {
                element: tag.clone(),
                name: attr.name.clone(),
                range: attr.name_range,
                on_define: tag == "define",
            })
        }
        TokenAt::AttributeValue { tag, idx, attrs, .. } => {
            let attr = attrs.get(idx)?;
            let elem_offset = doc
                .dom
                .element_with_open_tag_at(offset)
                .map(|id| doc.dom.nodes[id].open_range.start)
                .unwrap_or(attr.name_range.start);

            if let Some((name, range)) = variable_token_at(&doc, attr.value_range, offset) {
                return Some(Symbol::Variable { name, range, elem_offset });
            }

            let mask = ctx
                .models
                .find_attribute_type(&tag, &attr.name)
                .map(|(ty, _)| ty)
                .unwrap_or(AttrType::empty());
            let (text, range) = if mask.contains(AttrType::STYLE_ARRAY) {
                value_token_at(&doc, attr.value_range, offset)
            } else {
                (attr.value.clone(), attr.value_range)
            };
            Some(Symbol::Value {
                element: tag,
                attribute: attr.name.clone(),
                text,
                range,
                types: definition_types_of(mask),
                is_uri: mask.contains(AttrType::URI),
                elem_offset,
            })
        }
        TokenAt::Invalid => None,
    }
}

// ─── Go to definition ────────────────────────────────────────────────

pub fn find_definitions(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    offset: usize,
) -> Vec<Location> {
    let Some(symbol) = symbol_at(ctx, uri, offset) else {
        return Vec::new();
    };
    match symbol {
        Symbol::Element { .. } => Vec::new(),
        Symbol::Attribute { range, on_define, .. } => {
            if on_define {
                // its own location, so Find All References works from here
                vec![Location::new(uri, range)]
            } else {
                Vec::new()
            }
        }
        Symbol::Variable { name, elem_offset, .. } => {
            pack::vars::find_define_sites_at(reg, ctx, uri, elem_offset, &name, false)
        }
        Symbol::Value { attribute, text, types, is_uri, elem_offset, .. } => {
            if text.is_empty() {
                return Vec::new();
            }
            let mut opts = ScopeOptions::default();
            if attribute == "form.name" {
                opts.force_qualified = true;
            }
            for ty in &types {
                let hits = reg.lookup_definition(*ty, &text, uri, &opts, ctx);
                if !hits.is_empty() {
                    return hits;
                }
            }
            if is_uri {
                if let Some(resolved) = reg.resolve_uri(&text, uri, ctx.fs) {
                    if ctx.fs.exists(&resolved) {
                        return vec![Location::new(
                            resolved.to_string_lossy().into_owned(),
                            TextRange::empty(0),
                        )];
                    }
                }
            }
            // no concrete type matched: try it as a variable name
            pack::vars::find_define_sites_at(reg, ctx, uri, elem_offset, &text, false)
        }
    }
}

// ─── Hover ───────────────────────────────────────────────────────────

pub fn find_hover(reg: &mut PackRegistry, ctx: &QueryCtx, uri: &str, offset: usize) -> Option<Hover> {
    let symbol = symbol_at(ctx, uri, offset)?;
    match &symbol {
        Symbol::Element { name, range } => {
            let class = ctx.models.class_ci(name)?;
            let mut contents = format!("**{}**", class.name);
            if let Some(parent) = &class.parent {
                contents.push_str(&format!(" : {}", parent));
            }
            if let Some(docs) = ctx.models.class_docs(&class.name) {
                if let Some(brief) = &docs.brief {
                    contents.push_str(&format!("\n\n{}", brief));
                }
                if let Some(detailed) = &docs.detailed {
                    contents.push_str(&format!("\n\n{}", detailed));
                }
                if let Some(code) = &docs.code {
                    contents.push_str(&format!("\n\n```xml\n{}\n```", code));
                }
            }
            Some(Hover { contents, range: *range })
        }
        Symbol::Attribute { element, name, range, .. } => {
            let (ty, defining) = ctx.models.find_attribute_type(element, name)?;
            let mut contents = format!("**{}** ({}) from {}", name, ty.describe(), defining);
            if let Some(docs) = ctx.models.attribute_docs(element, name) {
                if let Some(brief) = &docs.brief {
                    contents.push_str(&format!("\n\n{}", brief));
                }
            }
            Some(Hover { contents, range: *range })
        }
        Symbol::Variable { name, range, elem_offset } => {
            let values =
                pack::vars::resolve_variable(reg, ctx, uri, *elem_offset, &format!("${}", name));
            let contents = if values.len() == 1 && values[0] == format!("${}", name) {
                format!("`${}` (unresolved)", name)
            } else {
                format!("`${}` = {}", name, values.join(" | "))
            };
            Some(Hover { contents, range: *range })
        }
        Symbol::Value { element, attribute, text, range, types, .. } => {
            // enum docs first, then definition info
            if let Some(docs) = ctx.models.enum_docs(element, attribute, text) {
                if let Some(brief) = &docs.brief {
                    return Some(Hover { contents: format!("**{}**: {}", text, brief), range: *range });
                }
            }
            for ty in types {
                let hits = reg.lookup_definition(*ty, text, uri, &ScopeOptions::default(), ctx);
                if let Some(hit) = hits.first() {
                    let mut contents = format!("{} **{}**", ty, text);
                    if *ty == DefinitionType::Style {
                        if let Some(docs) = ctx.models.style_docs(text) {
                            contents.push_str(&format!("\n\n{}", docs));
                        }
                    }
                    contents.push_str(&format!("\n\nDefined in {}", hit.uri));
                    return Some(Hover { contents, range: *range });
                }
            }
            None
        }
    }
}

// ─── Completion ──────────────────────────────────────────────────────

pub fn find_completions(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    offset: usize,
) -> Vec<CompletionItem> {
    let Some(doc) = load_document(ctx, uri) else {
        return Vec::new();
    };
    let mut items = match doc.token_at(offset) {
        TokenAt::TagName { tag, range } => complete_tag_name(ctx, &doc, offset, &tag, range),
        TokenAt::AttributeName { tag, attrs, before_cursor, .. } => {
            let mut items = Vec::new();
            for (name, ty) in ctx.models.find_valid_attributes(&tag) {
                // legacy behavior: substring filter, not prefix
                if !name.contains(&before_cursor) {
                    continue;
                }
                if attrs.iter().any(|a| a.name == name) {
                    continue;
                }
                let mut item = CompletionItem::new(&name, CompletionKind::Property);
                item.detail = Some(ty.describe());
                item.insert_text = Some(format!("{}=\"\"", name));
                items.push(item);
            }
            items
        }
        TokenAt::AttributeValue { tag, idx, attrs, before_cursor } => {
            let attr = &attrs[idx];
            complete_value(reg, ctx, &doc, uri, offset, &tag, &attr.name, &attrs, &before_cursor)
        }
        TokenAt::Invalid => Vec::new(),
    };
    items.sort_by(|a, b| a.label.cmp(&b.label).then(a.kind.cmp(&b.kind)));
    items.dedup_by(|a, b| a.label == b.label && a.kind == b.kind);
    items
}

fn complete_tag_name(
    ctx: &QueryCtx,
    doc: &Document,
    offset: usize,
    prefix: &str,
    range: TextRange,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    // `<?` → processing instructions
    let at_pi = range.start >= 2 && doc.text[..range.start].ends_with("<?");
    if at_pi {
        for target in PI_TARGETS {
            if target.starts_with(prefix) {
                items.push(CompletionItem::new(target, CompletionKind::Keyword));
            }
        }
        return items;
    }

    // closing-tag snippet for the nearest unclosed open tag
    let unclosed = doc
        .structure
        .unclosed
        .iter()
        .filter(|t| t.range.end <= offset)
        .max_by_key(|t| t.range.start);
    if let Some(open) = unclosed {
        let mut item = CompletionItem::new(format!("/{}>", open.name), CompletionKind::Snippet);
        item.insert_text = Some(format!("/{}>", open.name));
        item.preselect = true;
        items.push(item);
    }

    // classes valid under the enclosing element (the position just before
    // the tag's `<` lands inside the parent, not the half-typed tag itself)
    let parent_name = doc
        .dom
        .node_at_offset(range.start.saturating_sub(2))
        .map(|id| doc.dom.nodes[id].name.clone());
    for class in ctx.models.find_skin_element_definitions(prefix, true) {
        let valid = parent_name
            .as_deref()
            .map(|p| ctx.models.is_skin_element_valid_in_scope(p, &class))
            .unwrap_or(true);
        if valid {
            items.push(CompletionItem::new(class, CompletionKind::Class));
        }
    }
    items
}

fn complete_value(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    doc: &Document,
    uri: &str,
    offset: usize,
    tag: &str,
    attr_name: &str,
    attrs: &[crate::xml::ScannedAttr],
    before_cursor: &str,
) -> Vec<CompletionItem> {
    let mut items = Vec::new();

    // `<define x="…">` values take the expression markers
    if tag == "define" {
        for marker in ["@property:", "@select:", "@eval:"] {
            items.push(CompletionItem::new(marker, CompletionKind::Keyword));
        }
    }

    // `$` context: in-scope variables plus the theme-metrics tree
    if let Some(dollar) = before_cursor.rfind('$') {
        let var_prefix = &before_cursor[dollar + 1..];
        let elem_offset = doc
            .dom
            .element_with_open_tag_at(offset)
            .map(|id| doc.dom.nodes[id].open_range.start)
            .unwrap_or(offset);
        for name in pack::vars::variables_in_scope(reg, ctx, uri, elem_offset, var_prefix) {
            items.push(CompletionItem::new(name, CompletionKind::Variable));
        }
        for (metric, value) in ctx.models.theme_metrics() {
            let name = format!("Theme.{}", metric);
            if name.starts_with(var_prefix) {
                let mut item = CompletionItem::new(name, CompletionKind::Variable);
                item.detail = Some(value.to_string());
                items.push(item);
            }
        }
        if tag == "define" {
            return items;
        }
    }

    let mask = ctx
        .models
        .find_attribute_type(tag, attr_name)
        .map(|(ty, _)| ty)
        .unwrap_or(AttrType::empty());

    if mask.contains(AttrType::BOOL) {
        items.push(CompletionItem::new("true", CompletionKind::Value));
        items.push(CompletionItem::new("false", CompletionKind::Value));
    }

    if mask.contains(AttrType::ENUM) {
        let siblings: Vec<(String, String)> = attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        let present: Vec<&str> = before_cursor.split_whitespace().collect();
        for entry in ctx.models.find_valid_enum_entries(tag, attr_name, &siblings) {
            if !present.contains(&entry.as_str()) {
                items.push(CompletionItem::new(entry, CompletionKind::EnumMember));
            }
        }
    }

    if mask.contains(AttrType::COLOR) {
        items.push(CompletionItem::new("#", CompletionKind::Color));
        for (name, value) in ctx.models.default_colors() {
            let mut item = CompletionItem::new(name, CompletionKind::Color);
            item.detail = Some(value.clone());
            items.push(item);
        }
        for (name, ty) in
            reg.find_definitions(&[DefinitionType::Color], uri, &ScopeOptions::default(), ctx)
        {
            items.push(CompletionItem::new(name, completion_kind_for(ty)));
        }
    }

    let mut def_types = Vec::new();
    if mask.contains(AttrType::STYLE) || mask.contains(AttrType::STYLE_ARRAY) {
        def_types.push(DefinitionType::Style);
    }
    if mask.contains(AttrType::IMAGE) {
        def_types.push(DefinitionType::Image);
    }
    if mask.contains(AttrType::SHAPE) {
        def_types.push(DefinitionType::Shape);
    }
    if mask.contains(AttrType::FONT) {
        def_types.push(DefinitionType::Font);
    }
    if mask.contains(AttrType::FORM) {
        def_types.push(DefinitionType::Form);
    }
    if !def_types.is_empty() {
        let opts = ScopeOptions {
            force_qualified: attr_name == "form.name",
            ..ScopeOptions::default()
        };
        for (name, ty) in reg.find_definitions(&def_types, uri, &opts, ctx) {
            items.push(CompletionItem::new(name, completion_kind_for(ty)));
        }
    }

    if mask.contains(AttrType::URI) {
        complete_uri(reg, ctx, uri, tag, before_cursor, &mut items);
    }

    items
}

fn complete_uri(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    tag: &str,
    before_cursor: &str,
    items: &mut Vec<CompletionItem>,
) {
    // every available pack for <Import url="@…">
    if tag == "Import" {
        for location in reg.skins_locations().to_vec() {
            for entry in ctx.fs.read_dir(&location) {
                if ctx.fs.is_dir(&entry) && ctx.fs.exists(&entry.join("skin.xml")) {
                    if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
                        items.push(CompletionItem::new(format!("@{}", name), CompletionKind::Folder));
                    }
                }
            }
        }
    }

    // listing of the directory the typed prefix points into
    let dir_part = before_cursor
        .rfind('/')
        .map(|i| &before_cursor[..i + 1])
        .unwrap_or("");
    if let Some(resolved) = reg.resolve_uri(dir_part, uri, ctx.fs) {
        if ctx.fs.is_dir(&resolved) {
            for entry in ctx.fs.read_dir(&resolved) {
                let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let kind = if ctx.fs.is_dir(&entry) {
                    CompletionKind::Folder
                } else {
                    CompletionKind::File
                };
                items.push(CompletionItem::new(name, kind));
            }
        }
    }
}

// ─── References & rename ─────────────────────────────────────────────

pub fn find_references(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    offset: usize,
) -> Vec<Location> {
    let Some(symbol) = symbol_at(ctx, uri, offset) else {
        return Vec::new();
    };
    let needle = symbol.text().to_string();
    if needle.is_empty() {
        return Vec::new();
    }
    let targets = find_definitions(reg, ctx, uri, offset);
    if targets.is_empty() {
        return Vec::new();
    }

    let mut out: Vec<Location> = Vec::new();
    let opts = ScopeOptions { allow_foreign_namespaces: true, ..ScopeOptions::default() };
    let mut scope_files: Vec<String> = Vec::new();
    reg.for_each_file_in_scope(uri, &opts, ctx, &mut |info| {
        scope_files.push(info.uri.clone());
        false
    });

    for file_uri in scope_files {
        let Some(info) = reg.info(&file_uri) else { continue };
        let text = info.text.clone();
        let occurrences: Vec<usize> = text.match_indices(&needle).map(|(i, _)| i).collect();
        for occ in occurrences {
            // keep only occurrences whose own resolution points back at a target
            let resolved = find_definitions(reg, ctx, &file_uri, occ);
            let points_back = resolved.iter().any(|r| targets.contains(r))
                || targets
                    .iter()
                    .any(|t| t.uri == file_uri && t.range.contains_inclusive(occ));
            if points_back {
                let loc = Location::new(file_uri.clone(), TextRange::new(occ, occ + needle.len()));
                if !out.contains(&loc) {
                    out.push(loc);
                }
            }
        }
    }
    out
}

/// The range and text of the symbol under the cursor, for the rename UI.
pub fn prepare_rename(ctx: &QueryCtx, uri: &str, offset: usize) -> Option<(TextRange, String)> {
    let symbol = symbol_at(ctx, uri, offset)?;
    let range = symbol.range();
    if range.is_empty() {
        return None;
    }
    Some((range, symbol.text().to_string()))
}

/// Apply `new_name` at every reference range, keyed by file.
pub fn rename(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    offset: usize,
    new_name: &str,
) -> HashMap<String, Vec<(TextRange, String)>> {
    let mut edits: HashMap<String, Vec<(TextRange, String)>> = HashMap::new();
    for reference in find_references(reg, ctx, uri, offset) {
        edits
            .entry(reference.uri)
            .or_default()
            .push((reference.range, new_name.to_string()));
    }
    for ranges in edits.values_mut() {
        ranges.sort_by_key(|(r, _)| r.start);
        ranges.dedup();
    }
    edits
}

// ─── Color picker support ────────────────────────────────────────────

/// Presentations for a concrete color (hex / rgb / hsl), used when the
/// editor asks how to write a picked color back.
pub fn color_presentations(rgba: color::Rgba) -> Vec<String> {
    color::presentations(rgba)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "intel_tests.rs"]
mod tests;
