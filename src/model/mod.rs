//! Class model manager: loads the "Skin Elements" and "Visual Styles" model
//! files and answers the analyzer's type-system questions: valid
//! attributes, attribute types, enumeration entries, schema-group scoping,
//! documentation, default colors, theme metrics.

mod heuristics;
mod types;

pub use heuristics::guess_type;
pub use types::*;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{info, warn};

use crate::SkinError;
use crate::host::FileSystem;
use crate::xml::{self, NodeId, XmlDocument};

// ─── Model file parsing ──────────────────────────────────────────────

fn parse_docs(doc: &XmlDocument, src: &str, parent: NodeId) -> DocBlock {
    let mut block = DocBlock::default();
    let Some(docs) = doc.find_child(parent, "Model.Documentation") else {
        return block;
    };
    for child in doc.child_elements(docs) {
        let node = doc.node(child);
        if node.name != "String" {
            continue;
        }
        let text = doc.inner_text(child, src);
        match node.attr_value("x:id") {
            Some("brief") => block.brief = Some(text),
            Some("detailed") => block.detailed = Some(text),
            Some("code") => block.code = Some(text),
            _ => {}
        }
    }
    block
}

fn parse_class(doc: &XmlDocument, src: &str, id: NodeId) -> Option<ClassDef> {
    let node = doc.node(id);
    let name = node.attr_value("name")?.to_string();
    let parent = node.attr_value("parent").map(str::to_string);
    let is_abstract = node.attr_value("abstract") == Some("true");

    let mut schema_groups = None;
    let mut children_group = None;
    if let Some(attrs_id) = doc.find_child_with_attr(id, "Attributes", "x:id", "attributes") {
        let attrs_node = doc.node(attrs_id);
        if let Some(groups) = attrs_node.attr_value("Class:SchemaGroups") {
            schema_groups = Some(groups.split_whitespace().map(str::to_string).collect());
        }
        if let Some(group) = attrs_node.attr_value("Class:ChildGroup") {
            children_group = Some(group.to_string());
        }
    }

    let mut attributes = Vec::new();
    let member_parent = doc
        .find_child_with_attr(id, "List", "x:id", "members")
        .unwrap_or(id);
    for member in doc.child_elements(member_parent) {
        let m = doc.node(member);
        if m.name != "Model.Member" {
            continue;
        }
        let Some(attr_name) = m.attr_value("name") else {
            continue;
        };
        attributes.push(AttrDef {
            name: attr_name.to_string(),
            ty: AttrType::parse(m.attr_value("type").unwrap_or("")),
            docs: parse_docs(doc, src, member),
        });
    }

    Some(ClassDef {
        name,
        parent,
        is_abstract,
        attributes,
        schema_groups,
        children_group,
        docs: parse_docs(doc, src, id),
    })
}

/// Parse a `.classModel` file into a [`ClassModel`].
pub fn parse_model(text: &str) -> ClassModel {
    let doc = xml::parse_document(text);
    let mut model = ClassModel::default();
    let Some(root) = doc.root_element() else {
        return model;
    };

    for child in doc.child_elements(root) {
        match doc.node(child).name.as_str() {
            "Model.Class" => {
                if let Some(class) = parse_class(&doc, text, child) {
                    model.insert_class(class);
                }
            }
            "Model.Enumeration" => {
                let node = doc.node(child);
                let Some(name) = node.attr_value("name") else {
                    continue;
                };
                let entries = doc
                    .child_elements(child)
                    .filter(|&e| doc.node(e).name == "Model.Enumerator")
                    .filter_map(|e| {
                        doc.node(e).attr_value("name").map(|n| EnumEntry {
                            name: n.to_string(),
                            docs: parse_docs(&doc, text, e),
                        })
                    })
                    .collect();
                model.enums.insert(
                    name.to_string(),
                    EnumDef {
                        name: name.to_string(),
                        entries,
                        parent: node.attr_value("parent").map(str::to_string),
                    },
                );
            }
            "DefaultColors" => {
                for color in doc.child_elements(child) {
                    let c = doc.node(color);
                    if let (Some(name), Some(value)) = (c.attr_value("name"), c.attr_value("value")) {
                        model.default_colors.insert(name.to_string(), value.to_string());
                    }
                }
            }
            "ThemeMetrics" => {
                for metric in doc.child_elements(child) {
                    let m = doc.node(metric);
                    if let (Some(name), Some(value)) = (m.attr_value("name"), m.attr_value("value")) {
                        if let Ok(v) = value.parse::<f64>() {
                            model.theme_metrics.insert(name.to_string(), v);
                        }
                    }
                }
            }
            "Languages" => {
                for lang in doc.child_elements(child) {
                    if let Some(id) = doc.node(lang).attr_value("id") {
                        model.languages.push(id.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    model
}

// ─── Manager ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct LoadedModel {
    model: ClassModel,
    path: PathBuf,
    mtime: Option<SystemTime>,
}

#[derive(Debug, Default)]
pub struct ClassModelManager {
    elements: Option<LoadedModel>,
    styles: Option<LoadedModel>,
}

/// The four `Layout.layout.class` element aliases that exist outside the
/// class model proper.
const LAYOUT_CLASS_ALIASES: [(&str, &[&str]); 4] = [
    ("box", &["Horizontal", "Vertical"]),
    ("clipper", &["Layout"]),
    ("sizevariant", &["SizeVariant"]),
    ("table", &["Table"]),
];

impl ClassModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or reload on timestamp change) the "Skin Elements" model.
    pub fn load_class_model(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<(), SkinError> {
        Self::load_into(&mut self.elements, path, fs)
    }

    /// Load (or reload on timestamp change) the "Visual Styles" model.
    pub fn load_style_model(&mut self, path: &Path, fs: &dyn FileSystem) -> Result<(), SkinError> {
        Self::load_into(&mut self.styles, path, fs)
    }

    fn load_into(
        slot: &mut Option<LoadedModel>,
        path: &Path,
        fs: &dyn FileSystem,
    ) -> Result<(), SkinError> {
        let mtime = fs.mtime(path);
        if let Some(loaded) = slot {
            if loaded.path == path && loaded.mtime.is_some() && loaded.mtime == mtime {
                return Ok(());
            }
        }
        let text = fs.read(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "class model not readable");
            SkinError::ClassModelUnavailable {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        let model = parse_model(&text);
        info!(
            path = %path.display(),
            classes = model.classes.len(),
            enums = model.enums.len(),
            "class model loaded"
        );
        *slot = Some(LoadedModel { model, path: path.to_path_buf(), mtime });
        Ok(())
    }

    pub fn is_class_model_loaded(&self) -> bool {
        self.elements.is_some()
    }

    fn models(&self) -> impl Iterator<Item = &ClassModel> {
        self.elements
            .iter()
            .map(|m| &m.model)
            .chain(self.styles.iter().map(|m| &m.model))
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.models().find_map(|m| m.class(name))
    }

    pub fn class_ci(&self, name: &str) -> Option<&ClassDef> {
        self.models().find_map(|m| m.class_ci(name))
    }

    /// Parent chain starting at `name` itself.
    pub fn parent_chain(&self, name: &str) -> Vec<&ClassDef> {
        let mut chain = Vec::new();
        let mut current = self.class(name);
        while let Some(class) = current {
            // a cyclic model would hang the analyzer
            if chain.iter().any(|c: &&ClassDef| c.name == class.name) {
                break;
            }
            chain.push(class);
            current = class.parent.as_deref().and_then(|p| self.class(p));
        }
        chain
    }

    pub fn is_subclass_of(&self, name: &str, ancestor: &str) -> bool {
        self.parent_chain(name).iter().any(|c| c.name == ancestor)
    }

    // ─── Queries ─────────────────────────────────────────────────

    /// Element-name completion: case-insensitive prefix over concrete
    /// classes, plus the `Layout.layout.class` aliases.
    pub fn find_skin_element_definitions(&self, prefix: &str, ignore_abstract: bool) -> Vec<String> {
        let prefix_lower = prefix.to_ascii_lowercase();
        let mut out: Vec<String> = Vec::new();
        if let Some(loaded) = &self.elements {
            for class in loaded.model.classes.values() {
                if ignore_abstract && class.is_abstract {
                    continue;
                }
                if class.name.to_ascii_lowercase().starts_with(&prefix_lower) {
                    out.push(class.name.clone());
                }
            }
        }
        for (alias, targets) in LAYOUT_CLASS_ALIASES {
            if alias.starts_with(&prefix_lower) {
                for t in targets {
                    if !out.iter().any(|n| n == t) {
                        out.push(t.to_string());
                    }
                }
            }
        }
        out.sort();
        out
    }

    /// All attributes legal on `elem`, nearest-subclass definition winning,
    /// with name heuristics applied.
    pub fn find_valid_attributes(&self, elem: &str) -> Vec<(String, AttrType)> {
        let mut out: Vec<(String, AttrType)> = Vec::new();
        for class in self.parent_chain(elem) {
            for attr in &class.attributes {
                if out.iter().any(|(n, _)| n == &attr.name) {
                    continue;
                }
                out.push((attr.name.clone(), guess_type(elem, &attr.name, attr.ty)));
            }
        }
        // control-flow statements have no name attribute, except styleselector
        if elem != "styleselector" && self.is_subclass_of(elem, "statement") {
            out.retain(|(n, _)| n != "name");
        }
        out
    }

    /// Type and defining class of one attribute, heuristics applied last.
    pub fn find_attribute_type(&self, elem: &str, attr: &str) -> Option<(AttrType, String)> {
        for class in self.parent_chain(elem) {
            if let Some(def) = class.attribute(attr) {
                return Some((guess_type(elem, attr, def.ty), class.name.clone()));
            }
        }
        None
    }

    fn enum_def(&self, key: &str) -> Option<&EnumDef> {
        self.models().find_map(|m| m.enums.get(key))
    }

    /// Entries of the enumeration behind `elem.attr`, following both the
    /// class parent chain and the enumeration inheritance chain.
    ///
    /// `sibling_attrs` carries the other attributes written on the same tag;
    /// `Options.options` redirects through its sibling `type` attribute.
    pub fn find_valid_enum_entries(
        &self,
        elem: &str,
        attr: &str,
        sibling_attrs: &[(String, String)],
    ) -> Vec<String> {
        if elem == "Options" && attr == "options" {
            if let Some((_, ty)) = sibling_attrs.iter().find(|(n, _)| n == "type") {
                return self.collect_enum_entries(ty);
            }
        }
        for class in self.parent_chain(elem) {
            let key = format!("{}.{}", class.name, attr);
            let entries = self.collect_enum_entries(&key);
            if !entries.is_empty() {
                return entries;
            }
        }
        Vec::new()
    }

    fn collect_enum_entries(&self, key: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.enum_def(key);
        let mut seen = Vec::new();
        while let Some(def) = current {
            if seen.contains(&def.name) {
                break;
            }
            seen.push(def.name.clone());
            for entry in &def.entries {
                if !out.contains(&entry.name) {
                    out.push(entry.name.clone());
                }
            }
            current = def.parent.as_deref().and_then(|p| self.enum_def(p));
        }
        out
    }

    /// Schema-group check: `child` is valid under `parent` iff the child's
    /// group set (inherited when absent, plus its own class name) contains
    /// the parent's children-group (inherited). With no schema information
    /// at all, everything is allowed.
    pub fn is_skin_element_valid_in_scope(&self, parent: &str, child: &str) -> bool {
        let Some(_) = self.class(parent) else {
            return true;
        };
        let Some(child_class) = self.class(child) else {
            return true;
        };

        let parent_group = self
            .parent_chain(parent)
            .iter()
            .find_map(|c| c.children_group.clone());
        let Some(parent_group) = parent_group else {
            return true;
        };

        let mut child_groups: Vec<String> = self
            .parent_chain(child)
            .iter()
            .find_map(|c| c.schema_groups.clone())
            .unwrap_or_default();
        child_groups.push(child_class.name.clone());

        child_groups.contains(&parent_group)
    }

    // ─── Documentation ───────────────────────────────────────────

    pub fn class_docs(&self, elem: &str) -> Option<&DocBlock> {
        self.class(elem).map(|c| &c.docs).filter(|d| !d.is_empty())
    }

    pub fn attribute_docs(&self, elem: &str, attr: &str) -> Option<&DocBlock> {
        self.parent_chain(elem)
            .into_iter()
            .find_map(|c| c.attribute(attr))
            .map(|a| &a.docs)
            .filter(|d| !d.is_empty())
    }

    pub fn enum_docs(&self, elem: &str, attr: &str, entry: &str) -> Option<&DocBlock> {
        for class in self.parent_chain(elem) {
            let key = format!("{}.{}", class.name, attr);
            let mut current = self.enum_def(&key);
            while let Some(def) = current {
                if let Some(e) = def.entries.iter().find(|e| e.name == entry) {
                    if !e.docs.is_empty() {
                        return Some(&e.docs);
                    }
                }
                current = def.parent.as_deref().and_then(|p| self.enum_def(p));
            }
        }
        None
    }

    /// Documentation for a visual-style class, briefs of the inheritance
    /// chain concatenated root-last.
    pub fn style_docs(&self, style_class: &str) -> Option<String> {
        let chain = self.parent_chain(style_class);
        if chain.is_empty() {
            return None;
        }
        let briefs: Vec<&str> = chain
            .iter()
            .filter_map(|c| c.docs.brief.as_deref())
            .collect();
        if briefs.is_empty() {
            None
        } else {
            Some(briefs.join("\n\n"))
        }
    }

    // ─── Extras carried by the model ─────────────────────────────

    pub fn default_color(&self, name: &str) -> Option<&str> {
        self.models()
            .find_map(|m| m.default_colors.get(name))
            .map(String::as_str)
    }

    pub fn default_colors(&self) -> impl Iterator<Item = (&String, &String)> {
        self.models().flat_map(|m| m.default_colors.iter())
    }

    pub fn theme_metrics(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.models().flat_map(|m| m.theme_metrics.iter())
    }

    pub fn languages(&self) -> Vec<&str> {
        self.models()
            .flat_map(|m| m.languages.iter().map(String::as_str))
            .collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
