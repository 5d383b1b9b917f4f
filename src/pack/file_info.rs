//! Per-file index of a skin XML file: definitions by type, color schemes,
//! per-form defines, view instantiations, form dependencies, duplicate
//! records, include/import references, and platform/optional gating flags.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{AttrType, ClassModelManager};
use crate::xml::{self, NodeId, XmlDocument};
use crate::{Location, TextRange};

// ─── Definition types ────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DefinitionType {
    Color,
    Style,
    AppStyle,
    Image,
    Shape,
    Font,
    Metric,
    Form,
    SizedDelegate,
    Variable,
}

impl DefinitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Style => "style",
            Self::AppStyle => "app style",
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Font => "font",
            Self::Metric => "metric",
            Self::Form => "form",
            Self::SizedDelegate => "sized delegate",
            Self::Variable => "variable",
        }
    }

    /// Whether `NS/` qualification applies to names of this type.
    pub fn qualifiable(&self) -> bool {
        !matches!(self, Self::Color | Self::Font | Self::Variable)
    }

    pub const ALL: [DefinitionType; 10] = [
        Self::Color,
        Self::Style,
        Self::AppStyle,
        Self::Image,
        Self::Shape,
        Self::Font,
        Self::Metric,
        Self::Form,
        Self::SizedDelegate,
        Self::Variable,
    ];
}

impl std::fmt::Display for DefinitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── Index records ───────────────────────────────────────────────────

/// One definition site inside a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSite {
    /// Full span of the defining element.
    pub range: TextRange,
    pub node: NodeId,
    pub is_override: bool,
    /// Defined under `?language` / `?defined` / `?not:` / `?config`, so the
    /// definition may or may not exist at runtime.
    pub conditional: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineValue {
    pub value: String,
    pub location: Location,
}

/// All values a `<define>` attribute contributes for one variable name
/// within a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineInfo {
    pub name: String,
    pub values: Vec<DefineValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewInstantiation {
    pub parent_form: String,
    pub node: NodeId,
}

/// A `$variable` a form needs from its instantiation site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDependency {
    /// Variable name including the leading `$`.
    pub name: String,
    /// Element whose attribute referenced the variable.
    pub scope: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateDefinition {
    pub name: String,
    pub def_type: DefinitionType,
    pub range: TextRange,
    pub other: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRef {
    /// Namespace the included file lives in ("" for plain includes).
    pub namespace: String,
    pub url: String,
    pub node: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub url: String,
    pub node: NodeId,
}

// ─── Gating ──────────────────────────────────────────────────────────

/// Gating string for the running OS: macOS → "mac", Windows → "win",
/// anything else → no platform gating.
pub fn current_platform() -> Option<&'static str> {
    match std::env::consts::OS {
        "macos" => Some("mac"),
        "windows" => Some("win"),
        _ => None,
    }
}

fn pi_args(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Preorder gating predicate: walk preceding siblings of `node` and of each
/// ancestor for platform directives. The bare `<?platform?>` form terminates
/// a directive's reach at that level.
pub fn platform_excluded(doc: &XmlDocument, node: NodeId, platform: Option<&str>) -> bool {
    let mut level = Some(node);
    while let Some(current) = level {
        let mut terminated: Vec<&str> = Vec::new();
        for sibling in doc.preceding_siblings(current) {
            let n = doc.node(sibling);
            if !n.is_pi() {
                continue;
            }
            let (negated, target) = match n.name.strip_prefix("not:") {
                Some(rest) => (true, rest),
                None => (false, n.name.as_str()),
            };
            if !matches!(target, "platform" | "desktop_platform") {
                continue;
            }
            let args = pi_args(&n.text);
            if args.is_empty() {
                terminated.push(target);
                continue;
            }
            if terminated.contains(&target) {
                continue;
            }
            // nearest live directive decides this level
            if let Some(p) = platform {
                let listed = args.contains(&p);
                if listed == negated {
                    return true;
                }
            }
            terminated.push(target);
        }
        level = doc.parent(current);
    }
    false
}

/// True when `node` sits under a conditional-inclusion directive
/// (`?language`, `?defined`, `?config`, or any `?not:` form), meaning the
/// definition may be absent and must never raise duplicate errors.
pub fn under_optional_pi(doc: &XmlDocument, node: NodeId) -> bool {
    let mut level = Some(node);
    while let Some(current) = level {
        let mut terminated: Vec<&str> = Vec::new();
        for sibling in doc.preceding_siblings(current) {
            let n = doc.node(sibling);
            if !n.is_pi() {
                continue;
            }
            let target = n.name.as_str();
            let optional =
                matches!(target, "language" | "defined" | "config") || target.starts_with("not:");
            if !optional {
                continue;
            }
            let args = pi_args(&n.text);
            if args.is_empty() {
                terminated.push(target);
                continue;
            }
            if !terminated.contains(&target) {
                return true;
            }
        }
        level = doc.parent(current);
    }
    false
}

// ─── The file info ───────────────────────────────────────────────────

/// Variables every skin can rely on without defining them.
pub const WELL_KNOWN_GLOBALS: [&str; 5] = ["frame", "APPNAME", "APPVERSION", "LANGUAGE", "PLATFORM"];

/// URL-location variables valid inside uri-typed attributes.
pub const WELL_KNOWN_URL_LOCATIONS: [&str; 5] = ["SYSTEM", "TEMP", "HOME", "APPDATA", "RESOURCES"];

const VIEW_LIKE: [&str; 5] = ["ScrollView", "View", "Target", "Delegate", "PopupBox"];

#[derive(Debug, Clone)]
pub struct SkinFileInfo {
    pub uri: String,
    /// Namespace assigned by the registry from the `<Include>` that pulled
    /// the file in; "" for the skin root.
    pub namespace: String,
    pub doc: Arc<XmlDocument>,
    pub text: Arc<str>,
    pub definitions: HashMap<DefinitionType, HashMap<String, DefinitionSite>>,
    /// scheme → (color name → range); "" is the anonymous/resource scheme
    /// whose names carry a `$` prefix.
    pub color_schemes: HashMap<String, HashMap<String, TextRange>>,
    pub form_defines: HashMap<String, Vec<DefineInfo>>,
    pub view_instantiations: HashMap<String, Vec<ViewInstantiation>>,
    pub form_dependencies: HashMap<String, Vec<FormDependency>>,
    pub duplicates: Vec<DuplicateDefinition>,
    pub includes: Vec<IncludeRef>,
    pub imports: Vec<ImportRef>,
    pub has_platform_pi: bool,
    pub has_optional_pi: bool,
}

impl SkinFileInfo {
    /// Parse and index one file. `platform` gates definitions; `models`
    /// (when loaded) sharpen attribute types for dependency extraction.
    pub fn parse(
        uri: &str,
        text: &str,
        platform: Option<&str>,
        models: Option<&ClassModelManager>,
    ) -> Self {
        let doc = Arc::new(xml::parse_document(text));
        let mut info = SkinFileInfo {
            uri: uri.to_string(),
            namespace: String::new(),
            doc: doc.clone(),
            text: Arc::from(text),
            definitions: HashMap::new(),
            color_schemes: HashMap::new(),
            form_defines: HashMap::new(),
            view_instantiations: HashMap::new(),
            form_dependencies: HashMap::new(),
            duplicates: Vec::new(),
            includes: Vec::new(),
            imports: Vec::new(),
            has_platform_pi: text.contains("<?platform")
                || text.contains("<?desktop_platform")
                || text.contains("<?not:"),
            has_optional_pi: text.contains("<?language")
                || text.contains("<?defined")
                || text.contains("<?config")
                || text.contains("<?not:"),
        };

        let Some(root) = doc.root_element() else {
            return info;
        };

        for child in doc.child_elements(root) {
            let node = doc.node(child);
            match node.name.as_str() {
                "Include" => {
                    if let Some(url) = node.attr_value("url") {
                        info.includes.push(IncludeRef {
                            namespace: node.attr_value("name").unwrap_or("").to_string(),
                            url: url.to_string(),
                            node: child,
                        });
                    }
                }
                "Import" => {
                    if let Some(url) = node.attr_value("url") {
                        info.imports.push(ImportRef { url: url.to_string(), node: child });
                    }
                }
                "Styles" => info.extract_styles(&doc, child, platform),
                "Resources" => info.extract_resources(&doc, child, platform),
                "Shapes" => info.extract_shapes(&doc, child, platform),
                "ThemeElements" => info.extract_theme_elements(&doc, child, platform),
                "ColorScheme" => info.extract_color_scheme(&doc, child, platform),
                "Form" => {
                    if let Some(name) = doc.node(child).attr_value("name") {
                        let name = name.to_string();
                        info.add_definition(&doc, DefinitionType::Form, &name, child, platform);
                        info.index_form(&doc, &name, child, models);
                    }
                }
                _ => {}
            }
        }

        // sized delegates can appear anywhere
        for (id, node) in doc.nodes.iter().enumerate() {
            if node.is_element()
                && node.name == "Delegate"
                && (node.attr("width").is_some()
                    || node.attr("height").is_some()
                    || node.attr("size").is_some())
            {
                if let Some(form_name) = node.attr_value("form.name") {
                    // a lookup cache: later sightings never raise duplicates
                    info.definitions
                        .entry(DefinitionType::SizedDelegate)
                        .or_default()
                        .entry(form_name.to_string())
                        .or_insert(DefinitionSite {
                            range: node.range,
                            node: id,
                            is_override: false,
                            conditional: under_optional_pi(&doc, id),
                        });
                }
            }
        }

        info
    }

    /// Look up a definition of `ty` named `name` in this file only.
    pub fn find_definition(&self, ty: DefinitionType, name: &str) -> Option<&DefinitionSite> {
        if let Some(site) = self.definitions.get(&ty).and_then(|m| m.get(name)) {
            return Some(site);
        }
        None
    }

    /// Color lookup falls back to scheme colors (any scheme) and resource
    /// colors (`$`-prefixed in the anonymous scheme).
    pub fn find_color_range(&self, name: &str) -> Option<TextRange> {
        if let Some(site) = self.find_definition(DefinitionType::Color, name) {
            return Some(site.range);
        }
        self.color_schemes.values().find_map(|scheme| scheme.get(name).copied())
    }

    pub fn definition_names(&self, ty: DefinitionType) -> impl Iterator<Item = &String> {
        self.definitions.get(&ty).into_iter().flat_map(|m| m.keys())
    }

    // ─── Extraction ──────────────────────────────────────────────

    fn add_definition(
        &mut self,
        doc: &XmlDocument,
        ty: DefinitionType,
        name: &str,
        node: NodeId,
        platform: Option<&str>,
    ) {
        if platform_excluded(doc, node, platform) {
            return;
        }
        let site = DefinitionSite {
            range: doc.node(node).range,
            node,
            is_override: doc.node(node).attr_value("override") == Some("true"),
            conditional: under_optional_pi(doc, node),
        };
        let map = self.definitions.entry(ty).or_default();
        match map.get(name) {
            None => {
                map.insert(name.to_string(), site);
            }
            Some(existing) => {
                if !site.conditional
                    && !existing.conditional
                    && !site.is_override
                    && !existing.is_override
                {
                    let record = DuplicateDefinition {
                        name: name.to_string(),
                        def_type: ty,
                        range: site.range,
                        other: Location::new(self.uri.clone(), existing.range),
                    };
                    if !self.duplicates.contains(&record) {
                        self.duplicates.push(record);
                    }
                } else if site.is_override && !existing.is_override {
                    map.insert(name.to_string(), site);
                }
            }
        }
    }

    fn extract_styles(&mut self, doc: &XmlDocument, styles: NodeId, platform: Option<&str>) {
        for child in doc.child_elements(styles) {
            let node = doc.node(child);
            if !matches!(node.name.as_str(), "Style" | "StyleAlias") {
                continue;
            }
            let Some(name) = node.attr_value("name") else {
                continue;
            };
            let name = name.to_string();
            self.add_definition(doc, DefinitionType::Style, &name, child, platform);
            if doc.node(child).attr_value("appstyle") == Some("true") {
                self.add_definition(doc, DefinitionType::AppStyle, &name, child, platform);
            }
        }
    }

    fn extract_resources(&mut self, doc: &XmlDocument, resources: NodeId, platform: Option<&str>) {
        for child in doc.child_elements(resources) {
            let node = doc.node(child);
            match node.name.as_str() {
                "Color" => {
                    if let Some(name) = node.attr_value("name") {
                        if !platform_excluded(doc, child, platform) {
                            self.color_schemes
                                .entry(String::new())
                                .or_default()
                                .insert(format!("${}", name), node.range);
                        }
                    }
                }
                "Image" | "ImagePart" | "ShapeImage" | "IconSet" => {
                    let Some(name) = node.attr_value("name") else {
                        continue;
                    };
                    let name = name.to_string();
                    self.add_definition(doc, DefinitionType::Image, &name, child, platform);
                    // sub-named children index as `name[child]`
                    for sub in doc.child_elements(child) {
                        if let Some(sub_name) = doc.node(sub).attr_value("name") {
                            let indexed = format!("{}[{}]", name, sub_name);
                            self.add_definition(doc, DefinitionType::Image, &indexed, sub, platform);
                        }
                    }
                    // `frames="a b c"` fabricates `name[a]` `name[b]` `name[c]`
                    if let Some(frames) = doc.node(child).attr_value("frames") {
                        for frame in frames.split_whitespace().map(str::to_string).collect::<Vec<_>>() {
                            let indexed = format!("{}[{}]", name, frame);
                            self.add_definition(doc, DefinitionType::Image, &indexed, child, platform);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn extract_shapes(&mut self, doc: &XmlDocument, shapes: NodeId, platform: Option<&str>) {
        for child in doc.child_elements(shapes) {
            if doc.node(child).name != "Shape" {
                continue;
            }
            let Some(name) = doc.node(child).attr_value("name") else {
                continue;
            };
            let name = name.to_string();
            self.add_definition(doc, DefinitionType::Shape, &name, child, platform);
            for sub in doc.child_elements(child) {
                if let Some(sub_name) = doc.node(sub).attr_value("name") {
                    let indexed = format!("{}[{}]", name, sub_name);
                    self.add_definition(doc, DefinitionType::Shape, &indexed, sub, platform);
                }
            }
        }
    }

    fn extract_theme_elements(&mut self, doc: &XmlDocument, theme: NodeId, platform: Option<&str>) {
        for child in doc.child_elements(theme) {
            let node = doc.node(child);
            let ty = match node.name.as_str() {
                "Font" => DefinitionType::Font,
                "Metric" => DefinitionType::Metric,
                "Color" => DefinitionType::Color,
                _ => continue,
            };
            if let Some(name) = node.attr_value("name") {
                let name = name.to_string();
                self.add_definition(doc, ty, &name, child, platform);
            }
        }
    }

    fn extract_color_scheme(&mut self, doc: &XmlDocument, scheme_node: NodeId, platform: Option<&str>) {
        let scheme = doc
            .node(scheme_node)
            .attr_value("name")
            .unwrap_or("")
            .to_string();
        if platform_excluded(doc, scheme_node, platform) {
            return;
        }
        for child in doc.child_elements(scheme_node) {
            let node = doc.node(child);
            if node.name != "ColorScheme.Color" {
                continue;
            }
            if platform_excluded(doc, child, platform) {
                continue;
            }
            if let Some(name) = node.attr_value("name") {
                self.color_schemes
                    .entry(scheme.clone())
                    .or_default()
                    .insert(name.to_string(), node.range);
            }
        }
    }

    // ─── Per-form pre-computation ────────────────────────────────

    fn index_form(
        &mut self,
        doc: &XmlDocument,
        form_name: &str,
        form_node: NodeId,
        models: Option<&ClassModelManager>,
    ) {
        // view instantiations
        let mut stack: Vec<NodeId> = doc.child_elements(form_node).collect();
        while let Some(id) = stack.pop() {
            let node = doc.node(id);
            if VIEW_LIKE.contains(&node.name.as_str()) {
                let attr = if matches!(node.name.as_str(), "Delegate" | "PopupBox") {
                    "form.name"
                } else {
                    "name"
                };
                if let Some(view_name) = node.attr_value(attr) {
                    if !view_name.is_empty() {
                        self.view_instantiations
                            .entry(view_name.to_string())
                            .or_default()
                            .push(ViewInstantiation { parent_form: form_name.to_string(), node: id });
                    }
                }
            }
            stack.extend(doc.child_elements(id));
        }

        // defines declared inside the form, in document order
        let mut defines: Vec<DefineInfo> = Vec::new();
        let mut stack: Vec<NodeId> = doc.child_elements(form_node).rev().collect();
        while let Some(id) = stack.pop() {
            let node = doc.node(id);
            if node.name == "define" {
                for attr in &node.attrs {
                    let value = normalize_define_value(&attr.value);
                    let entry = DefineValue {
                        value,
                        location: Location::new(self.uri.clone(), attr.value_range),
                    };
                    match defines.iter_mut().find(|d| d.name == attr.name) {
                        Some(existing) => existing.values.push(entry),
                        None => {
                            defines.push(DefineInfo { name: attr.name.clone(), values: vec![entry] });
                        }
                    }
                }
            }
            stack.extend(doc.child_elements(id).rev());
        }
        if !defines.is_empty() {
            self.form_defines.insert(form_name.to_string(), defines);
        }

        // dependencies: variables used before any define in the form covers them
        let mut deps: Vec<FormDependency> = Vec::new();
        collect_dependencies(doc, form_node, models, &mut deps);
        if !deps.is_empty() {
            self.form_dependencies.insert(form_name.to_string(), deps);
        }
    }
}

/// Wrap bare `@eval:`/`@select:` expressions in parentheses so downstream
/// substitution can treat the payload as one token.
pub fn normalize_define_value(value: &str) -> String {
    for prefix in ["@eval:", "@select:"] {
        if let Some(rest) = value.strip_prefix(prefix) {
            if !rest.starts_with('(') {
                return format!("{}({})", prefix, rest);
            }
        }
    }
    value.to_string()
}

/// Extract `$var` names (without `$`) from a value, longest form first.
pub fn variable_names_in(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len()
                && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'.')
            {
                j += 1;
            }
            if j > start {
                out.push(value[start..j].to_string());
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

fn collect_dependencies(
    doc: &XmlDocument,
    form_node: NodeId,
    models: Option<&ClassModelManager>,
    deps: &mut Vec<FormDependency>,
) {
    let mut defined: Vec<String> = Vec::new();
    let mut stack: Vec<NodeId> = doc.child_elements(form_node).rev().collect();
    while let Some(id) = stack.pop() {
        let node = doc.node(id);
        // conditional bodies resolve at runtime, their uses don't obligate callers
        if matches!(node.name.as_str(), "if" | "switch") {
            continue;
        }
        if node.name == "define" {
            for attr in &node.attrs {
                if !defined.contains(&attr.name) {
                    defined.push(attr.name.clone());
                }
            }
        }
        if node.name == "foreach" || node.name == "styleselector" {
            if let Some(var) = node.attr_value("variable") {
                let var = var.trim_start_matches('$').to_string();
                if !defined.contains(&var) {
                    defined.push(var);
                }
            }
        }
        for attr in &node.attrs {
            if !attr.value.contains('$') {
                continue;
            }
            let is_uri = models
                .map(|m| {
                    m.find_attribute_type(&node.name, &attr.name)
                        .map(|(ty, _)| ty.contains(AttrType::URI))
                        .unwrap_or(false)
                })
                .unwrap_or(false);
            for var in variable_names_in(&attr.value) {
                if WELL_KNOWN_GLOBALS.contains(&var.as_str()) {
                    continue;
                }
                if is_uri && WELL_KNOWN_URL_LOCATIONS.contains(&var.as_str()) {
                    continue;
                }
                if defined.iter().any(|d| var == *d || var.starts_with(d.as_str())) {
                    continue;
                }
                let name = format!("${}", var);
                // keep the longest-prefix variable name only: a longer
                // recorded name subsumes this one, a longer new name
                // displaces the shorter ones it extends
                if deps.iter().any(|d| d.name.starts_with(&name) && d.name != name) {
                    continue;
                }
                deps.retain(|d| !name.starts_with(&d.name) || d.name == name);
                if !deps.iter().any(|d| d.name == name) {
                    deps.push(FormDependency { name, scope: id });
                }
            }
        }
        stack.extend(doc.child_elements(id).rev());
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "file_info_tests.rs"]
mod tests;
