//! Skin document validator: walks a parsed document and emits diagnostics
//! for every element, attribute, and attribute value, then the structural
//! leftovers (unclosed and dangling tags) and duplicate definitions.

mod values;

pub use values::*;

use std::cell::Cell;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::rc::Rc;

use tracing::error;

use crate::color::{self, Rgba};
use crate::document::Document;
use crate::model::AttrType;
use crate::pack::{self, DefinitionType, PackRegistry, QueryCtx, ScopeOptions};
use crate::xml::{NodeId, XmlAttr};
use crate::{Diagnostic, Location, TextRange};

// ─── Budget / cancellation ───────────────────────────────────────────

/// Consulted between element checks; a stale epoch aborts the walk so rapid
/// edits never stack validations.
pub trait Budget {
    /// False = abort.
    fn checkpoint(&mut self) -> bool;
}

pub struct Unlimited;

impl Budget for Unlimited {
    fn checkpoint(&mut self) -> bool {
        true
    }
}

/// Aborts as soon as a newer check epoch exists.
pub struct EpochBudget {
    pub started: u64,
    pub current: Rc<Cell<u64>>,
}

impl Budget for EpochBudget {
    fn checkpoint(&mut self) -> bool {
        self.current.get() == self.started
    }
}

// ─── Outcome ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct CheckOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Concrete colors found in attribute values, for the color picker.
    pub colors: Vec<(TextRange, Rgba)>,
    /// False when the budget aborted the walk; diagnostics are partial.
    pub completed: bool,
}

/// Validate one document. The text is taken from the open-buffer overlay
/// when present, from disk otherwise.
pub fn check_document(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    budget: &mut dyn Budget,
) -> CheckOutcome {
    let text = match ctx.docs.get(uri) {
        Some(doc) => doc.text.clone(),
        None => match ctx.fs.read(Path::new(uri)) {
            Ok(text) => text,
            Err(_) => return CheckOutcome { completed: true, ..Default::default() },
        },
    };
    let doc = Document::new(uri, text, 0);

    let mut checker = DocumentChecker { reg, ctx, doc, diags: Vec::new(), colors: Vec::new() };
    let completed = checker.run(budget);
    CheckOutcome { diagnostics: checker.diags, colors: checker.colors, completed }
}

struct DocumentChecker<'a, 'q> {
    reg: &'a mut PackRegistry,
    ctx: &'a QueryCtx<'q>,
    doc: Document,
    diags: Vec<Diagnostic>,
    colors: Vec<(TextRange, Rgba)>,
}

impl DocumentChecker<'_, '_> {
    fn run(&mut self, budget: &mut dyn Budget) -> bool {
        let Some(root) = self.doc.dom.root_element() else {
            return true;
        };
        if self.doc.dom.nodes[root].name != "Skin" {
            return true;
        }

        if !self.ctx.models.is_class_model_loaded() {
            self.diags.push(Diagnostic::error(
                TextRange::empty(0),
                "Class model could not be found. Validation is disabled.",
            ));
            return true;
        }

        let uri = self.doc.uri.clone();
        self.reg.refresh_definitions(&uri, self.ctx);

        let is_root = self.reg.is_skin_root(&uri, self.ctx.fs);
        if !is_root && !self.reg.is_in_include_graph(&uri, self.ctx) {
            self.diags.push(Diagnostic::warning(
                TextRange::empty(0),
                "File is not included in the skin pack.",
            ));
        }
        if is_root {
            self.check_external_requests(&uri);
        }

        // document-order walk
        let mut stack: Vec<NodeId> = vec![root];
        let mut completed = true;
        while let Some(id) = stack.pop() {
            if !budget.checkpoint() {
                completed = false;
                break;
            }
            let is_element = self.doc.dom.nodes[id].is_element();
            if is_element {
                let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    self.check_element(id);
                }));
                if result.is_err() {
                    error!(uri = %self.doc.uri, element = %self.doc.dom.nodes[id].name, "element check panicked");
                    self.diags.push(Diagnostic::error(
                        self.doc.dom.nodes[id].name_range,
                        "Internal error while checking this element.",
                    ));
                }
            }
            for &child in self.doc.dom.nodes[id].children.iter().rev() {
                stack.push(child);
            }
        }

        self.check_structure();
        self.check_duplicates(&uri);
        completed
    }

    // ─── Structural trailers ─────────────────────────────────────

    fn check_structure(&mut self) {
        for pi_range in self.doc.structure.malformed_pis.clone() {
            self.diags.push(Diagnostic::error(pi_range, "Malformed processing instruction."));
        }
        for tag in self.doc.structure.unclosed.clone() {
            self.diags.push(Diagnostic::error(
                tag.range,
                format!("No closing tag found for <{}>.", tag.name),
            ));
        }
        for pi in self.doc.structure.unterminated_pis.clone() {
            let message = format!("No closing tag found for <?{}>.", pi.name);
            if pi.name == "xstring" {
                self.diags.push(Diagnostic::warning(pi.range, message));
            } else {
                self.diags.push(Diagnostic::error(pi.range, message));
            }
        }
        for tag in self.doc.structure.dangling.clone() {
            self.diags.push(Diagnostic::error(
                tag.range,
                format!("Dangling tag </{}> found.", tag.name),
            ));
        }
    }

    fn check_duplicates(&mut self, uri: &str) {
        for dup in self.reg.duplicates_for(uri).to_vec() {
            self.diags.push(
                Diagnostic::error(
                    dup.range,
                    format!("Duplicate definition of {} \"{}\".", dup.def_type, dup.name),
                )
                .with_related(dup.other.clone(), "The other definition."),
            );
        }
    }

    fn check_external_requests(&mut self, root_uri: &str) {
        self.reg.ensure_pack_indexed(root_uri, self.ctx);
        for request in self.reg.external_requests(root_uri).to_vec() {
            if self
                .reg
                .is_defined_strict(request.def_type, &request.name, root_uri, self.ctx)
            {
                continue;
            }
            let range = self
                .reg
                .match_external(request.def_type, &request.name, root_uri, self.ctx)
                .map(|loc| loc.range)
                .unwrap_or_else(|| TextRange::empty(0));
            self.diags.push(
                Diagnostic::error(
                    range,
                    format!(
                        "No definition found for {} \"{}\".",
                        request.def_type, request.name
                    ),
                )
                .with_related(request.location.clone(), "Requested here."),
            );
        }
    }

    // ─── Per-element checks ──────────────────────────────────────

    fn check_element(&mut self, id: NodeId) {
        let node = self.doc.dom.nodes[id].clone();
        let uri = self.doc.uri.clone();
        let models = self.ctx.models;

        // unknown / miscased element names
        if models.class(&node.name).is_none() {
            if let Some(actual) = models.class_ci(&node.name) {
                self.diags.push(Diagnostic::warning(
                    node.name_range,
                    format!("Incorrect casing. Did you mean \"{}\"?", actual.name),
                ));
            } else {
                let parent_name = self
                    .doc
                    .dom
                    .parent(id)
                    .map(|p| self.doc.dom.nodes[p].name.clone());
                let mut diag = Diagnostic::error(
                    node.name_range,
                    format!("Unknown element \"{}\".", node.name),
                );
                if let Some(parent_name) = parent_name {
                    let valid = self.valid_children_of(&parent_name);
                    if !valid.is_empty() {
                        diag = diag.with_related(
                            Location::new(uri.clone(), node.name_range),
                            format!("Valid elements here: {}.", valid.join(", ")),
                        );
                    }
                }
                self.diags.push(diag);
                return;
            }
        }

        self.check_element_scope(id, &node);
        self.check_form_extras(id, &node);
        self.check_attributes(id, &node);
    }

    fn valid_children_of(&self, parent: &str) -> Vec<String> {
        let mut valid: Vec<String> = self
            .ctx
            .models
            .find_skin_element_definitions("", true)
            .into_iter()
            .filter(|child| self.ctx.models.is_skin_element_valid_in_scope(parent, child))
            .collect();
        valid.sort();
        valid.truncate(8);
        valid
    }

    fn check_element_scope(&mut self, id: NodeId, node: &crate::xml::XmlNode) {
        let Some(parent) = self.doc.dom.parent(id) else {
            return;
        };
        let parent_name = self.doc.dom.nodes[parent].name.clone();

        if node.name.eq_ignore_ascii_case("default") && parent_name != "switch" {
            self.diags.push(Diagnostic::warning(
                node.name_range,
                "\"default\" is only valid inside \"switch\". Wrap the siblings in a <switch> statement.",
            ));
            return;
        }
        if node.name.eq_ignore_ascii_case("externals") {
            let uri = self.doc.uri.clone();
            if !self.reg.is_skin_root(&uri, self.ctx.fs) {
                self.diags.push(Diagnostic::error(
                    node.name_range,
                    "Externals are only allowed in the skin root file.",
                ));
            }
            return;
        }
        if !self
            .ctx
            .models
            .is_skin_element_valid_in_scope(&parent_name, &node.name)
        {
            self.diags.push(Diagnostic::error(
                node.name_range,
                format!(
                    "Element \"{}\" is not a valid child for \"{}\".",
                    node.name, parent_name
                ),
            ));
        }
    }

    fn check_form_extras(&mut self, _id: NodeId, node: &crate::xml::XmlNode) {
        let uri = self.doc.uri.clone();
        if node.name == "Form" {
            if let Some(name) = node.attr_value("name") {
                let sized = self.reg.is_defined_strict(
                    DefinitionType::SizedDelegate,
                    name,
                    &uri,
                    self.ctx,
                );
                if sized && node.attr("attach").is_none() {
                    self.diags.push(Diagnostic::warning(
                        node.name_range,
                        format!(
                            "Form \"{}\" is referenced by a sized delegate and should set \"attach\".",
                            name
                        ),
                    ));
                }
            }
        }

        let has_cmd_name = node.attr("command.name").is_some();
        let has_cmd_category = node.attr("command.category").is_some();
        if has_cmd_name != has_cmd_category {
            let (present, missing) = if has_cmd_name {
                ("command.name", "command.category")
            } else {
                ("command.category", "command.name")
            };
            let range = node.attr(present).map(|a| a.name_range).unwrap_or(node.name_range);
            self.diags.push(Diagnostic::warning(
                range,
                format!("\"{}\" has no effect without \"{}\".", present, missing),
            ));
        }
    }

    fn check_attributes(&mut self, id: NodeId, node: &crate::xml::XmlNode) {
        if node.name == "define" {
            self.check_define_values(node);
            return;
        }

        let valid_attrs = self.ctx.models.find_valid_attributes(&node.name);

        for (idx, attr) in node.attrs.iter().enumerate() {
            // redefinition
            if node.attrs[..idx].iter().any(|a| a.name == attr.name) {
                self.diags.push(Diagnostic::error(
                    attr.name_range,
                    format!("Attribute \"{}\" is already defined.", attr.name),
                ));
                continue;
            }
            if attr.name.starts_with("data.") {
                continue;
            }

            // exact, underscore-insensitive, then case-insensitive lookup
            let exact = valid_attrs.iter().find(|(n, _)| *n == attr.name);
            let resolved = exact.or_else(|| {
                let stripped = attr.name.replace('_', "");
                valid_attrs.iter().find(|(n, _)| n.replace('_', "") == stripped)
            });
            let ty = match resolved {
                Some((_, ty)) => *ty,
                None => {
                    match valid_attrs
                        .iter()
                        .find(|(n, _)| n.eq_ignore_ascii_case(&attr.name))
                    {
                        Some((actual, ty)) => {
                            self.diags.push(Diagnostic::warning(
                                attr.name_range,
                                format!("Incorrect casing. Did you mean \"{}\"?", actual),
                            ));
                            *ty
                        }
                        None => {
                            self.diags.push(Diagnostic::error(
                                attr.name_range,
                                format!(
                                    "Invalid attribute \"{}\" for element \"{}\".",
                                    attr.name, node.name
                                ),
                            ));
                            continue;
                        }
                    }
                }
            };

            self.check_special_attr_warnings(node, attr);
            self.check_statement_attr_hints(id, node, attr);
            self.check_attribute_value(id, node, attr, ty);
        }

        // Slider sizing: a default-styled slider sizes itself from its style
        if node.name == "Slider"
            && node.attr("style").is_none()
            && node.attr("width").is_some()
            && node.attr("height").is_some()
        {
            self.diags.push(Diagnostic::warning(
                node.name_range,
                "Slider with the default style should set either width or height, not both.",
            ));
        }
    }

    fn check_special_attr_warnings(&mut self, node: &crate::xml::XmlNode, attr: &XmlAttr) {
        if node.name == "Delegate" {
            if attr.name == "name" && node.attr("form.name").is_none() {
                self.diags.push(Diagnostic::warning(
                    attr.name_range,
                    "Did you mean \"form.name\"?",
                ));
            }
            if attr.name == "style" {
                self.diags.push(Diagnostic::warning(
                    attr.name_range,
                    "Style needs to be defined by the referenced Form.",
                ));
            }
        }
    }

    fn check_statement_attr_hints(&mut self, id: NodeId, node: &crate::xml::XmlNode, attr: &XmlAttr) {
        if !matches!(node.name.as_str(), "if" | "switch" | "foreach" | "styleselector") {
            return;
        }
        if attr.name == "variable" && node.name == "styleselector" && !attr.value.starts_with('$') {
            self.diags.push(Diagnostic::warning(
                attr.value_range,
                "Variable references start with \"$\".",
            ));
            return;
        }
        if attr.name == "variable" || attr.value.is_empty() || attr.value.contains('$') {
            return;
        }
        let uri = self.doc.uri.clone();
        let known = pack::vars::variables_in_scope(
            self.reg,
            self.ctx,
            &uri,
            node.open_range.start,
            &attr.value,
        );
        if known.iter().any(|v| *v == attr.value) {
            self.diags.push(Diagnostic::warning(
                attr.value_range,
                format!("This seems to be a variable. Did you mean \"${}\"?", attr.value),
            ));
        }
    }

    fn check_define_values(&mut self, node: &crate::xml::XmlNode) {
        for attr in &node.attrs {
            let value = pack::normalize_define_value(&attr.value);
            if let Some(payload) = value.strip_prefix("@eval:(").and_then(|v| v.strip_suffix(')')) {
                if !payload.contains('$') {
                    for err in crate::expr::evaluate(payload).errors {
                        self.diags.push(Diagnostic::error(attr.value_range, err));
                    }
                }
            }
        }
    }

    // ─── Attribute values ────────────────────────────────────────

    fn check_attribute_value(
        &mut self,
        id: NodeId,
        node: &crate::xml::XmlNode,
        attr: &XmlAttr,
        ty: AttrType,
    ) {
        let value = attr.value.as_str();

        if value.is_empty() {
            if attr.name == "name" || (!ty.is_empty() && !ty.contains(AttrType::STRING)) {
                self.diags.push(Diagnostic::warning(
                    attr.name_range,
                    format!("{} has no value. Consider removing it.", attr.name),
                ));
            }
            return;
        }

        for marker in ["@eval:", "@select:", "@property:"] {
            if value.starts_with(marker) {
                self.diags.push(Diagnostic::error(
                    attr.value_range,
                    format!("\"{}\" is only allowed inside a define.", marker),
                ));
                return;
            }
        }

        if ty.is_empty() {
            return;
        }

        if value.contains('$') {
            let uri = self.doc.uri.clone();
            let resolved = pack::vars::resolve_variable(
                self.reg,
                self.ctx,
                &uri,
                node.open_range.start,
                value,
            );
            for concrete in resolved {
                // expansions from an outer scope stay unresolved here
                if !concrete.contains('$') {
                    self.check_concrete_value(id, node, attr, ty, &concrete);
                }
            }
            return;
        }

        self.check_concrete_value(id, node, attr, ty, value);
    }

    fn check_concrete_value(
        &mut self,
        id: NodeId,
        node: &crate::xml::XmlNode,
        attr: &XmlAttr,
        ty: AttrType,
        text: &str,
    ) {
        let mut first_fail: Option<Diagnostic> = None;
        let mut warnings: Vec<Diagnostic> = Vec::new();
        let range = attr.value_range;

        // one check per set bit; any pass accepts the value. URI runs last
        // so shape-like references fail as "not defined", not "not found".
        let checks: [(AttrType, fn(&str) -> ValueFit); 11] = [
            (AttrType::BOOL, check_bool),
            (AttrType::INT, check_int),
            (AttrType::FLOAT, check_float),
            (AttrType::FONT_SIZE, check_font_size),
            (AttrType::DURATION, check_duration),
            (AttrType::SIZE, check_size),
            (AttrType::RECT, check_rect),
            (AttrType::POINT, check_point),
            (AttrType::POINT3D, check_point3d),
            (AttrType::STR_NONE, check_str_none),
            (AttrType::STR_FOREVER, check_str_forever),
        ];

        for (bit, check) in checks {
            if !ty.contains(bit) {
                continue;
            }
            match check(text) {
                ValueFit::Pass => return,
                ValueFit::PassTrimmed => {
                    self.diags.push(Diagnostic::warning(range, "Value contains spaces."));
                    return;
                }
                ValueFit::Fail => {
                    record_fail(&mut first_fail, Diagnostic::error(range, fail_message(bit, attr, text)));
                }
            }
        }
        if ty.contains(AttrType::COLOR) && self.check_color_value(text, range, &mut first_fail) {
            return;
        }

        if ty.contains(AttrType::ENUM) {
            if self.check_enum_value(node, attr, text, &mut first_fail) {
                return;
            }
        }
        if ty.contains(AttrType::STYLE) {
            if text == "native" || self.is_defined(DefinitionType::Style, text) {
                return;
            }
            record_fail(
                &mut first_fail,
                Diagnostic::error(range, format!("No definition found for style \"{}\".", text)),
            );
        }
        if ty.contains(AttrType::STYLE_ARRAY) {
            if self.check_style_array(text, range, &mut first_fail) {
                return;
            }
        }
        if ty.contains(AttrType::IMAGE) {
            if self.is_defined(DefinitionType::Image, text) {
                return;
            }
            record_fail(
                &mut first_fail,
                Diagnostic::error(range, format!("No definition found for image \"{}\".", text)),
            );
        }
        if ty.contains(AttrType::SHAPE) {
            if self.is_defined(DefinitionType::Shape, text) {
                return;
            }
            record_fail(
                &mut first_fail,
                Diagnostic::error(range, format!("No definition found for shape \"{}\".", text)),
            );
        }
        if ty.contains(AttrType::FONT) {
            if self.is_defined(DefinitionType::Font, text) {
                return;
            }
            record_fail(
                &mut first_fail,
                Diagnostic::error(range, format!("No definition found for font \"{}\".", text)),
            );
        }
        if ty.contains(AttrType::FORM) {
            if self.check_form_value(id, node, attr, text, &mut warnings, &mut first_fail) {
                self.diags.extend(warnings);
                return;
            }
        }
        if ty.contains(AttrType::URI) {
            if self.check_uri_value(text, range, &mut first_fail) {
                return;
            }
        }
        if ty.contains(AttrType::STRING) {
            return;
        }

        if let Some(diag) = first_fail {
            self.diags.push(diag);
        }
    }

    fn is_defined(&mut self, ty: DefinitionType, value: &str) -> bool {
        let uri = self.doc.uri.clone();
        self.reg.is_defined(ty, value, &uri, self.ctx)
    }

    fn check_color_value(
        &mut self,
        text: &str,
        range: TextRange,
        first_fail: &mut Option<Diagnostic>,
    ) -> bool {
        if let Some((rgba, _)) = color::parse_color(text) {
            self.colors.push((range, rgba));
            return true;
        }
        if let Some(value) = self.ctx.models.default_color(text) {
            if let Some((rgba, _)) = color::parse_color(value) {
                self.colors.push((range, rgba));
            }
            return true;
        }
        let uri = self.doc.uri.clone();
        if self.reg.is_defined(DefinitionType::Color, text, &uri, self.ctx) {
            return true;
        }
        record_fail(
            first_fail,
            Diagnostic::error(range, format!("No definition found for color \"{}\".", text)),
        );
        false
    }

    fn check_enum_value(
        &mut self,
        node: &crate::xml::XmlNode,
        attr: &XmlAttr,
        text: &str,
        first_fail: &mut Option<Diagnostic>,
    ) -> bool {
        let siblings: Vec<(String, String)> = node
            .attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        let entries = self
            .ctx
            .models
            .find_valid_enum_entries(&node.name, &attr.name, &siblings);
        if entries.is_empty() {
            return true;
        }
        for token in text.split_whitespace() {
            if !enum_entry_matches(&entries, token) {
                record_fail(
                    first_fail,
                    Diagnostic::error(
                        attr.value_range,
                        format!(
                            "\"{}\" is not a valid value for \"{}\". Valid values: {}.",
                            token,
                            attr.name,
                            entries.join(", ")
                        ),
                    ),
                );
                return false;
            }
        }
        true
    }

    fn check_style_array(
        &mut self,
        text: &str,
        range: TextRange,
        first_fail: &mut Option<Diagnostic>,
    ) -> bool {
        let mut all_ok = true;
        for token in text.split_whitespace() {
            if token == "native" || self.is_defined(DefinitionType::Style, token) {
                continue;
            }
            record_fail(
                first_fail,
                Diagnostic::error(range, format!("No definition found for style \"{}\".", token)),
            );
            all_ok = false;
        }
        all_ok
    }

    fn check_form_value(
        &mut self,
        _id: NodeId,
        node: &crate::xml::XmlNode,
        attr: &XmlAttr,
        text: &str,
        warnings: &mut Vec<Diagnostic>,
        first_fail: &mut Option<Diagnostic>,
    ) -> bool {
        let uri = self.doc.uri.clone();
        let qualified_ok = self.reg.is_defined(DefinitionType::Form, text, &uri, self.ctx);

        if attr.name == "form.name" && !qualified_ok {
            // an unqualified hit in another namespace earns a suggestion
            let suggestion = self.find_qualified_suggestion(text, &uri);
            if let Some(suggestion) = suggestion {
                record_fail(
                    first_fail,
                    Diagnostic::error(
                        attr.value_range,
                        format!("Did you mean \"{}\"?", suggestion),
                    ),
                );
                return false;
            }
        }
        if !qualified_ok {
            record_fail(
                first_fail,
                Diagnostic::error(
                    attr.value_range,
                    format!("No definition found for form \"{}\".", text),
                ),
            );
            return false;
        }

        // the referenced form's dependency variables must resolve here
        self.check_form_dependencies(node, attr, text, warnings);
        true
    }

    fn find_qualified_suggestion(&mut self, text: &str, uri: &str) -> Option<String> {
        if text.contains('/') {
            return None;
        }
        let opts = ScopeOptions { force_qualified: true, ..ScopeOptions::default() };
        let defs = self
            .reg
            .find_definitions(&[DefinitionType::Form], uri, &opts, self.ctx);
        defs.into_iter()
            .map(|(name, _)| name)
            .find(|name| name.rsplit_once('/').is_some_and(|(_, base)| base == text))
    }

    fn check_form_dependencies(
        &mut self,
        node: &crate::xml::XmlNode,
        attr: &XmlAttr,
        form_name: &str,
        warnings: &mut Vec<Diagnostic>,
    ) {
        let uri = self.doc.uri.clone();
        let base = form_name.rsplit_once('/').map(|(_, b)| b).unwrap_or(form_name);

        let mut dependencies: Vec<(String, Location)> = Vec::new();
        let opts = ScopeOptions { allow_foreign_namespaces: true, ..ScopeOptions::default() };
        self.reg.for_each_file_in_scope(&uri, &opts, self.ctx, &mut |info| {
            if let Some(deps) = info.form_dependencies.get(base) {
                for dep in deps {
                    let scope_range = info.doc.node(dep.scope).open_range;
                    dependencies.push((dep.name.clone(), Location::new(info.uri.clone(), scope_range)));
                }
            }
            false
        });

        for (dep_name, dep_scope) in dependencies {
            let sites = pack::vars::find_define_sites_at(
                self.reg,
                self.ctx,
                &uri,
                node.open_range.start,
                &dep_name,
                false,
            );
            if sites.is_empty() {
                warnings.push(
                    Diagnostic::error(
                        attr.value_range,
                        format!("No definition found for variable \"{}\".", dep_name),
                    )
                    .with_related(dep_scope, "Required by the referenced form."),
                );
            }
        }
    }

    fn check_uri_value(
        &mut self,
        text: &str,
        range: TextRange,
        first_fail: &mut Option<Diagnostic>,
    ) -> bool {
        for skip in ["https://", "http://", "local://$", "object://"] {
            if text.starts_with(skip) {
                return true;
            }
        }
        let uri = self.doc.uri.clone();
        if let Some(resolved) = self.reg.resolve_uri(text, &uri, self.ctx.fs) {
            if self.ctx.fs.exists(&resolved) {
                return true;
            }
        }
        record_fail(
            first_fail,
            Diagnostic::error(range, format!("File not found: \"{}\".", text)),
        );
        false
    }
}

fn record_fail(slot: &mut Option<Diagnostic>, diag: Diagnostic) {
    if slot.is_none() {
        *slot = Some(diag);
    }
}

fn fail_message(bit: AttrType, attr: &XmlAttr, text: &str) -> String {
    let expected = bit.describe();
    format!("\"{}\" is not a valid {} value for \"{}\".", text, expected, attr.name)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
