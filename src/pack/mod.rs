//! Cross-file scope: skin-pack root discovery, include/import graph
//! traversal, namespace qualification, definition lookup, and external
//! patterns.

pub mod file_info;
pub mod vars;

pub use file_info::*;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, warn};

use crate::document::DocumentStore;
use crate::host::{Clock, FileSystem};
use crate::model::{AttrType, ClassModelManager};
use crate::{Location, TextRange};

/// Minimum interval between two re-indexes of the same file.
pub const REFRESH_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Read-only capabilities a registry query needs.
pub struct QueryCtx<'a> {
    pub fs: &'a dyn FileSystem,
    pub clock: &'a dyn Clock,
    pub models: &'a ClassModelManager,
    pub docs: &'a DocumentStore,
    pub platform: Option<&'a str>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeOptions {
    /// Visit files of every namespace (completion wants the whole pack).
    pub allow_foreign_namespaces: bool,
    /// Additionally visit files of this namespace (the lookup target's).
    pub target_namespace: Option<String>,
    /// Variable lookups: only exact name matches, no postfix resolution.
    pub force_exact: bool,
    /// Render qualified names even for the querying file's own namespace.
    pub force_qualified: bool,
}

/// A glob declared via `<External name="pat*"/>` in a skin root.
#[derive(Debug, Clone)]
pub struct ExternalPattern {
    pub pattern: String,
    pub regex: Regex,
    pub location: Location,
}

/// A use site that only an external pattern justified.
#[derive(Debug, Clone)]
pub struct ExternalRequest {
    pub name: String,
    pub def_type: DefinitionType,
    pub location: Location,
}

struct FileEntry {
    info: SkinFileInfo,
    last_refresh: Instant,
    doc_version: Option<u64>,
    mtime: Option<std::time::SystemTime>,
}

/// Files of one pack in scope order; the first `reachable` entries are in
/// the root's include/import graph, the rest were found by directory walk.
#[derive(Debug, Clone, Default)]
struct PackIndex {
    files: Vec<String>,
    reachable: usize,
}

/// Owner of every per-file index; all scope-aware queries go through here.
#[derive(Default)]
pub struct PackRegistry {
    files: HashMap<String, FileEntry>,
    /// directory → skin-pack root directory (None = no skin.xml above)
    root_cache: HashMap<PathBuf, Option<PathBuf>>,
    /// pack root uri → indexed file list
    indexed_packs: HashMap<String, PackIndex>,
    /// pack root uri → external patterns declared there
    externals: HashMap<String, Vec<ExternalPattern>>,
    /// pack root uri → use sites justified only by an external pattern
    external_requests: HashMap<String, Vec<ExternalRequest>>,
    skins_locations: Vec<PathBuf>,
}

/// Collapse `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Glob → anchored regex: `*` is the only wildcard, everything else is
/// matched literally.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::with_capacity(pattern.len() + 8);
    re.push('^');
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    // `$`-variable patterns stay open-ended: the tail is substituted later
    if !pattern.starts_with('$') {
        re.push('$');
    }
    Regex::new(&re)
}

fn split_qualified(value: &str) -> (&str, &str) {
    match value.find('/') {
        Some(0) => ("", &value[1..]),
        Some(i) => (&value[..i], &value[i + 1..]),
        None => ("", value),
    }
}

impl PackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_skins_locations(&mut self, locations: Vec<PathBuf>) {
        self.skins_locations = locations;
    }

    pub fn skins_locations(&self) -> &[PathBuf] {
        &self.skins_locations
    }

    // ─── Root discovery ──────────────────────────────────────────

    /// Walk up from `uri` to the nearest directory containing `skin.xml`.
    /// Returns that skin.xml's uri. Cached per directory.
    pub fn find_skin_root(&mut self, uri: &str, fs: &dyn FileSystem) -> Option<String> {
        let path = Path::new(uri);
        let start = if fs.is_dir(path) { path } else { path.parent()? };

        let mut probe = Some(start);
        let mut walked: Vec<PathBuf> = Vec::new();
        let mut found: Option<PathBuf> = None;
        while let Some(dir) = probe {
            if let Some(cached) = self.root_cache.get(dir) {
                found = cached.clone();
                break;
            }
            walked.push(dir.to_path_buf());
            if fs.exists(&dir.join("skin.xml")) {
                found = Some(dir.to_path_buf());
                break;
            }
            probe = dir.parent();
        }
        for dir in walked {
            self.root_cache.insert(dir, found.clone());
        }
        found.map(|dir| dir.join("skin.xml").to_string_lossy().into_owned())
    }

    pub fn is_skin_root(&mut self, uri: &str, fs: &dyn FileSystem) -> bool {
        self.find_skin_root(uri, fs).as_deref() == Some(uri)
    }

    // ─── File infos ──────────────────────────────────────────────

    fn current_source(&self, uri: &str, ctx: &QueryCtx) -> Option<(String, Option<u64>)> {
        if let Some(doc) = ctx.docs.get(uri) {
            return Some((doc.text.clone(), Some(doc.version)));
        }
        ctx.fs.read(Path::new(uri)).ok().map(|text| (text, None))
    }

    /// Parse `uri` if it is not indexed yet; re-index when the source
    /// changed, but at most once per [`REFRESH_MIN_INTERVAL`].
    pub fn ensure_info(&mut self, uri: &str, ctx: &QueryCtx) -> bool {
        let now = ctx.clock.now();
        if let Some(entry) = self.files.get(uri) {
            if now.duration_since(entry.last_refresh) < REFRESH_MIN_INTERVAL {
                return true;
            }
            let changed = match entry.doc_version {
                Some(v) => ctx.docs.version(uri) != Some(v),
                None => ctx.fs.mtime(Path::new(uri)) != entry.mtime,
            };
            if !changed {
                return true;
            }
        }
        let Some((text, doc_version)) = self.current_source(uri, ctx) else {
            return false;
        };
        let namespace = self
            .files
            .get(uri)
            .map(|e| e.info.namespace.clone())
            .unwrap_or_default();
        let mut info = SkinFileInfo::parse(uri, &text, ctx.platform, Some(ctx.models));
        info.namespace = namespace;
        debug!(uri, definitions = info.definitions.values().map(|m| m.len()).sum::<usize>(), "indexed skin file");
        self.files.insert(
            uri.to_string(),
            FileEntry {
                info,
                last_refresh: now,
                doc_version,
                mtime: ctx.fs.mtime(Path::new(uri)),
            },
        );
        true
    }

    /// Explicit re-index request (the "document edited" signal), still gated
    /// by the minimum refresh interval.
    pub fn refresh_definitions(&mut self, uri: &str, ctx: &QueryCtx) {
        self.ensure_info(uri, ctx);
    }

    pub fn info(&self, uri: &str) -> Option<&SkinFileInfo> {
        self.files.get(uri).map(|e| &e.info)
    }

    pub fn namespace_of(&self, uri: &str) -> &str {
        self.files.get(uri).map(|e| e.info.namespace.as_str()).unwrap_or("")
    }

    pub fn duplicates_for(&self, uri: &str) -> &[DuplicateDefinition] {
        self.files
            .get(uri)
            .map(|e| e.info.duplicates.as_slice())
            .unwrap_or(&[])
    }

    // ─── URI resolution ──────────────────────────────────────────

    /// Resolve a url value. `@pack` jumps to another skin pack's root;
    /// absolute (`/`) paths resolve against the pack root; everything else
    /// resolves against the referencing file's directory.
    pub fn resolve_uri(&mut self, value: &str, base_uri: &str, fs: &dyn FileSystem) -> Option<PathBuf> {
        if let Some(pack) = value.strip_prefix('@') {
            for location in &self.skins_locations {
                let candidate = location.join(pack).join("skin.xml");
                if fs.exists(&candidate) {
                    return Some(normalize_path(&candidate));
                }
            }
            return None;
        }
        if let Some(rest) = value.strip_prefix('/') {
            let root = self.find_skin_root(base_uri, fs)?;
            let root_dir = Path::new(&root).parent()?.to_path_buf();
            return Some(normalize_path(&root_dir.join(rest)));
        }
        let base_dir = Path::new(base_uri).parent()?;
        Some(normalize_path(&base_dir.join(value)))
    }

    // ─── Pack indexing & scope ───────────────────────────────────

    /// Index the whole pack rooted at `root_uri`: walk the root's include
    /// graph (assigning namespaces), expand imports, pick up stray files,
    /// load external patterns and requests.
    pub fn ensure_pack_indexed(&mut self, root_uri: &str, ctx: &QueryCtx) {
        if self.indexed_packs.contains_key(root_uri) {
            return;
        }
        self.indexed_packs.insert(root_uri.to_string(), PackIndex::default());

        let mut ordered: Vec<String> = Vec::new();
        self.walk_includes(root_uri, "", &mut ordered, ctx);
        let reachable = ordered.len();

        // stray pack files no include mentions (namespace stays "")
        if let Some(root_dir) = Path::new(root_uri).parent() {
            for file in collect_xml_files(root_dir, ctx.fs) {
                let uri = file.to_string_lossy().into_owned();
                if !ordered.contains(&uri) && self.ensure_info(&uri, ctx) {
                    ordered.push(uri);
                }
            }
        }

        self.load_externals(root_uri, ctx);
        self.collect_external_requests(root_uri, &ordered, ctx);
        self.indexed_packs
            .insert(root_uri.to_string(), PackIndex { files: ordered, reachable });
    }

    fn walk_includes(
        &mut self,
        uri: &str,
        namespace: &str,
        ordered: &mut Vec<String>,
        ctx: &QueryCtx,
    ) {
        if ordered.contains(&uri.to_string()) {
            return;
        }
        if !self.ensure_info(uri, ctx) {
            return;
        }
        // first include wins the namespace assignment
        if let Some(entry) = self.files.get_mut(uri) {
            if entry.info.namespace.is_empty() {
                entry.info.namespace = namespace.to_string();
            }
        }
        ordered.push(uri.to_string());

        let (includes, imports) = {
            let info = &self.files[uri].info;
            (info.includes.clone(), info.imports.clone())
        };
        for inc in includes {
            let child_ns = if inc.namespace.is_empty() { namespace.to_string() } else { inc.namespace.clone() };
            if let Some(resolved) = self.resolve_uri(&inc.url, uri, ctx.fs) {
                let child_uri = resolved.to_string_lossy().into_owned();
                if ctx.fs.exists(&resolved) {
                    self.walk_includes(&child_uri, &child_ns, ordered, ctx);
                }
                // missing includes contribute nothing to scope
            }
        }
        for imp in imports {
            if let Some(resolved) = self.resolve_uri(&imp.url, uri, ctx.fs) {
                let child_uri = resolved.to_string_lossy().into_owned();
                if ctx.fs.exists(&resolved) {
                    self.walk_includes(&child_uri, namespace, ordered, ctx);
                }
            }
        }
    }

    /// Whether `uri` is reachable through the root's include/import graph
    /// (directory strays are indexed but not reachable).
    pub fn is_in_include_graph(&mut self, uri: &str, ctx: &QueryCtx) -> bool {
        let Some(root) = self.find_skin_root(uri, ctx.fs) else {
            return false;
        };
        self.ensure_pack_indexed(&root, ctx);
        let Some(pack) = self.indexed_packs.get(&root) else {
            return false;
        };
        pack.files.iter().take(pack.reachable).any(|f| f == uri)
    }

    /// Ordered scope of `uri`: the file itself, depth-first through its
    /// includes, then every other file of the same pack.
    pub fn scope_uris(&mut self, uri: &str, ctx: &QueryCtx) -> Vec<String> {
        let Some(root) = self.find_skin_root(uri, ctx.fs) else {
            // not inside a pack: the file alone
            return if self.ensure_info(uri, ctx) { vec![uri.to_string()] } else { Vec::new() };
        };
        self.ensure_pack_indexed(&root, ctx);

        let mut ordered: Vec<String> = Vec::new();
        let mut own = Vec::new();
        self.walk_includes_scoped(uri, &mut own, ctx);
        ordered.extend(own);

        if let Some(pack) = self.indexed_packs.get(&root) {
            for file in &pack.files {
                if !ordered.contains(file) {
                    ordered.push(file.clone());
                }
            }
        }
        ordered
    }

    fn walk_includes_scoped(&mut self, uri: &str, ordered: &mut Vec<String>, ctx: &QueryCtx) {
        if ordered.contains(&uri.to_string()) || !self.ensure_info(uri, ctx) {
            return;
        }
        ordered.push(uri.to_string());
        let includes = self.files[uri].info.includes.clone();
        for inc in includes {
            if let Some(resolved) = self.resolve_uri(&inc.url, uri, ctx.fs) {
                if ctx.fs.exists(&resolved) {
                    self.walk_includes_scoped(&resolved.to_string_lossy(), ordered, ctx);
                }
            }
        }
    }

    /// Visit every file in scope until `f` returns true; reports whether the
    /// visit short-circuited.
    pub fn for_each_file_in_scope(
        &mut self,
        uri: &str,
        opts: &ScopeOptions,
        ctx: &QueryCtx,
        f: &mut dyn FnMut(&SkinFileInfo) -> bool,
    ) -> bool {
        let own_ns = self.namespace_of(uri).to_string();
        for file_uri in self.scope_uris(uri, ctx) {
            let Some(info) = self.info(&file_uri) else {
                continue;
            };
            let foreign = !info.namespace.is_empty()
                && info.namespace != own_ns
                && opts.target_namespace.as_deref() != Some(info.namespace.as_str());
            if foreign && !opts.allow_foreign_namespaces {
                continue;
            }
            if f(info) {
                return true;
            }
        }
        false
    }

    // ─── Qualification ───────────────────────────────────────────

    /// Qualify `value` against namespace `ns` for definitions of type `ty`:
    /// prepend `NS/` unless the value already carries a namespace, opts out
    /// with a leading `/`, or the type is not qualifiable.
    pub fn qualify(value: &str, ns: &str, ty: DefinitionType) -> String {
        if !ty.qualifiable() || ns.is_empty() || value.contains('/') {
            return value.to_string();
        }
        format!("{}/{}", ns, value)
    }

    // ─── Lookups ─────────────────────────────────────────────────

    /// All definition sites of `ty` named `value` visible from `from_uri`.
    /// An `override="true"` site beats every other candidate.
    pub fn lookup_definition(
        &mut self,
        ty: DefinitionType,
        value: &str,
        from_uri: &str,
        opts: &ScopeOptions,
        ctx: &QueryCtx,
    ) -> Vec<Location> {
        if ty == DefinitionType::Variable {
            return vars::find_define_sites(self, ctx, from_uri, value, opts.force_exact);
        }

        let own_ns = self.namespace_of(from_uri).to_string();
        let qualified = Self::qualify(value, &own_ns, ty);
        let (target_ns, name) = split_qualified(&qualified);
        let (target_ns, name) = (target_ns.to_string(), name.to_string());

        let mut hits: Vec<(Location, bool)> = Vec::new();
        let scope = ScopeOptions {
            target_namespace: Some(target_ns.clone()),
            ..opts.clone()
        };
        self.for_each_file_in_scope(from_uri, &scope, ctx, &mut |info| {
            let matches_ns = !ty.qualifiable() || info.namespace == target_ns;
            if matches_ns {
                if ty == DefinitionType::Color {
                    if let Some(range) = info.find_color_range(&name) {
                        let is_override = info
                            .find_definition(ty, &name)
                            .map(|s| s.is_override)
                            .unwrap_or(false);
                        hits.push((Location::new(info.uri.clone(), range), is_override));
                    }
                } else if let Some(site) = info.find_definition(ty, &name) {
                    hits.push((Location::new(info.uri.clone(), site.range), site.is_override));
                }
            }
            false
        });

        let overrides: Vec<&(Location, bool)> = hits.iter().filter(|(_, o)| *o).collect();
        if hits.len() > 1 && overrides.len() == 1 {
            return vec![overrides[0].0.clone()];
        }
        if !hits.is_empty() {
            return hits.into_iter().map(|(loc, _)| loc).collect();
        }

        // last resort: the pack's external patterns
        self.match_external(ty, value, from_uri, ctx)
            .map(|loc| vec![loc])
            .unwrap_or_default()
    }

    /// Early-exit defined-ness check, external patterns included.
    pub fn is_defined(
        &mut self,
        ty: DefinitionType,
        value: &str,
        from_uri: &str,
        ctx: &QueryCtx,
    ) -> bool {
        if self.is_defined_strict(ty, value, from_uri, ctx) {
            return true;
        }
        self.match_external(ty, value, from_uri, ctx).is_some()
    }

    /// Defined-ness without the external-pattern escape hatch.
    pub fn is_defined_strict(
        &mut self,
        ty: DefinitionType,
        value: &str,
        from_uri: &str,
        ctx: &QueryCtx,
    ) -> bool {
        if ty == DefinitionType::Variable {
            return !vars::find_define_sites(self, ctx, from_uri, value, false).is_empty();
        }
        let own_ns = self.namespace_of(from_uri).to_string();
        let qualified = Self::qualify(value, &own_ns, ty);
        let (target_ns, name) = split_qualified(&qualified);
        let (target_ns, name) = (target_ns.to_string(), name.to_string());

        let scope = ScopeOptions {
            target_namespace: Some(target_ns.clone()),
            ..ScopeOptions::default()
        };
        self.for_each_file_in_scope(from_uri, &scope, ctx, &mut |info| {
            let matches_ns = !ty.qualifiable() || info.namespace == target_ns;
            if !matches_ns {
                return false;
            }
            if ty == DefinitionType::Color {
                info.find_color_range(&name).is_some()
            } else {
                info.find_definition(ty, &name).is_some()
            }
        })
    }

    /// Deduplicated `(name, type)` pairs for completion, own namespace
    /// stripped unless `force_qualified`.
    pub fn find_definitions(
        &mut self,
        types: &[DefinitionType],
        from_uri: &str,
        opts: &ScopeOptions,
        ctx: &QueryCtx,
    ) -> Vec<(String, DefinitionType)> {
        let own_ns = self.namespace_of(from_uri).to_string();
        let mut out: Vec<(String, DefinitionType)> = Vec::new();
        let scope = ScopeOptions { allow_foreign_namespaces: true, ..opts.clone() };
        self.for_each_file_in_scope(from_uri, &scope, ctx, &mut |info| {
            for &ty in types {
                let names: Vec<String> = match ty {
                    DefinitionType::Color => info
                        .definition_names(ty)
                        .cloned()
                        .chain(info.color_schemes.values().flat_map(|m| m.keys().cloned()))
                        .collect(),
                    _ => info.definition_names(ty).cloned().collect(),
                };
                for name in names {
                    let display = if !ty.qualifiable() || info.namespace.is_empty() {
                        name
                    } else if info.namespace == own_ns && !opts.force_qualified {
                        name
                    } else {
                        format!("{}/{}", info.namespace, name)
                    };
                    if !out.iter().any(|(n, t)| *n == display && *t == ty) {
                        out.push((display, ty));
                    }
                }
            }
            false
        });
        out.sort();
        out
    }

    // ─── Externals ───────────────────────────────────────────────

    fn load_externals(&mut self, root_uri: &str, ctx: &QueryCtx) {
        let mut patterns = Vec::new();
        if self.ensure_info(root_uri, ctx) {
            let info = &self.files[root_uri].info;
            let doc = info.doc.clone();
            if let Some(root) = doc.root_element() {
                for group in doc.child_elements(root) {
                    if !doc.node(group).name.eq_ignore_ascii_case("externals") {
                        continue;
                    }
                    for ext in doc.child_elements(group) {
                        if !doc.node(ext).name.eq_ignore_ascii_case("external") {
                            continue;
                        }
                        let Some(pattern) = doc.node(ext).attr_value("name") else {
                            continue;
                        };
                        match glob_to_regex(pattern) {
                            Ok(regex) => patterns.push(ExternalPattern {
                                pattern: pattern.to_string(),
                                regex,
                                location: Location::new(root_uri, doc.node(ext).range),
                            }),
                            Err(e) => {
                                warn!(pattern, error = %e, "invalid external pattern");
                            }
                        }
                    }
                }
            }
        }
        self.externals.insert(root_uri.to_string(), patterns);
    }

    /// Match `value` against the pack's external patterns; a hit synthesizes
    /// a location pointing at the `<External>` element.
    pub fn match_external(
        &mut self,
        _ty: DefinitionType,
        value: &str,
        from_uri: &str,
        ctx: &QueryCtx,
    ) -> Option<Location> {
        let root = self.find_skin_root(from_uri, ctx.fs)?;
        self.ensure_pack_indexed(&root, ctx);
        self.externals
            .get(&root)?
            .iter()
            .find(|p| p.regex.is_match(value))
            .map(|p| p.location.clone())
    }

    pub fn external_patterns(&self, root_uri: &str) -> &[ExternalPattern] {
        self.externals.get(root_uri).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn external_requests(&self, root_uri: &str) -> &[ExternalRequest] {
        self.external_requests
            .get(root_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find attribute values across the pack that only an external pattern
    /// justifies; the skin-root check reports the ones still unresolved.
    fn collect_external_requests(&mut self, root_uri: &str, files: &[String], ctx: &QueryCtx) {
        let patterns = self.externals.get(root_uri).cloned().unwrap_or_default();
        if patterns.is_empty() {
            self.external_requests.insert(root_uri.to_string(), Vec::new());
            return;
        }

        const LOOKUP_TYPES: [(AttrType, DefinitionType); 6] = [
            (AttrType::STYLE, DefinitionType::Style),
            (AttrType::STYLE_ARRAY, DefinitionType::Style),
            (AttrType::IMAGE, DefinitionType::Image),
            (AttrType::SHAPE, DefinitionType::Shape),
            (AttrType::FONT, DefinitionType::Font),
            (AttrType::FORM, DefinitionType::Form),
        ];

        let mut requests: Vec<ExternalRequest> = Vec::new();
        for uri in files {
            let Some(info) = self.info(uri) else { continue };
            let doc = info.doc.clone();
            let mut candidates: Vec<(DefinitionType, String, TextRange)> = Vec::new();
            for node in doc.nodes.iter().filter(|n| n.is_element()) {
                for attr in &node.attrs {
                    if attr.value.is_empty() || attr.value.contains('$') {
                        continue;
                    }
                    let Some((ty_mask, _)) = ctx.models.find_attribute_type(&node.name, &attr.name)
                    else {
                        continue;
                    };
                    for (bit, def_ty) in LOOKUP_TYPES {
                        if !ty_mask.contains(bit) {
                            continue;
                        }
                        if patterns.iter().any(|p| p.regex.is_match(&attr.value)) {
                            candidates.push((def_ty, attr.value.clone(), attr.value_range));
                        }
                        break;
                    }
                }
            }
            for (def_ty, value, range) in candidates {
                if !self.is_defined_strict(def_ty, &value, uri, ctx)
                    && !requests.iter().any(|r| r.name == value && r.def_type == def_ty)
                {
                    requests.push(ExternalRequest {
                        name: value,
                        def_type: def_ty,
                        location: Location::new(uri.clone(), range),
                    });
                }
            }
        }
        debug!(root = root_uri, count = requests.len(), "external requests collected");
        self.external_requests.insert(root_uri.to_string(), requests);
    }
}

fn collect_xml_files(dir: &Path, fs: &dyn FileSystem) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs.read_dir(&current) {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if entry.extension().is_some_and(|e| e.eq_ignore_ascii_case("xml")) {
                out.push(entry);
            }
        }
    }
    out.sort();
    out
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "pack_tests.rs"]
mod tests;
