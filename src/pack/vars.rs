//! Variable resolver: expands `$var` tokens to the set of possible concrete
//! strings by walking the enclosing scope: `define` siblings, `foreach` and
//! `styleselector` ancestors, and across form boundaries into every site
//! that instantiates the enclosing form.
//!
//! Termination: a visited set keyed by `(uri, element_start)` cuts
//! instantiation cycles, a candidate is never substituted by a string still
//! containing the same variable, and resolution rounds are bounded.

use std::collections::HashSet;

use crate::expr;
use crate::xml::{NodeId, XmlDocument, XmlNode};
use crate::Location;

use super::file_info::normalize_define_value;
use super::{DefinitionType, PackRegistry, QueryCtx, ScopeOptions};

const MAX_WORLDS: usize = 64;
const MAX_ROUNDS: usize = 10;
const MAX_JUMP_DEPTH: usize = 8;
const MAX_FOREACH_UNROLL: i64 = 100;

// ─── Scope sites ─────────────────────────────────────────────────────

/// One variable-contributing site, nearest-first within a path.
#[derive(Debug, Clone)]
struct ScopeSite {
    name: String,
    values: Vec<String>,
    location: Location,
}

fn find_node_at(doc: &XmlDocument, offset: usize) -> Option<NodeId> {
    doc.nodes
        .iter()
        .position(|n| n.is_element() && n.open_range.start == offset)
        .or_else(|| doc.node_at_offset(offset))
}

fn foreach_site(node: &XmlNode, uri: &str) -> Option<ScopeSite> {
    let variable = node.attr("variable")?;
    let name = variable.value.trim_start_matches('$').to_string();
    if name.is_empty() {
        return None;
    }
    let location = Location::new(uri, variable.name_range);

    if let Some(list) = node.attr_value("in") {
        let values = if list.contains('$') {
            vec![format!("@foreach:([{}])", list)]
        } else {
            list.split([',', ' '])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        return Some(ScopeSite { name, values, location });
    }

    let start = node.attr_value("start")?;
    let count = node.attr_value("count")?;
    let values = match (start.parse::<i64>(), count.parse::<i64>()) {
        (Ok(s), Ok(c)) if (0..=MAX_FOREACH_UNROLL).contains(&c) => {
            (s..s + c).map(|i| i.to_string()).collect()
        }
        _ => vec![format!("@foreach:({},{})", start, count)],
    };
    Some(ScopeSite { name, values, location })
}

fn styleselector_site(node: &XmlNode, uri: &str, namespace: &str) -> Option<ScopeSite> {
    let variable = node.attr("variable")?;
    let name = variable.value.trim_start_matches('$').to_string();
    if name.is_empty() {
        return None;
    }
    let styles = node.attr_value("styles").unwrap_or("");
    let values = styles
        .split_whitespace()
        .map(|s| PackRegistry::qualify(s, namespace, DefinitionType::Style))
        .collect();
    Some(ScopeSite { name, values, location: Location::new(uri, variable.name_range) })
}

/// Every instantiation site of `form` visible from `uri`:
/// `(file uri, element start offset)`.
fn instantiation_sites(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    form: &str,
) -> Vec<(String, usize)> {
    let mut out = Vec::new();
    let opts = ScopeOptions { allow_foreign_namespaces: true, ..ScopeOptions::default() };
    reg.for_each_file_in_scope(uri, &opts, ctx, &mut |info| {
        for (view_name, instances) in &info.view_instantiations {
            let matches = view_name == form
                || view_name
                    .rsplit_once('/')
                    .is_some_and(|(_, base)| base == form);
            if !matches {
                continue;
            }
            for inst in instances {
                out.push((info.uri.clone(), info.doc.node(inst.node).open_range.start));
            }
        }
        false
    });
    out
}

/// Walk upward from `(uri, elem_offset)` collecting contribution paths.
/// One path per instantiation chain; sites are nearest-first within a path.
fn collect_paths(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    elem_offset: usize,
    visited: &mut HashSet<(String, usize)>,
    depth: usize,
) -> Vec<Vec<ScopeSite>> {
    if depth > MAX_JUMP_DEPTH || !reg.ensure_info(uri, ctx) {
        return vec![Vec::new()];
    }
    let (doc, namespace) = {
        let info = reg.info(uri).expect("ensured above");
        (info.doc.clone(), info.namespace.clone())
    };
    let Some(start_node) = find_node_at(&doc, elem_offset) else {
        return vec![Vec::new()];
    };

    let mut local: Vec<ScopeSite> = Vec::new();
    let mut form_name: Option<String> = None;
    let mut current = start_node;
    loop {
        for sib in doc.preceding_siblings(current) {
            let n = doc.node(sib);
            if n.is_element() && n.name == "define" {
                for attr in &n.attrs {
                    local.push(ScopeSite {
                        name: attr.name.clone(),
                        values: vec![normalize_define_value(&attr.value)],
                        location: Location::new(uri, attr.name_range),
                    });
                }
            }
        }
        let Some(parent) = doc.parent(current) else {
            break;
        };
        let p = doc.node(parent);
        match p.name.as_str() {
            "foreach" => {
                if let Some(site) = foreach_site(p, uri) {
                    local.push(site);
                }
            }
            "styleselector" => {
                if let Some(site) = styleselector_site(p, uri, &namespace) {
                    local.push(site);
                }
            }
            "Form" => {
                if form_name.is_none() {
                    form_name = p.attr_value("name").map(str::to_string);
                }
            }
            _ => {}
        }
        current = parent;
    }

    let mut paths = vec![local];
    if let Some(form) = form_name {
        let mut branch_paths: Vec<Vec<ScopeSite>> = Vec::new();
        for (site_uri, site_off) in instantiation_sites(reg, ctx, uri, &form) {
            if !visited.insert((site_uri.clone(), site_off)) {
                continue;
            }
            branch_paths.extend(collect_paths(reg, ctx, &site_uri, site_off, visited, depth + 1));
        }
        if !branch_paths.is_empty() {
            let local0 = paths.pop().unwrap_or_default();
            for branch in branch_paths {
                let mut path = local0.clone();
                path.extend(branch);
                paths.push(path);
                if paths.len() >= MAX_WORLDS {
                    break;
                }
            }
        }
    }
    paths
}

fn theme_sites(ctx: &QueryCtx, uri: &str) -> Vec<ScopeSite> {
    ctx.models
        .theme_metrics()
        .map(|(name, value)| ScopeSite {
            name: format!("Theme.{}", name),
            values: vec![expr::Value::Num(*value).render()],
            location: Location::new(uri, crate::TextRange::empty(0)),
        })
        .collect()
}

fn scope_paths(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    elem_offset: usize,
) -> Vec<Vec<ScopeSite>> {
    let mut visited = HashSet::new();
    visited.insert((uri.to_string(), elem_offset));
    let mut paths = collect_paths(reg, ctx, uri, elem_offset, &mut visited, 0);
    let theme = theme_sites(ctx, uri);
    for path in &mut paths {
        path.extend(theme.iter().cloned());
    }
    paths
}

// ─── Name resolution ─────────────────────────────────────────────────

fn site_matches(site: &ScopeSite, name: &str, force_exact: bool) -> Option<usize> {
    if site.name == name {
        Some(0)
    } else if !force_exact && name.starts_with(site.name.as_str()) {
        Some(name.len() - site.name.len())
    } else {
        None
    }
}

/// Expansions of `name`: longest-name (minimum-postfix) sites win; within a
/// path the nearest such site shadows the rest, different paths contribute
/// alternatives.
fn resolve_name(paths: &[Vec<ScopeSite>], name: &str, force_exact: bool) -> Vec<String> {
    let min_postfix = paths
        .iter()
        .flatten()
        .filter_map(|s| site_matches(s, name, force_exact))
        .min();
    let Some(min_postfix) = min_postfix else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        let site = path
            .iter()
            .find(|s| site_matches(s, name, force_exact) == Some(min_postfix));
        if let Some(site) = site {
            let suffix = &name[name.len() - min_postfix..];
            for value in &site.values {
                let expanded = format!("{}{}", value, suffix);
                if !out.contains(&expanded) {
                    out.push(expanded);
                }
            }
        }
    }
    out
}

// ─── Token worlds ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Concrete(String),
    Var(String),
    /// A variable no site resolves; rendered back as `$name`.
    Stuck(String),
}

fn tokenize(value: &str) -> Vec<Tok> {
    let mut out = Vec::new();
    let bytes = value.as_bytes();
    let mut i = 0;
    let mut plain_start = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let name_start = i + 1;
            let mut j = name_start;
            while j < bytes.len()
                && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_' || bytes[j] == b'.')
            {
                j += 1;
            }
            if j > name_start {
                if plain_start < i {
                    out.push(Tok::Concrete(value[plain_start..i].to_string()));
                }
                out.push(Tok::Var(value[name_start..j].to_string()));
                plain_start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if plain_start < value.len() {
        out.push(Tok::Concrete(value[plain_start..].to_string()));
    }
    out
}

fn render(toks: &[Tok]) -> String {
    let mut out = String::new();
    for tok in toks {
        match tok {
            Tok::Concrete(s) => out.push_str(s),
            Tok::Var(name) | Tok::Stuck(name) => {
                out.push('$');
                out.push_str(name);
            }
        }
    }
    out
}

/// Evaluate embedded `@eval:(…)` payloads once their text is concrete.
fn fold_eval(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;
    while let Some(at) = rest.find("@eval:(") {
        out.push_str(&rest[..at]);
        let payload_start = at + "@eval:(".len();
        let mut depth = 1usize;
        let mut end = None;
        for (i, c) in rest[payload_start..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(payload_start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            out.push_str(&rest[at..]);
            return out;
        };
        let payload = &rest[payload_start..end];
        if payload.contains('$') {
            out.push_str(&rest[at..=end]);
        } else {
            out.push_str(&expr::evaluate(payload).value.render());
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

// ─── Public API ──────────────────────────────────────────────────────

/// Expand a value with `$var` tokens into every concrete string it can take
/// at `(uri, elem_offset)`. Unresolvable tokens stay in place, so a lone
/// unknown `$x` comes back as `["$x"]`.
pub fn resolve_variable(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    elem_offset: usize,
    value: &str,
) -> Vec<String> {
    if !value.contains('$') {
        return vec![value.to_string()];
    }
    let paths = scope_paths(reg, ctx, uri, elem_offset);

    let mut worlds: Vec<Vec<Tok>> = vec![tokenize(value)];
    for _round in 0..MAX_ROUNDS {
        let mut progressed = false;
        let mut next: Vec<Vec<Tok>> = Vec::new();
        for world in worlds {
            let var_pos = world.iter().position(|t| matches!(t, Tok::Var(_)));
            let Some(pos) = var_pos else {
                if !next.contains(&world) {
                    next.push(world);
                }
                continue;
            };
            let Tok::Var(name) = world[pos].clone() else {
                unreachable!()
            };
            progressed = true;
            let expansions: Vec<String> = resolve_name(&paths, &name, false)
                .into_iter()
                .filter(|e| !e.contains(&format!("${}", name)))
                .collect();
            if expansions.is_empty() {
                let mut stuck = world;
                stuck[pos] = Tok::Stuck(name);
                if !next.contains(&stuck) {
                    next.push(stuck);
                }
                continue;
            }
            for expansion in expansions {
                let mut replaced: Vec<Tok> = world[..pos].to_vec();
                replaced.extend(tokenize(&expansion));
                replaced.extend(world[pos + 1..].iter().cloned());
                if !next.contains(&replaced) {
                    next.push(replaced);
                }
                if next.len() >= MAX_WORLDS {
                    break;
                }
            }
        }
        worlds = next;
        if !progressed {
            break;
        }
    }

    let mut out: Vec<String> = Vec::new();
    for world in &worlds {
        let rendered = fold_eval(&render(world));
        if !out.contains(&rendered) {
            out.push(rendered);
        }
    }
    out
}

/// Variable names visible at `(uri, elem_offset)` starting with `prefix`,
/// completion's data source.
pub fn variables_in_scope(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    elem_offset: usize,
    prefix: &str,
) -> Vec<String> {
    let paths = scope_paths(reg, ctx, uri, elem_offset);
    let mut out: Vec<String> = Vec::new();
    for site in paths.iter().flatten() {
        if site.name.starts_with(prefix) && !out.contains(&site.name) {
            out.push(site.name.clone());
        }
    }
    out.sort();
    out
}

/// Definition sites of variable `name` visible at `(uri, elem_offset)`,
/// minimum-postfix matches only (exact when `force_exact`).
pub fn find_define_sites_at(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    elem_offset: usize,
    name: &str,
    force_exact: bool,
) -> Vec<Location> {
    let name = name.trim_start_matches('$');
    let paths = scope_paths(reg, ctx, uri, elem_offset);
    let min_postfix = paths
        .iter()
        .flatten()
        .filter_map(|s| site_matches(s, name, force_exact))
        .min();
    let Some(min_postfix) = min_postfix else {
        return Vec::new();
    };
    let mut out: Vec<Location> = Vec::new();
    for site in paths.iter().flatten() {
        if site_matches(site, name, force_exact) == Some(min_postfix)
            && !site.location.range.is_empty()
            && !out.contains(&site.location)
        {
            out.push(site.location.clone());
        }
    }
    out
}

/// Position-independent variable lookup used by the registry: every define
/// site (and loop variable) in scope files whose name matches.
pub fn find_define_sites(
    reg: &mut PackRegistry,
    ctx: &QueryCtx,
    uri: &str,
    name: &str,
    force_exact: bool,
) -> Vec<Location> {
    let name = name.trim_start_matches('$').to_string();
    let mut sites: Vec<(usize, Location)> = Vec::new();
    let opts = ScopeOptions { allow_foreign_namespaces: true, ..ScopeOptions::default() };
    reg.for_each_file_in_scope(uri, &opts, ctx, &mut |info| {
        let doc = &info.doc;
        for node in doc.nodes.iter().filter(|n| n.is_element()) {
            match node.name.as_str() {
                "define" => {
                    for attr in &node.attrs {
                        let probe = ScopeSite {
                            name: attr.name.clone(),
                            values: Vec::new(),
                            location: Location::new(info.uri.clone(), attr.name_range),
                        };
                        if let Some(postfix) = site_matches(&probe, &name, force_exact) {
                            sites.push((postfix, probe.location));
                        }
                    }
                }
                "foreach" | "styleselector" => {
                    if let Some(attr) = node.attr("variable") {
                        let var = attr.value.trim_start_matches('$');
                        if !var.is_empty() {
                            let probe = ScopeSite {
                                name: var.to_string(),
                                values: Vec::new(),
                                location: Location::new(info.uri.clone(), attr.name_range),
                            };
                            if let Some(postfix) = site_matches(&probe, &name, force_exact) {
                                sites.push((postfix, probe.location));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        false
    });
    let Some(min_postfix) = sites.iter().map(|(p, _)| *p).min() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (postfix, location) in sites {
        if postfix == min_postfix && !out.contains(&location) {
            out.push(location);
        }
    }
    out
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
