//! Syntactic attribute-value checks: one predicate per attribute-type bit.
//! Scope-dependent checks (styles, images, forms, uris) live in the checker
//! itself; everything here is a pure function of the text.

use std::sync::LazyLock;

use regex::Regex;

static INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());
static FONT_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").unwrap());

/// Outcome of a syntactic check: the value can pass, pass with a warning
/// ("contains spaces"), or fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFit {
    Pass,
    PassTrimmed,
    Fail,
}

fn fit(text: &str, accepts: impl Fn(&str) -> bool) -> ValueFit {
    if accepts(text) {
        ValueFit::Pass
    } else if text != text.trim() && accepts(text.trim()) {
        ValueFit::PassTrimmed
    } else {
        ValueFit::Fail
    }
}

pub fn check_bool(text: &str) -> ValueFit {
    fit(text, |t| t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false"))
}

pub fn check_int(text: &str) -> ValueFit {
    if text.contains("@property:") {
        return ValueFit::Pass;
    }
    fit(text, |t| INT_RE.is_match(t))
}

pub fn check_float(text: &str) -> ValueFit {
    if text.contains("@property:") {
        return ValueFit::Pass;
    }
    fit(text, |t| FLOAT_RE.is_match(t))
}

/// Font sizes allow a leading `+` (relative to the inherited size).
pub fn check_font_size(text: &str) -> ValueFit {
    fit(text, |t| FONT_SIZE_RE.is_match(t))
}

/// Durations are floats with an optional `ms` suffix.
pub fn check_duration(text: &str) -> ValueFit {
    fit(text, |t| {
        let t = t.strip_suffix("ms").map(str::trim_end).unwrap_or(t);
        FLOAT_RE.is_match(t)
    })
}

fn comma_floats(text: &str) -> Option<usize> {
    let mut count = 0;
    for part in text.split(',') {
        if !FLOAT_RE.is_match(part.trim()) {
            return None;
        }
        count += 1;
    }
    Some(count)
}

/// `"l[,t[,w[,h]]]"`: one to four floats.
pub fn check_size(text: &str) -> ValueFit {
    match comma_floats(text) {
        Some(1..=4) => ValueFit::Pass,
        _ => ValueFit::Fail,
    }
}

/// `"l,t,w,h"`: exactly four floats.
pub fn check_rect(text: &str) -> ValueFit {
    match comma_floats(text) {
        Some(4) => ValueFit::Pass,
        _ => ValueFit::Fail,
    }
}

/// Two floats.
pub fn check_point(text: &str) -> ValueFit {
    match comma_floats(text) {
        Some(2) => ValueFit::Pass,
        _ => ValueFit::Fail,
    }
}

/// Three floats.
pub fn check_point3d(text: &str) -> ValueFit {
    match comma_floats(text) {
        Some(3) => ValueFit::Pass,
        _ => ValueFit::Fail,
    }
}

pub fn check_str_none(text: &str) -> ValueFit {
    fit(text, |t| t == "none")
}

pub fn check_str_forever(text: &str) -> ValueFit {
    fit(text, |t| t == "forever")
}

/// Enum entries match directly or with underscores stripped.
pub fn enum_entry_matches(entries: &[String], token: &str) -> bool {
    entries.iter().any(|e| e == token)
        || entries
            .iter()
            .any(|e| e.replace('_', "") == token.replace('_', ""))
}
