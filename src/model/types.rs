//! Core data types for the class model: the attribute type bitset, class
//! and enumeration definitions, documentation blocks.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;

bitflags! {
    /// Attribute type mask. Composite types are disjunctions of kind bits
    /// (e.g. `SHAPE | URI`); the empty mask is "no type" and is the identity
    /// under union.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrType: u32 {
        const BOOL        = 1 << 0;
        const INT         = 1 << 1;
        const FLOAT       = 1 << 2;
        const STRING      = 1 << 3;
        const ENUM        = 1 << 4;
        const COLOR       = 1 << 5;
        const SIZE        = 1 << 6;
        const RECT        = 1 << 7;
        const IMAGE       = 1 << 8;
        const POINT       = 1 << 9;
        const POINT3D     = 1 << 10;
        const URI         = 1 << 11;
        const STYLE       = 1 << 12;
        const STYLE_ARRAY = 1 << 13;
        const SHAPE       = 1 << 14;
        const FONT        = 1 << 15;
        const FORM        = 1 << 16;
        const FONT_SIZE   = 1 << 17;
        const DURATION    = 1 << 18;
        const STR_NONE    = 1 << 19;
        const STR_FOREVER = 1 << 20;
    }
}

impl AttrType {
    /// Parse a model type spec like `"stylearray"` or `"shape|uri"`.
    /// Unknown names fall back to `STRING` so a newer model stays usable.
    pub fn parse(spec: &str) -> AttrType {
        let mut ty = AttrType::empty();
        for part in spec.split('|') {
            ty |= match part.trim().to_ascii_lowercase().as_str() {
                "" | "notype" => AttrType::empty(),
                "bool" | "boolean" => AttrType::BOOL,
                "int" | "integer" => AttrType::INT,
                "float" => AttrType::FLOAT,
                "string" => AttrType::STRING,
                "enum" => AttrType::ENUM,
                "color" => AttrType::COLOR,
                "size" => AttrType::SIZE,
                "rect" => AttrType::RECT,
                "image" => AttrType::IMAGE,
                "point" => AttrType::POINT,
                "point3d" => AttrType::POINT3D,
                "uri" | "url" => AttrType::URI,
                "style" => AttrType::STYLE,
                "stylearray" | "styles" => AttrType::STYLE_ARRAY,
                "shape" => AttrType::SHAPE,
                "font" => AttrType::FONT,
                "form" => AttrType::FORM,
                "fontsize" => AttrType::FONT_SIZE,
                "duration" => AttrType::DURATION,
                "none" => AttrType::STR_NONE,
                "forever" => AttrType::STR_FOREVER,
                _ => AttrType::STRING,
            };
        }
        ty
    }

    /// Human-readable name list for hover output, e.g. `"shape | uri"`.
    pub fn describe(self) -> String {
        if self.is_empty() {
            return "any".to_string();
        }
        let mut parts = Vec::new();
        for (bit, label) in [
            (AttrType::BOOL, "bool"),
            (AttrType::INT, "int"),
            (AttrType::FLOAT, "float"),
            (AttrType::STRING, "string"),
            (AttrType::ENUM, "enum"),
            (AttrType::COLOR, "color"),
            (AttrType::SIZE, "size"),
            (AttrType::RECT, "rect"),
            (AttrType::IMAGE, "image"),
            (AttrType::POINT, "point"),
            (AttrType::POINT3D, "point3d"),
            (AttrType::URI, "uri"),
            (AttrType::STYLE, "style"),
            (AttrType::STYLE_ARRAY, "style[]"),
            (AttrType::SHAPE, "shape"),
            (AttrType::FONT, "font"),
            (AttrType::FORM, "form"),
            (AttrType::FONT_SIZE, "fontsize"),
            (AttrType::DURATION, "duration"),
            (AttrType::STR_NONE, "\"none\""),
            (AttrType::STR_FOREVER, "\"forever\""),
        ] {
            if self.contains(bit) {
                parts.push(label);
            }
        }
        parts.join(" | ")
    }
}

// ─── Documentation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub brief: Option<String>,
    pub detailed: Option<String>,
    pub code: Option<String>,
}

impl DocBlock {
    pub fn is_empty(&self) -> bool {
        self.brief.is_none() && self.detailed.is_none() && self.code.is_none()
    }
}

// ─── Classes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AttrDef {
    pub name: String,
    pub ty: AttrType,
    pub docs: DocBlock,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub is_abstract: bool,
    /// Declared attributes in model order.
    pub attributes: Vec<AttrDef>,
    /// Schema groups this class belongs to; None means "inherit".
    pub schema_groups: Option<Vec<String>>,
    /// Group its children must belong to; None means "inherit".
    pub children_group: Option<String>,
    pub docs: DocBlock,
}

impl ClassDef {
    pub fn attribute(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_ci(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

// ─── Enumerations ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EnumEntry {
    pub name: String,
    pub docs: DocBlock,
}

/// Enumeration keyed by its dotted `Class.attribute` name. `parent` points
/// at another dotted key whose entries are inherited.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub entries: Vec<EnumEntry>,
    pub parent: Option<String>,
}

// ─── Whole model ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ClassModel {
    pub classes: HashMap<String, ClassDef>,
    /// lowercase class name → exact name, for case-insensitive lookups
    pub classes_ci: HashMap<String, String>,
    /// dotted `Class.attribute` → enumeration
    pub enums: HashMap<String, EnumDef>,
    /// named default colors usable anywhere a color literal is
    pub default_colors: BTreeMap<String, String>,
    /// `Theme.<name>` metric values
    pub theme_metrics: BTreeMap<String, f64>,
    /// localized language identifiers (`?language` gating vocabulary)
    pub languages: Vec<String>,
}

impl ClassModel {
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    pub fn class_ci(&self, name: &str) -> Option<&ClassDef> {
        self.classes
            .get(name)
            .or_else(|| self.classes_ci.get(&name.to_ascii_lowercase()).and_then(|n| self.classes.get(n)))
    }

    pub fn insert_class(&mut self, class: ClassDef) {
        self.classes_ci.insert(class.name.to_ascii_lowercase(), class.name.clone());
        self.classes.insert(class.name.clone(), class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_and_composite() {
        assert_eq!(AttrType::parse("bool"), AttrType::BOOL);
        assert_eq!(AttrType::parse("shape|uri"), AttrType::SHAPE | AttrType::URI);
        assert_eq!(AttrType::parse("int | forever"), AttrType::INT | AttrType::STR_FOREVER);
        assert_eq!(AttrType::parse(""), AttrType::empty());
    }

    #[test]
    fn test_parse_unknown_falls_back_to_string() {
        assert_eq!(AttrType::parse("gizmo"), AttrType::STRING);
    }

    #[test]
    fn test_empty_is_identity_under_union() {
        let ty = AttrType::COLOR | AttrType::empty();
        assert_eq!(ty, AttrType::COLOR);
    }

    #[test]
    fn test_describe() {
        assert_eq!(AttrType::empty().describe(), "any");
        assert_eq!((AttrType::SHAPE | AttrType::URI).describe(), "uri | shape");
        assert_eq!((AttrType::RECT | AttrType::STR_NONE).describe(), "rect | \"none\"");
    }

    #[test]
    fn test_class_ci_lookup() {
        let mut model = ClassModel::default();
        model.insert_class(ClassDef {
            name: "Button".to_string(),
            parent: None,
            is_abstract: false,
            attributes: Vec::new(),
            schema_groups: None,
            children_group: None,
            docs: DocBlock::default(),
        });
        assert!(model.class("Button").is_some());
        assert!(model.class("button").is_none());
        assert!(model.class_ci("button").is_some());
    }
}
