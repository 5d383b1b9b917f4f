//! Name-based attribute type refinement.
//!
//! The class model underspecifies many attributes (plain `string`); the
//! analyzer sharpens them from naming conventions so value checking and
//! completion work on real packs. Applied exactly once, after the schema
//! lookup.

use super::types::AttrType;

/// Refine `base` for attribute `attr` on element `elem`.
pub fn guess_type(elem: &str, attr: &str, base: AttrType) -> AttrType {
    // most specific rules first
    if elem == "ShapeImage" && attr == "url" {
        return AttrType::SHAPE | AttrType::URI;
    }
    if elem == "Layout" && attr == "layout.class" {
        return AttrType::ENUM;
    }
    if elem == "Font" && attr == "themeid" {
        return AttrType::FONT;
    }
    if (elem == "Font" && attr == "size") || (elem == "Style" && attr == "textsize") {
        return AttrType::FONT_SIZE;
    }
    if elem == "Animation" && attr == "repeat" {
        return AttrType::INT | AttrType::STR_FOREVER;
    }
    if (elem == "StyleAlias" || elem == "styleselector") && attr == "styles" {
        return AttrType::STYLE_ARRAY;
    }
    if attr == "name" && matches!(elem, "View" | "Target" | "ScrollView") {
        return AttrType::FORM;
    }
    if attr == "form.name" {
        return AttrType::FORM;
    }

    // element-independent name conventions
    if attr.ends_with("color") || attr.ends_with("color.disabled") || attr.ends_with("color.on") {
        return AttrType::COLOR;
    }
    if attr == "style" || attr == "inherit" {
        return AttrType::STYLE_ARRAY;
    }
    if attr.ends_with("image") || attr.ends_with("icon") || attr.ends_with("background") {
        return AttrType::IMAGE;
    }
    if attr == "url" {
        return AttrType::URI;
    }
    if attr == "shaperef" {
        return AttrType::SHAPE;
    }
    if attr == "sizelimits" {
        return AttrType::RECT | AttrType::STR_NONE;
    }
    if attr.ends_with("duration") || attr.ends_with("delay") {
        return AttrType::DURATION;
    }

    base
}
