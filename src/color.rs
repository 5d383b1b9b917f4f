//! Color literal parsing and formatting.
//!
//! Accepted literal shapes: `#RGB[A]`, `#RRGGBB[AA]`, `rgb[a](...)` with
//! plain 0–255 or percentage components, `hsl[a](...)`, `hsv[a](...)`.
//! Named default colors are resolved by the caller through the class model
//! before reaching this module.

/// Color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r: r.clamp(0.0, 1.0), g: g.clamp(0.0, 1.0), b: b.clamp(0.0, 1.0), a: a.clamp(0.0, 1.0) }
    }

    pub fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Component-wise equality up to one 8-bit quantization step.
    pub fn close_to(&self, other: &Rgba) -> bool {
        let eps = 1.0 / 255.0 + 1e-6;
        (self.r - other.r).abs() <= eps
            && (self.g - other.g).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.a - other.a).abs() <= eps
    }
}

/// The literal shape a color was written in, so edits can be written back
/// in the same style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorFormat {
    Hex,
    HexWithAlpha,
    Rgb,
    Rgba,
    RgbPercent,
    RgbaPercent,
    Hsl,
    Hsla,
    Hsv,
    Hsva,
}

// ─── Parsing ─────────────────────────────────────────────────────────

fn hex_nibble(b: u8) -> Option<u32> {
    (b as char).to_digit(16)
}

fn parse_hex(text: &str) -> Option<(Rgba, ColorFormat)> {
    let digits = text.strip_prefix('#')?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let n = |i: usize| hex_nibble(digits.as_bytes()[i]).unwrap_or(0);
    match digits.len() {
        3 | 4 => {
            let r = n(0) * 17;
            let g = n(1) * 17;
            let b = n(2) * 17;
            let a = if digits.len() == 4 { n(3) * 17 } else { 255 };
            let format = if digits.len() == 4 { ColorFormat::HexWithAlpha } else { ColorFormat::Hex };
            Some((
                Rgba::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0),
                format,
            ))
        }
        6 | 8 => {
            let byte = |i: usize| n(i) * 16 + n(i + 1);
            let r = byte(0);
            let g = byte(2);
            let b = byte(4);
            let a = if digits.len() == 8 { byte(6) } else { 255 };
            let format = if digits.len() == 8 { ColorFormat::HexWithAlpha } else { ColorFormat::Hex };
            Some((
                Rgba::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0),
                format,
            ))
        }
        _ => None,
    }
}

struct FuncArgs {
    values: Vec<f32>,
    percents: Vec<bool>,
}

fn parse_func_args(inner: &str) -> Option<FuncArgs> {
    let mut values = Vec::new();
    let mut percents = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        let (num, pct) = match part.strip_suffix('%') {
            Some(n) => (n.trim(), true),
            None => (part, false),
        };
        values.push(num.parse::<f32>().ok()?);
        percents.push(pct);
    }
    Some(FuncArgs { values, percents })
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r + m, g + m, b + m)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let h = h.rem_euclid(360.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r + m, g + m, b + m)
}

pub fn rgb_to_hsl(c: Rgba) -> (f32, f32, f32) {
    let max = c.r.max(c.g).max(c.b);
    let min = c.r.min(c.g).min(c.b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f32::EPSILON {
        return (0.0, 0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == c.r {
        60.0 * (((c.g - c.b) / d).rem_euclid(6.0))
    } else if max == c.g {
        60.0 * ((c.b - c.r) / d + 2.0)
    } else {
        60.0 * ((c.r - c.g) / d + 4.0)
    };
    (h, s, l)
}

pub fn rgb_to_hsv(c: Rgba) -> (f32, f32, f32) {
    let max = c.r.max(c.g).max(c.b);
    let min = c.r.min(c.g).min(c.b);
    let v = max;
    let d = max - min;
    if d.abs() < f32::EPSILON {
        return (0.0, 0.0, v);
    }
    let s = if max == 0.0 { 0.0 } else { d / max };
    let h = if max == c.r {
        60.0 * (((c.g - c.b) / d).rem_euclid(6.0))
    } else if max == c.g {
        60.0 * ((c.b - c.r) / d + 2.0)
    } else {
        60.0 * ((c.r - c.g) / d + 4.0)
    };
    (h, s, v)
}

/// Parse a color literal. Returns the color and the shape it was written in.
pub fn parse_color(text: &str) -> Option<(Rgba, ColorFormat)> {
    let text = text.trim();
    if text.starts_with('#') {
        return parse_hex(text);
    }

    let lower = text.to_ascii_lowercase();
    for (prefix, kind) in [
        ("hsla", "hsla"),
        ("hsl", "hsl"),
        ("hsva", "hsva"),
        ("hsv", "hsv"),
        ("rgba", "rgba"),
        ("rgb", "rgb"),
    ] {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let rest = rest.trim();
            let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
            let args = parse_func_args(inner)?;
            return build_func_color(kind, args);
        }
    }
    None
}

fn build_func_color(kind: &str, args: FuncArgs) -> Option<(Rgba, ColorFormat)> {
    let FuncArgs { values, percents } = args;
    match kind {
        "rgb" | "rgba" => {
            let with_alpha = kind == "rgba" || values.len() == 4;
            if values.len() != 3 && values.len() != 4 {
                return None;
            }
            let percent_form = percents[..3.min(percents.len())].iter().all(|&p| p);
            let comp = |i: usize| -> f32 {
                if percent_form { values[i] / 100.0 } else { values[i] / 255.0 }
            };
            let a = if values.len() == 4 {
                let raw = values[3];
                if percents[3] {
                    raw / 100.0
                } else if raw <= 1.0 {
                    raw
                } else {
                    raw / 255.0
                }
            } else {
                1.0
            };
            let format = match (percent_form, with_alpha) {
                (true, true) => ColorFormat::RgbaPercent,
                (true, false) => ColorFormat::RgbPercent,
                (false, true) => ColorFormat::Rgba,
                (false, false) => ColorFormat::Rgb,
            };
            Some((Rgba::new(comp(0), comp(1), comp(2), a), format))
        }
        "hsl" | "hsla" | "hsv" | "hsva" => {
            if values.len() != 3 && values.len() != 4 {
                return None;
            }
            let h = values[0];
            let s = if percents[1] { values[1] / 100.0 } else { values[1] };
            let lv = if percents[2] { values[2] / 100.0 } else { values[2] };
            let a = if values.len() == 4 {
                if percents[3] { values[3] / 100.0 } else { values[3] }
            } else {
                1.0
            };
            let (r, g, b) = if kind.starts_with("hsl") {
                hsl_to_rgb(h, s.clamp(0.0, 1.0), lv.clamp(0.0, 1.0))
            } else {
                hsv_to_rgb(h, s.clamp(0.0, 1.0), lv.clamp(0.0, 1.0))
            };
            let format = match (kind.starts_with("hsl"), values.len() == 4) {
                (true, true) => ColorFormat::Hsla,
                (true, false) => ColorFormat::Hsl,
                (false, true) => ColorFormat::Hsva,
                (false, false) => ColorFormat::Hsv,
            };
            Some((Rgba::new(r, g, b, a), format))
        }
        _ => None,
    }
}

// ─── Formatting ──────────────────────────────────────────────────────

fn to_byte(v: f32) -> u32 {
    (v * 255.0).round().clamp(0.0, 255.0) as u32
}

/// Render a color in the given shape. `parse_color(format_color(c, f))`
/// yields a color equal to `c` within 1/255 per component.
pub fn format_color(c: Rgba, format: ColorFormat) -> String {
    match format {
        ColorFormat::Hex => {
            format!("#{:02X}{:02X}{:02X}", to_byte(c.r), to_byte(c.g), to_byte(c.b))
        }
        ColorFormat::HexWithAlpha => format!(
            "#{:02X}{:02X}{:02X}{:02X}",
            to_byte(c.r),
            to_byte(c.g),
            to_byte(c.b),
            to_byte(c.a)
        ),
        ColorFormat::Rgb => {
            format!("rgb({},{},{})", to_byte(c.r), to_byte(c.g), to_byte(c.b))
        }
        ColorFormat::Rgba => format!(
            "rgba({},{},{},{:.3})",
            to_byte(c.r),
            to_byte(c.g),
            to_byte(c.b),
            c.a
        ),
        ColorFormat::RgbPercent => format!(
            "rgb({:.1}%,{:.1}%,{:.1}%)",
            c.r * 100.0,
            c.g * 100.0,
            c.b * 100.0
        ),
        ColorFormat::RgbaPercent => format!(
            "rgba({:.1}%,{:.1}%,{:.1}%,{:.1}%)",
            c.r * 100.0,
            c.g * 100.0,
            c.b * 100.0,
            c.a * 100.0
        ),
        ColorFormat::Hsl | ColorFormat::Hsla => {
            let (h, s, l) = rgb_to_hsl(c);
            if format == ColorFormat::Hsl {
                format!("hsl({:.0},{:.1}%,{:.1}%)", h, s * 100.0, l * 100.0)
            } else {
                format!("hsla({:.0},{:.1}%,{:.1}%,{:.3})", h, s * 100.0, l * 100.0, c.a)
            }
        }
        ColorFormat::Hsv | ColorFormat::Hsva => {
            let (h, s, v) = rgb_to_hsv(c);
            if format == ColorFormat::Hsv {
                format!("hsv({:.0},{:.1}%,{:.1}%)", h, s * 100.0, v * 100.0)
            } else {
                format!("hsva({:.0},{:.1}%,{:.1}%,{:.3})", h, s * 100.0, v * 100.0, c.a)
            }
        }
    }
}

/// Alternate renderings of a color, hex first; what a color picker offers.
pub fn presentations(c: Rgba) -> Vec<String> {
    let mut out = vec![
        format_color(c, if c.a < 1.0 { ColorFormat::HexWithAlpha } else { ColorFormat::Hex }),
        format_color(c, if c.a < 1.0 { ColorFormat::Rgba } else { ColorFormat::Rgb }),
        format_color(c, if c.a < 1.0 { ColorFormat::Hsla } else { ColorFormat::Hsl }),
    ];
    out.dedup();
    out
}

// ─── Tests ──────────────────────────────────────────────────────────
