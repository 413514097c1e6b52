use std::fmt;
use std::str::FromStr;

use crate::error::RenderError;

/// What an export frame is cleared to before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    /// Cleared to `(0, 0, 0, 0)`; marks the export as alpha-aware.
    #[default]
    Transparent,
    Color([u8; 3]),
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("teal", [0, 128, 128]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
];

impl Background {
    pub fn is_transparent(&self) -> bool {
        matches!(self, Background::Transparent)
    }

    /// Normalized RGBA clear value.
    pub fn clear_color(&self) -> [f64; 4] {
        match self {
            Background::Transparent => [0.0, 0.0, 0.0, 0.0],
            Background::Color([r, g, b]) => [
                f64::from(*r) / 255.0,
                f64::from(*g) / 255.0,
                f64::from(*b) / 255.0,
                1.0,
            ],
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Background::Transparent => f.write_str("transparent"),
            Background::Color([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl FromStr for Background {
    type Err = RenderError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let normalized = spec.trim().to_ascii_lowercase();
        let invalid = || RenderError::InvalidOptions(format!("unrecognised background colour '{spec}'"));

        if normalized == "transparent" {
            return Ok(Background::Transparent);
        }
        if let Some(hex) = normalized.strip_prefix('#') {
            return parse_hex(hex).map(Background::Color).ok_or_else(invalid);
        }
        if let Some(args) = normalized
            .strip_prefix("rgba(")
            .or_else(|| normalized.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let expected = if normalized.starts_with("rgba(") { 4 } else { 3 };
            return parse_functional(args, expected)
                .map(Background::Color)
                .ok_or_else(invalid);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, rgb)| Background::Color(*rgb))
            .ok_or_else(invalid)
    }
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some([nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17]),
        // Trailing alpha byte is accepted but the export stays opaque.
        6 | 8 => Some([byte(0)?, byte(2)?, byte(4)?]),
        _ => None,
    }
}

fn parse_functional(args: &str, expected: usize) -> Option<[u8; 3]> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != expected {
        return None;
    }
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        let value: f64 = part.parse().ok()?;
        if !value.is_finite() || !(0.0..=255.0).contains(&value) {
            return None;
        }
        *slot = value.round() as u8;
    }
    if expected == 4 {
        let alpha: f64 = parts[3].parse().ok()?;
        if !alpha.is_finite() {
            return None;
        }
    }
    Some(rgb)
}
