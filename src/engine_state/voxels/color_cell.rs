//! # Color Cells
//!
//! The value stored in every voxel: either nothing, or a color. Colors coming
//! from scripts are kept as written (CSS text such as `"#ff8800"` or
//! `"hsl(120, 50%, 50%)"`) or as already-resolved RGB triples, and are only
//! resolved to numbers when the mesh is built.
//!
//! All numeric colors are sRGB with components in `0.0..=1.0`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::named_colors::NAMED_COLORS;

/// Returned when color text cannot be understood.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color `{0}`")]
pub struct ColorParseError(pub String);

/// An sRGB color with components in `0.0..=1.0`.
///
/// Serializes as `#rrggbb` text so configuration files can write colors the
/// same way scripts do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
}

impl Rgb {
    /// Pure green, the color given to cells whose script result is `true`.
    pub const GREEN: Rgb = Rgb {
        r: 0.0,
        g: 1.0,
        b: 0.0,
    };

    /// Creates a color, clamping each component into `0.0..=1.0`.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Creates a color from a packed `0xRRGGBB` value.
    pub fn from_hex(hex: u32) -> Self {
        Self::from_bytes((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    /// Creates a color from 8-bit channels.
    pub fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses CSS color text.
    ///
    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`/`rgba()` with
    /// integer or percentage channels, `hsl()`/`hsla()`, and the CSS named
    /// colors. Alpha is accepted and ignored. Matching is case-insensitive.
    ///
    /// # Arguments
    /// * `text` - The color text
    ///
    /// # Returns
    /// The parsed color, or `ColorParseError` naming the offending text
    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let normalized = text.trim().to_ascii_lowercase();
        let invalid = || ColorParseError(text.to_string());

        if let Some(hex) = normalized.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        if let Some((name, args)) = split_function(&normalized) {
            let parsed = match name {
                "rgb" | "rgba" => parse_rgb_args(args),
                "hsl" | "hsla" => parse_hsl_args(args),
                _ => None,
            };
            return parsed.ok_or_else(invalid);
        }

        NAMED_COLORS
            .get(normalized.as_str())
            .map(|hex| Rgb::from_hex(*hex))
            .ok_or_else(invalid)
    }

    /// Components as an array, in `[r, g, b]` order.
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Components converted from sRGB to linear light.
    pub fn to_linear(self) -> [f32; 3] {
        fn channel(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |c: f32| (c * 255.0).round() as u8;
        write!(f, "#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::parse(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 | 4 => Some(Rgb::from_bytes(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 | 8 => Some(Rgb::from_bytes(byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}

fn split_function(text: &str) -> Option<(&str, &str)> {
    let open = text.find('(')?;
    let body = text[open + 1..].strip_suffix(')')?;
    Some((text[..open].trim(), body))
}

/// Splits functional-notation arguments on commas, whitespace and the `/`
/// alpha separator.
fn arguments(body: &str) -> Vec<&str> {
    body.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_rgb_args(body: &str) -> Option<Rgb> {
    let args = arguments(body);
    if args.len() < 3 {
        return None;
    }
    let channel = |arg: &str| -> Option<f32> {
        match arg.strip_suffix('%') {
            Some(pct) => pct.parse::<f32>().ok().map(|p| p / 100.0),
            None => arg.parse::<f32>().ok().map(|v| v / 255.0),
        }
    };
    Some(Rgb::new(channel(args[0])?, channel(args[1])?, channel(args[2])?))
}

fn parse_hsl_args(body: &str) -> Option<Rgb> {
    let args = arguments(body);
    if args.len() < 3 {
        return None;
    }
    let hue = args[0].strip_suffix("deg").unwrap_or(args[0]).parse::<f32>().ok()?;
    let percent = |arg: &str| -> Option<f32> {
        arg.strip_suffix('%')
            .unwrap_or(arg)
            .parse::<f32>()
            .ok()
            .map(|p| (p / 100.0).clamp(0.0, 1.0))
    };
    let (s, l) = (percent(args[1])?, percent(args[2])?);
    Some(hsl_to_rgb(hue.rem_euclid(360.0) / 360.0, s, l))
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    if s == 0.0 {
        return Rgb::new(l, l, l);
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        }
    };
    Rgb::new(hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0))
}

/// A color as produced by a script.
#[derive(Debug, Clone, PartialEq)]
pub enum CellColor {
    /// Numeric color, already resolved
    Rgb(Rgb),
    /// Color text, resolved when the mesh is built
    Css(String),
}

impl CellColor {
    /// Resolves the color to numbers.
    pub fn resolve(&self) -> Result<Rgb, ColorParseError> {
        match self {
            CellColor::Rgb(rgb) => Ok(*rgb),
            CellColor::Css(text) => Rgb::parse(text),
        }
    }
}

/// The content of one voxel.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColorCell {
    /// No voxel
    #[default]
    Empty,
    /// A solid voxel of the given color
    Color(CellColor),
}

impl ColorCell {
    /// A solid cell holding color text.
    pub fn css(text: impl Into<String>) -> Self {
        ColorCell::Color(CellColor::Css(text.into()))
    }

    /// A solid cell holding a numeric color.
    pub fn rgb(rgb: Rgb) -> Self {
        ColorCell::Color(CellColor::Rgb(rgb))
    }

    /// Whether the cell holds a voxel.
    pub fn is_solid(&self) -> bool {
        matches!(self, ColorCell::Color(_))
    }

    /// The cell's color, if it has one.
    pub fn color(&self) -> Option<&CellColor> {
        match self {
            ColorCell::Empty => None,
            ColorCell::Color(color) => Some(color),
        }
    }
}
