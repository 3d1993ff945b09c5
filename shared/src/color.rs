use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ColorParseError, NoDataError};

pub const DEFAULT_COLOR_CLASSES: usize = 5;
pub const DEFAULT_LOW_COLOR: Color = Color::new(0xe5, 0xf5, 0xf9);
pub const DEFAULT_HIGH_COLOR: Color = Color::new(0x2c, 0xa2, 0x5f);
pub const DEFAULT_NO_VALUE_COLOR: Color = Color::new(0xf0, 0xf0, 0xf0);

/// An sRGB color, serialized as a CSS hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        self.to_string()
    }

}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError {
            input: s.to_string(),
        };
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| err());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Color space used to interpolate across the color range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Rgb,
    Hsl,
}

/// Color at position `t` (clamped to 0..1) between `low` and `high`.
pub fn interpolate(low: Color, high: Color, t: f64, mode: ColorMode) -> Color {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    match mode {
        ColorMode::Rgb => Color::new(
            lerp_u8(low.r, high.r, t),
            lerp_u8(low.g, high.g, t),
            lerp_u8(low.b, high.b, t),
        ),
        ColorMode::Hsl => {
            let (h, s, l) = interpolate_hsl(rgb_to_hsl(low), rgb_to_hsl(high), t);
            hsl_to_rgb(h, s, l)
        }
    }
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

/// Returns (h: 0..360, s: 0..1, l: 0..1).
pub fn rgb_to_hsl(color: Color) -> (f64, f64, f64) {
    let r = color.r as f64 / 255.0;
    let g = color.g as f64 / 255.0;
    let b = color.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d.abs() < f64::EPSILON {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if (max - r).abs() < f64::EPSILON {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if (max - g).abs() < f64::EPSILON {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Color {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return Color::new(v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let h = h / 360.0;
    let channel = |t: f64| (hue_channel(p, q, t) * 255.0).round() as u8;

    Color::new(channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn hue_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Interpolate two HSL triples along the shortest hue path.
fn interpolate_hsl(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> (f64, f64, f64) {
    // Gray has no meaningful hue; borrow the other end's so the sweep doesn't detour.
    let from_h = if from.1 < f64::EPSILON { to.0 } else { from.0 };
    let to_h = if to.1 < f64::EPSILON { from_h } else { to.0 };

    let mut dh = to_h - from_h;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    (
        (from_h + dh * t).rem_euclid(360.0),
        from.1 + (to.1 - from.1) * t,
        from.2 + (to.2 - from.2) * t,
    )
}

/// Equal-interval classification of the full value range onto a color ramp.
///
/// Built once from every value in the dataset so colors stay comparable
/// across years.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    breakpoints: Vec<f64>,
    low: Color,
    high: Color,
    mode: ColorMode,
    no_value: Color,
}

/// Build a scale with `num_classes` classes over `[min, max]` of `values`.
///
/// Non-finite inputs are ignored. A dataset where every value is equal
/// collapses to a single class.
pub fn classify<I>(values: I, num_classes: usize, range: [Color; 2]) -> Result<ColorScale, NoDataError>
where
    I: IntoIterator<Item = f64>,
{
    let (min, max) = values
        .into_iter()
        .filter(|value| value.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
        .ok_or(NoDataError)?;

    let classes = if min == max { 1 } else { num_classes.max(1) };
    let step = (max - min) / classes as f64;
    let mut breakpoints: Vec<f64> = (0..=classes).map(|i| min + step * i as f64).collect();
    if let Some(last) = breakpoints.last_mut() {
        *last = max;
    }

    Ok(ColorScale {
        breakpoints,
        low: range[0],
        high: range[1],
        mode: ColorMode::default(),
        no_value: DEFAULT_NO_VALUE_COLOR,
    })
}

impl ColorScale {
    pub fn with_mode(mut self, mode: ColorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_no_value_color(mut self, color: Color) -> Self {
        self.no_value = color;
        self
    }

    /// `(min, max)` of the classified values.
    pub fn domain(&self) -> (f64, f64) {
        (self.breakpoints[0], self.breakpoints[self.breakpoints.len() - 1])
    }

    /// Class boundaries, `num_classes() + 1` of them, from min to max.
    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn num_classes(&self) -> usize {
        self.breakpoints.len() - 1
    }

    pub fn no_value_color(&self) -> Color {
        self.no_value
    }

    /// Index of the class `value` falls in. Out-of-range values land in the
    /// first or last class.
    pub fn class_of(&self, value: f64) -> usize {
        let inner = &self.breakpoints[1..self.num_classes()];
        inner.iter().take_while(|bound| value >= **bound).count()
    }

    pub fn class_color(&self, class: usize) -> Color {
        let classes = self.num_classes();
        let t = if classes <= 1 {
            0.0
        } else {
            class.min(classes - 1) as f64 / (classes - 1) as f64
        };
        interpolate(self.low, self.high, t, self.mode)
    }

    /// All class colors, lowest class first.
    pub fn class_colors(&self) -> Vec<Color> {
        (0..self.num_classes()).map(|c| self.class_color(c)).collect()
    }

    /// Fill for a value, or the no-value color when absent or not finite.
    pub fn color_for(&self, value: Option<f64>) -> Color {
        match value.filter(|v| v.is_finite()) {
            Some(value) => self.class_color(self.class_of(value)),
            None => self.no_value,
        }
    }
}
