use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Palette index 0-255.
    Ansi(u8),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorDepth {
    #[default]
    TrueColor,
    Color256,
    Color16,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color \"{0}\" (expected #RRGGBB, #RGB, 0-255 or a color name)")]
pub struct ColorParseError(pub String);

/// Names accepted in config files, mapped to the 16 base palette slots.
const NAMED: [(&str, u8); 16] = [
    ("black", 0),
    ("red", 1),
    ("green", 2),
    ("yellow", 3),
    ("blue", 4),
    ("magenta", 5),
    ("cyan", 6),
    ("white", 7),
    ("gray", 8),
    ("bright-red", 9),
    ("bright-green", 10),
    ("bright-yellow", 11),
    ("bright-blue", 12),
    ("bright-magenta", 13),
    ("bright-cyan", 14),
    ("bright-white", 15),
];

/// Nominal RGB of the 16 base slots, used for downsampling.
const BASE16_RGB: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (205, 0, 0),
    (0, 205, 0),
    (205, 205, 0),
    (0, 0, 238),
    (205, 0, 205),
    (0, 205, 205),
    (229, 229, 229),
    (127, 127, 127),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (92, 92, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

impl Color {
    pub fn parse(s: &str) -> Result<Self, ColorParseError> {
        let raw = s.trim();
        let err = || ColorParseError(s.to_owned());

        if let Some(hex) = raw.strip_prefix('#') {
            let digits: Vec<u8> = hex
                .chars()
                .map(|c| c.to_digit(16).and_then(|d| u8::try_from(d).ok()))
                .collect::<Option<_>>()
                .ok_or_else(err)?;
            return match digits.as_slice() {
                [r, g, b] => Ok(Self::Rgb {
                    r: r * 17,
                    g: g * 17,
                    b: b * 17,
                }),
                [r1, r2, g1, g2, b1, b2] => Ok(Self::Rgb {
                    r: r1 * 16 + r2,
                    g: g1 * 16 + g2,
                    b: b1 * 16 + b2,
                }),
                _ => Err(err()),
            };
        }

        if let Ok(n) = raw.parse::<u8>() {
            return Ok(Self::Ansi(n));
        }

        let lower = raw.to_ascii_lowercase().replace(['_', ' '], "-");
        let name = if lower == "grey" { "gray" } else { lower.as_str() };
        NAMED
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, idx)| Self::Ansi(*idx))
            .ok_or_else(err)
    }

    /// Convert for crossterm at the given color depth.
    ///
    /// Palette slots 0-15 use crossterm's named variants so the terminal's
    /// own 16-color theme applies.
    pub fn to_crossterm_color(self, depth: ColorDepth) -> crossterm::style::Color {
        match (depth, self) {
            (_, Self::Ansi(n)) if n < 16 => base16_to_crossterm(n),
            (ColorDepth::TrueColor, Self::Rgb { r, g, b }) => crossterm::style::Color::Rgb { r, g, b },
            (ColorDepth::TrueColor | ColorDepth::Color256, Self::Ansi(n)) => {
                crossterm::style::Color::AnsiValue(n)
            }
            (ColorDepth::Color256, Self::Rgb { r, g, b }) => {
                crossterm::style::Color::AnsiValue(nearest_256((r, g, b)))
            }
            (ColorDepth::Color16, color) => base16_to_crossterm(nearest_16(color.rgb())),
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Rgb { r, g, b } => (r, g, b),
            Self::Ansi(n) => palette_rgb(n),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ansi(n) => write!(f, "{n}"),
            Self::Rgb { r, g, b } => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl ColorDepth {
    /// Detect terminal color depth from `COLORTERM` and `TERM`.
    pub fn detect() -> Self {
        Self::from_env(
            std::env::var("COLORTERM").ok().as_deref(),
            std::env::var("TERM").ok().as_deref(),
        )
    }

    pub fn from_env(colorterm: Option<&str>, term: Option<&str>) -> Self {
        if matches!(colorterm, Some("truecolor" | "24bit")) {
            return Self::TrueColor;
        }
        if term.is_some_and(|t| t.contains("256color")) {
            return Self::Color256;
        }
        Self::Color16
    }
}

fn base16_to_crossterm(n: u8) -> crossterm::style::Color {
    use crossterm::style::Color as C;
    const TABLE: [C; 16] = [
        C::Black,
        C::DarkRed,
        C::DarkGreen,
        C::DarkYellow,
        C::DarkBlue,
        C::DarkMagenta,
        C::DarkCyan,
        C::Grey,
        C::DarkGrey,
        C::Red,
        C::Green,
        C::Yellow,
        C::Blue,
        C::Magenta,
        C::Cyan,
        C::White,
    ];
    TABLE
        .get(usize::from(n))
        .copied()
        .unwrap_or(C::AnsiValue(n))
}

/// RGB of an xterm-256 palette entry.
fn palette_rgb(n: u8) -> (u8, u8, u8) {
    match n {
        0..=15 => BASE16_RGB[usize::from(n)],
        16..=231 => {
            let i = n - 16;
            let level = |x: u8| CUBE_LEVELS[usize::from(x)];
            (level(i / 36), level((i / 6) % 6), level(i % 6))
        }
        232..=255 => {
            let v = 8 + 10 * (n - 232);
            (v, v, v)
        }
    }
}

fn distance((r1, g1, b1): (u8, u8, u8), (r2, g2, b2): (u8, u8, u8)) -> u32 {
    let d = |a: u8, b: u8| {
        let x = i32::from(a) - i32::from(b);
        x.unsigned_abs().pow(2)
    };
    d(r1, r2) + d(g1, g2) + d(b1, b2)
}

/// Closest entry among the cube and grey ramp (16-255).
fn nearest_256(rgb: (u8, u8, u8)) -> u8 {
    (16..=255u8)
        .min_by_key(|&n| distance(rgb, palette_rgb(n)))
        .unwrap_or(16)
}

/// Closest of the 16 base slots.
fn nearest_16(rgb: (u8, u8, u8)) -> u8 {
    (0..16u8)
        .min_by_key(|&n| distance(rgb, BASE16_RGB[usize::from(n)]))
        .unwrap_or(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_round_trips_cube_entries() {
        assert_eq!(palette_rgb(196), (255, 0, 0));
        assert_eq!(nearest_256((255, 0, 0)), 196);
        assert_eq!(palette_rgb(232), (8, 8, 8));
    }

    #[test]
    fn nearest_16_prefers_matching_hue() {
        assert_eq!(nearest_16((250, 10, 10)), 9);
        assert_eq!(nearest_16((10, 10, 10)), 0);
        assert_eq!(nearest_16((0, 190, 0)), 2);
    }
}
