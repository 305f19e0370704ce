//! Qualitative colour palettes for figures.
//!
//! `tab10` and `tab20` reproduce matplotlib's category maps so figures match the
//! colours people already use for gel quantification plots.

use plotters::style::RGBColor;

use crate::error::AppError;

pub const TAB10: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

pub const TAB20: [RGBColor; 20] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xae, 0xc7, 0xe8),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0xff, 0xbb, 0x78),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0x98, 0xdf, 0x8a),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0xff, 0x98, 0x96),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0xc5, 0xb0, 0xd5),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xc4, 0x9c, 0x94),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0xf7, 0xb6, 0xd2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xc7, 0xc7, 0xc7),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0xdb, 0xdb, 0x8d),
    RGBColor(0x17, 0xbe, 0xcf),
    RGBColor(0x9e, 0xda, 0xe5),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Palette {
    Tab10,
    Tab20,
    Custom(Vec<RGBColor>),
}

impl Palette {
    /// Parse `tab10`, `tab20`, or a comma-separated list of `#rrggbb` colours.
    pub fn parse(spec: &str) -> Result<Self, AppError> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "tab10" => Ok(Palette::Tab10),
            "tab20" => Ok(Palette::Tab20),
            _ => {
                let colors = spec
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(parse_hex)
                    .collect::<Result<Vec<_>, _>>()?;
                if colors.is_empty() {
                    return Err(AppError::input("Palette must be tab10, tab20, or a list of hex colours."));
                }
                Ok(Palette::Custom(colors))
            }
        }
    }

    fn colors(&self) -> &[RGBColor] {
        match self {
            Palette::Tab10 => &TAB10,
            Palette::Tab20 => &TAB20,
            Palette::Custom(c) => c,
        }
    }

    /// The `i`-th colour, cycling when `i` runs past the palette.
    pub fn color(&self, i: usize) -> RGBColor {
        let colors = self.colors();
        if colors.is_empty() {
            return RGBColor(0, 0, 0);
        }
        colors[i % colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors().is_empty()
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex(s: &str) -> Result<RGBColor, AppError> {
    let hex = s.trim().trim_start_matches('#');
    let bad = || AppError::input(format!("Invalid colour '{}': expected #rrggbb.", s.trim()));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(bad());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}
