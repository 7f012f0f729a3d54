//! Themes, palettes and rc-style overrides resolved into concrete colors.

use crate::config::{Palette, PlotStyle, Theme};
use plotters::style::RGBColor;
use tracing::warn;

/// Base font size in pixels before `font_scale` is applied.
const BASE_FONT_SIZE: f64 = 12.0;

/// Override keys that are understood; anything else is ignored with a warning.
pub const RECOGNIZED_OVERRIDES: [&str; 5] = [
    "figure.facecolor",
    "axes.facecolor",
    "grid.color",
    "lines.linewidth",
    "font.size",
];

/// Concrete styling used by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    pub figure_background: RGBColor,
    pub axes_background: RGBColor,
    /// Grid line color; `None` draws no grid.
    pub grid: Option<RGBColor>,
    pub axis_color: RGBColor,
    pub text_color: RGBColor,
    /// Draw outward tick marks on both axes.
    pub ticks: bool,
    pub palette: Vec<RGBColor>,
    pub line_width: u32,
    pub font_size: f64,
    /// Whether a font was registered and text can be drawn.
    pub text: bool,
}

impl FigureStyle {
    /// Resolve a style from the configuration. Text stays disabled until the
    /// renderer registers a font.
    pub fn from_plot_style(style: &PlotStyle) -> Self {
        let light_grey = RGBColor(0xEA, 0xEA, 0xF2);
        let (axes_background, grid, ticks) = match style.theme {
            Theme::WhiteGrid => (WHITE, Some(RGBColor(0xCC, 0xCC, 0xCC)), false),
            Theme::DarkGrid => (light_grey, Some(WHITE), false),
            Theme::White => (WHITE, None, false),
            Theme::Dark => (light_grey, None, false),
            Theme::Ticks => (WHITE, None, true),
        };

        let mut resolved = Self {
            figure_background: WHITE,
            axes_background,
            grid,
            axis_color: RGBColor(0x33, 0x33, 0x33),
            text_color: RGBColor(0x26, 0x26, 0x26),
            ticks,
            palette: palette_colors(style.palette),
            line_width: 2,
            font_size: BASE_FONT_SIZE * style.font_scale,
            text: false,
        };

        for (key, value) in &style.overrides {
            resolved.apply_override(key, value);
        }
        resolved
    }

    fn apply_override(&mut self, key: &str, value: &str) {
        let applied = match key {
            "figure.facecolor" => parse_color(value).map(|c| self.figure_background = c),
            "axes.facecolor" => parse_color(value).map(|c| self.axes_background = c),
            "grid.color" => parse_color(value).map(|c| self.grid = Some(c)),
            "lines.linewidth" => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|w| *w > 0.0)
                .map(|w| self.line_width = w.round().max(1.0) as u32),
            "font.size" => value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|s| *s > 0.0)
                .map(|s| self.font_size = s),
            _ => {
                warn!("Ignoring unknown style override '{}'", key);
                return;
            }
        };
        if applied.is_none() {
            warn!("Ignoring invalid value '{}' for style override '{}'", value, key);
        }
    }

    /// Color of the `i`-th series, cycling through the palette.
    pub fn series_color(&self, i: usize) -> RGBColor {
        if self.palette.is_empty() {
            return self.axis_color;
        }
        self.palette[i % self.palette.len()]
    }

    /// Font size in pixels for a role relative to the base size.
    pub fn font_px(&self, relative: f64) -> f64 {
        (self.font_size * relative).max(6.0)
    }
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self::from_plot_style(&PlotStyle::default())
    }
}

const WHITE: RGBColor = RGBColor(0xFF, 0xFF, 0xFF);

fn hex(value: u32) -> RGBColor {
    RGBColor((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

/// The ten colors of a named palette.
pub fn palette_colors(palette: Palette) -> Vec<RGBColor> {
    let values: [u32; 10] = match palette {
        Palette::Deep => [
            0x4C72B0, 0xDD8452, 0x55A868, 0xC44E52, 0x8172B3, 0x937860, 0xDA8BC3, 0x8C8C8C,
            0xCCB974, 0x64B5CD,
        ],
        Palette::Muted => [
            0x4878D0, 0xEE854A, 0x6ACC64, 0xD65F5F, 0x956CB4, 0x8C613C, 0xDC7EC0, 0x797979,
            0xD5BB67, 0x82C6E2,
        ],
        Palette::Pastel => [
            0xA1C9F4, 0xFFB482, 0x8DE5A1, 0xFF9F9B, 0xD0BBFF, 0xDEBB9B, 0xFAB0E4, 0xCFCFCF,
            0xFFFEA3, 0xB9F2F0,
        ],
        Palette::Bright => [
            0x023EFF, 0xFF7C00, 0x1AC938, 0xE8000B, 0x8B2BE2, 0x9F4800, 0xF14CC1, 0xA3A3A3,
            0xFFC400, 0x00D7FF,
        ],
        Palette::Dark => [
            0x001C7F, 0xB1400D, 0x12711C, 0x8C0800, 0x591E71, 0x592F0D, 0xA23582, 0x3C3C3C,
            0xB8850A, 0x006374,
        ],
        Palette::Colorblind => [
            0x0173B2, 0xDE8F05, 0x029E73, 0xD55E00, 0xCC78BC, 0xCA9161, 0xFBAFE4, 0x949494,
            0xECE133, 0x56B4E9,
        ],
    };
    values.iter().map(|v| hex(*v)).collect()
}

/// Parse `#rgb`, `#rrggbb` or a handful of color names.
pub fn parse_color(value: &str) -> Option<RGBColor> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "white" | "w" => return Some(WHITE),
        "black" | "k" => return Some(RGBColor(0, 0, 0)),
        "grey" | "gray" => return Some(RGBColor(0x80, 0x80, 0x80)),
        "none" | "transparent" => return None,
        _ => {}
    }

    let digits = value.strip_prefix('#')?;
    match digits.len() {
        6 => u32::from_str_radix(digits, 16).ok().map(hex),
        3 => {
            let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
            u32::from_str_radix(&expanded, 16).ok().map(hex)
        }
        _ => None,
    }
}

/// Diverging blue-white-red color for `value` in `[-1, 1]`; NaN is grey.
pub fn coolwarm(value: f64) -> RGBColor {
    if !value.is_finite() {
        return RGBColor(0xC0, 0xC0, 0xC0);
    }
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = value.clamp(-1.0, 1.0);
    let (from, to, f) = if t < 0.0 {
        (MID, COLD, -t)
    } else {
        (MID, WARM, t)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}
