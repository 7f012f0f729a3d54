//! Text metrics for the report fonts.
//!
//! The standard Helvetica faces use the Adobe font metrics in 1/1000 em for
//! the printable ASCII range; anything outside that range is measured as an
//! average glyph. An embedded TrueType font is measured from its own advance
//! widths.

use crate::error::{EdaError, Result};
use ab_glyph::{Font, FontVec, GlyphId};
use std::path::Path;
use std::sync::Arc;

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Width used for glyphs outside the printable ASCII range.
const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// The three faces used by the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
}

impl FontFace {
    pub const ALL: [FontFace; 3] = [FontFace::Regular, FontFace::Bold, FontFace::Italic];

    /// Resource name inside a page.
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
            FontFace::Italic => "F3",
        }
    }

    /// Name of the standard 14 font.
    pub fn base_font(&self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
            FontFace::Italic => "Helvetica-Oblique",
        }
    }

    fn glyph_width(&self, byte: u8) -> u16 {
        let table = match self {
            FontFace::Bold => &HELVETICA_BOLD,
            // oblique shares the upright metrics
            FontFace::Regular | FontFace::Italic => &HELVETICA,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            _ => FALLBACK_WIDTH,
        }
    }
}

/// Convert a font size in points to millimetres.
#[inline]
pub fn pt_to_mm(size: f64) -> f64 {
    size / PT_PER_MM
}

/// Encode text for a WinAnsi-encoded standard font. Latin-1 characters map
/// to their code point; everything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Font the report text is set in.
#[derive(Debug, Clone, Default)]
pub enum DocumentFont {
    /// Standard Helvetica faces, WinAnsi encoded.
    #[default]
    Helvetica,
    /// One TrueType font embedded for all three faces.
    TrueType(Arc<TrueTypeFont>),
}

impl DocumentFont {
    /// Load a TrueType font file for embedding.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::TrueType(Arc::new(TrueTypeFont::load(path)?)))
    }

    /// Rendered width of `text` in millimetres.
    pub fn text_width(&self, text: &str, face: FontFace, size_pt: f64) -> f64 {
        let units: f64 = match self {
            Self::Helvetica => encode_win_ansi(text)
                .into_iter()
                .map(|b| f64::from(face.glyph_width(b)))
                .sum(),
            Self::TrueType(font) => text
                .chars()
                .map(|c| font.glyph_width(font.glyph_id(c)))
                .sum(),
        };
        units / 1000.0 * pt_to_mm(size_pt)
    }

    /// Break `text` into lines no wider than `max_width` millimetres.
    ///
    /// Explicit newlines always break. Words are kept whole where they fit
    /// and split by character where a single word is wider than the line.
    pub fn wrap_text(&self, text: &str, max_width: f64, face: FontFace, size_pt: f64) -> Vec<String> {
        let width = |s: &str| self.text_width(s, face, size_pt);
        let mut lines = Vec::new();

        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split(' ') {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if width(&candidate) <= max_width {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                for c in word.chars() {
                    current.push(c);
                    if width(&current) > max_width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
            lines.push(current);
        }

        lines
    }
}

/// A TrueType font embedded as a CID-keyed font with `Identity-H` encoding:
/// text is written as big-endian glyph ids.
#[derive(Debug)]
pub struct TrueTypeFont {
    name: String,
    font: FontVec,
}

impl TrueTypeFont {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name: String = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let name = if name.is_empty() {
            "EmbeddedFont".to_string()
        } else {
            name
        };
        Self::from_bytes(name, data)
            .map_err(|_| EdaError::InvalidFont(path.display().to_string()))
    }

    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let font =
            FontVec::try_from_vec(data).map_err(|_| EdaError::InvalidFont(name.clone()))?;
        Ok(Self { name, font })
    }

    /// PostScript-safe name used as `BaseFont`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The font program.
    pub fn data(&self) -> &[u8] {
        self.font.as_slice()
    }

    /// Glyph id of `c`; 0 (`.notdef`) when the font lacks it.
    pub fn glyph_id(&self, c: char) -> u16 {
        self.font.glyph_id(c).0
    }

    /// Advance width in 1/1000 em.
    pub fn glyph_width(&self, glyph: u16) -> f64 {
        f64::from(self.font.h_advance_unscaled(GlyphId(glyph))) * self.scale()
    }

    /// Ascent in 1/1000 em.
    pub fn ascent(&self) -> f64 {
        f64::from(self.font.ascent_unscaled()) * self.scale()
    }

    /// Descent in 1/1000 em, negative below the baseline.
    pub fn descent(&self) -> f64 {
        f64::from(self.font.descent_unscaled()) * self.scale()
    }

    pub fn italic_angle(&self) -> f64 {
        f64::from(self.font.italic_angle())
    }

    /// Text as two-byte glyph ids.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        text.chars()
            .flat_map(|c| self.glyph_id(c).to_be_bytes())
            .collect()
    }

    fn scale(&self) -> f64 {
        1000.0 / f64::from(self.font.units_per_em().unwrap_or(1000.0))
    }
}
