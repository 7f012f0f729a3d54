//! Page display lists and their serialization with `lopdf`.
//!
//! The paginator records what goes on every page in millimetres from the
//! top-left corner. [`write_document`] turns those pages into a PDF with the
//! report fonts and one image XObject per embedded picture.

use super::metrics::{DocumentFont, FontFace, PT_PER_MM, TrueTypeFont, encode_win_ansi};
use crate::error::Result;
use crate::figure::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Stroke width of cell borders in mm.
const LINE_WIDTH: f64 = 0.2;

/// One drawing instruction, positioned in mm from the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    /// Text with its baseline at `y`.
    Text {
        x: f64,
        y: f64,
        size: f64,
        face: FontFace,
        text: String,
    },
    /// Stroked rectangle.
    Rect { x: f64, y: f64, w: f64, h: f64 },
    /// Image drawn into a box; `image` indexes the document's image list.
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        image: usize,
    },
}

/// Everything drawn on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<PageItem>,
}

impl Page {
    /// Text items in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            PageItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Build a PDF from pages of `width` x `height` mm.
pub fn write_document(
    pages: &[Page],
    images: &[RgbImage],
    width: f64,
    height: f64,
    font: &DocumentFont,
) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    match font {
        DocumentFont::Helvetica => {
            for face in FontFace::ALL {
                let font_id = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => face.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                });
                fonts.set(face.resource_name(), font_id);
            }
        }
        DocumentFont::TrueType(ttf) => {
            let font_id = add_truetype_font(&mut doc, ttf, &used_glyphs(pages, ttf));
            for face in FontFace::ALL {
                fonts.set(face.resource_name(), font_id);
            }
        }
    }

    let mut xobjects = Dictionary::new();
    for (i, image) in images.iter().enumerate() {
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(image.width),
                "Height" => i64::from(image.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            image.pixels.clone(),
        );
        xobjects.set(image_name(i), doc.add_object(stream));
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
        "XObject" => xobjects,
    });

    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        real(width * PT_PER_MM),
        real(height * PT_PER_MM),
    ];
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page, height, font),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box.clone(),
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    Ok(doc)
}

/// Glyphs drawn anywhere in the document with the character each stands for.
fn used_glyphs(pages: &[Page], font: &TrueTypeFont) -> BTreeMap<u16, char> {
    pages
        .iter()
        .flat_map(|page| page.texts())
        .flat_map(str::chars)
        .map(|c| (font.glyph_id(c), c))
        .collect()
}

/// Embed `font` as a Type0 font over a `CIDFontType2` descendant and return
/// the Type0 object.
fn add_truetype_font(doc: &mut Document, font: &TrueTypeFont, glyphs: &BTreeMap<u16, char>) -> ObjectId {
    let program = font.data().to_vec();
    let length = program.len() as i64;
    let file_id = doc.add_object(Stream::new(dictionary! { "Length1" => length }, program));

    let ascent = font.ascent().round() as i64;
    let descent = font.descent().round() as i64;
    let flags: i64 = if font.italic_angle() != 0.0 { 32 | 64 } else { 32 };
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => font.name(),
        "Flags" => flags,
        "FontBBox" => vec![Object::Integer(-1000), Object::Integer(descent), Object::Integer(2000), Object::Integer(ascent)],
        "ItalicAngle" => real(font.italic_angle()),
        "Ascent" => ascent,
        "Descent" => descent,
        "CapHeight" => ascent,
        "StemV" => 80_i64,
        "FontFile2" => file_id,
    });

    let mut widths: Vec<Object> = Vec::with_capacity(glyphs.len() * 2);
    for gid in glyphs.keys() {
        widths.push(Object::Integer(i64::from(*gid)));
        widths.push(Object::Array(vec![Object::Integer(
            font.glyph_width(*gid).round() as i64,
        )]));
    }
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => font.name(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0_i64,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000_i64,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let cmap_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(glyphs).into_bytes()));
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => font.name(),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => cmap_id,
    })
}

/// CMap mapping glyph ids back to Unicode so text can be copied out.
fn to_unicode_cmap(glyphs: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    let entries: Vec<(&u16, &char)> = glyphs.iter().collect();
    // bfchar blocks hold at most 100 entries
    for chunk in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{hex}>");
        }
        let _ = writeln!(cmap, "endbfchar");
    }
    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn page_operations(page: &Page, page_height: f64, font: &DocumentFont) -> Vec<Operation> {
    let pt = |mm: f64| real(mm * PT_PER_MM);
    let flip = |y: f64| page_height - y;

    let mut ops = vec![Operation::new("w", vec![pt(LINE_WIDTH)])];
    for item in &page.items {
        match item {
            PageItem::Text {
                x,
                y,
                size,
                face,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![
                        Object::Name(face.resource_name().as_bytes().to_vec()),
                        real(*size),
                    ],
                ));
                ops.push(Operation::new("Td", vec![pt(*x), pt(flip(*y))]));
                let shown = match font {
                    DocumentFont::Helvetica => {
                        Object::String(encode_win_ansi(text), StringFormat::Literal)
                    }
                    DocumentFont::TrueType(ttf) => {
                        Object::String(ttf.encode(text), StringFormat::Hexadecimal)
                    }
                };
                ops.push(Operation::new("Tj", vec![shown]));
                ops.push(Operation::new("ET", vec![]));
            }
            PageItem::Rect { x, y, w, h } => {
                ops.push(Operation::new(
                    "re",
                    vec![pt(*x), pt(flip(y + h)), pt(*w), pt(*h)],
                ));
                ops.push(Operation::new("S", vec![]));
            }
            PageItem::Image { x, y, w, h, image } => {
                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![pt(*w), real(0.0), real(0.0), pt(*h), pt(*x), pt(flip(y + h))],
                ));
                ops.push(Operation::new(
                    "Do",
                    vec![Object::Name(image_name(*image).into_bytes())],
                ));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> PageItem {
        PageItem::Text {
            x: 10.0,
            y: 20.0,
            size: 12.0,
            face: FontFace::Regular,
            text: s.to_string(),
        }
    }

    #[test]
    fn test_write_document_pages() {
        let pages = vec![
            Page {
                items: vec![text("first (page)"), PageItem::Rect { x: 10.0, y: 30.0, w: 50.0, h: 6.0 }],
            },
            Page {
                items: vec![
                    text("second"),
                    PageItem::Image { x: 15.0, y: 40.0, w: 180.0, h: 90.0, image: 0 },
                ],
            },
        ];
        let images = vec![RgbImage {
            width: 2,
            height: 1,
            pixels: vec![255, 0, 0, 0, 0, 255],
        }];

        let mut doc = write_document(&pages, &images, 210.0, 297.0, &DocumentFont::Helvetica).unwrap();
        assert_eq!(doc.get_pages().len(), 2);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn test_page_operations_flip_y() {
        let page = Page {
            items: vec![PageItem::Rect { x: 0.0, y: 0.0, w: 10.0, h: 10.0 }],
        };
        let ops = page_operations(&page, 297.0, &DocumentFont::Helvetica);
        let rect = ops.iter().find(|op| op.operator == "re").unwrap();
        let y = rect.operands[1].as_float().unwrap();
        assert!((f64::from(y) - 287.0 * PT_PER_MM).abs() < 0.01);
    }

    #[test]
    fn test_page_texts() {
        let page = Page {
            items: vec![text("a"), PageItem::Rect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }, text("b")],
        };
        assert_eq!(page.texts().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    // ==================== embedded font tests ====================

    fn dejavu() -> DocumentFont {
        DocumentFont::TrueType(std::sync::Arc::new(
            TrueTypeFont::from_bytes("DejaVuSans", crate::figure::DEFAULT_FONT.to_vec()).unwrap(),
        ))
    }

    #[test]
    fn test_truetype_text_is_written_as_glyph_ids() {
        let font = dejavu();
        let page = Page {
            items: vec![text("Ж1")],
        };
        let ops = page_operations(&page, 297.0, &font);
        let shown = ops.iter().find(|op| op.operator == "Tj").unwrap();
        let DocumentFont::TrueType(ttf) = &font else {
            unreachable!()
        };
        let mut expected = ttf.glyph_id('Ж').to_be_bytes().to_vec();
        expected.extend(ttf.glyph_id('1').to_be_bytes());
        assert_eq!(
            shown.operands[0],
            Object::String(expected, StringFormat::Hexadecimal)
        );
    }

    #[test]
    fn test_truetype_font_is_embedded() {
        let font = dejavu();
        let pages = vec![Page {
            items: vec![text("데이터 Ünïcode")],
        }];
        let mut doc = write_document(&pages, &[], 210.0, 297.0, &font).unwrap();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();

        let fonts: Vec<&Dictionary> = reloaded
            .objects
            .values()
            .filter_map(|o| o.as_dict().ok())
            .filter(|d| d.get(b"Type").and_then(Object::as_name).ok() == Some(b"Font".as_slice()))
            .collect();
        let subtype = |d: &Dictionary| d.get(b"Subtype").and_then(Object::as_name).ok().map(<[u8]>::to_vec);
        assert!(fonts.iter().any(|d| subtype(d) == Some(b"Type0".to_vec())));
        assert!(fonts.iter().any(|d| subtype(d) == Some(b"CIDFontType2".to_vec())));
        assert!(!fonts.iter().any(|d| subtype(d) == Some(b"Type1".to_vec())));
    }

    #[test]
    fn test_to_unicode_cmap_lists_glyphs() {
        let glyphs: BTreeMap<u16, char> = [(3, 'A'), (0x1F0, 'Ж')].into_iter().collect();
        let cmap = to_unicode_cmap(&glyphs);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<01F0> <0416>"));
    }
}
