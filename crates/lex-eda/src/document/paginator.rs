//! Incremental A4 page layout.

use super::metrics::{DocumentFont, FontFace, pt_to_mm};
use super::pdf::{Page, PageItem, write_document};
use super::table::{INDEX_HEADER, TableBlock};
use crate::error::{EdaError, Result};
use crate::figure::RgbImage;
use crate::types::TableData;
use crate::utils::format_float;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// Geometry (mm) and type sizes (pt)
// ============================================================================

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 10.0;
pub const BOTTOM_MARGIN: f64 = 20.0;

/// Title printed at the top of every page.
pub const REPORT_TITLE: &str = "Data Summary Report";

const LINE_HEIGHT: f64 = 10.0;
const CELL_MARGIN: f64 = 1.0;
const CONTENT_MARGIN: f64 = 10.0;
const PAGE_PADDING: f64 = 3.0;
const TABLE_PADDING: f64 = 3.0;
const IMAGE_PADDING: f64 = 5.0;
const FOOTER_OFFSET: f64 = 15.0;

const HEADER_SIZE: f64 = 18.0;
const SUBHEADER_SIZE: f64 = 14.0;
const CONTENT_SIZE: f64 = 12.0;
const TABLE_SIZE: f64 = 12.0;
const FOOTER_SIZE: f64 = 8.0;

/// Title font size for a heading level.
pub fn level_font_size(level: u8) -> f64 {
    match level {
        1 => 16.0,
        2 => 14.0,
        3 => 12.0,
        _ => CONTENT_SIZE,
    }
}

/// Vertical space taken by [`DocumentPaginator::chapter_title`].
const TITLE_HEIGHT: f64 = LINE_HEIGHT + CONTENT_MARGIN / 5.0;

fn body_line_height() -> f64 {
    pt_to_mm(CONTENT_SIZE) * 1.5
}

fn table_row_height() -> f64 {
    pt_to_mm(TABLE_SIZE) + 2.0
}

// ============================================================================
// Public types
// ============================================================================

/// Write position plus the page bounds every primitive checks against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// 1-based page number, 0 before the first page exists.
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub page_height: f64,
    pub bottom_margin: f64,
}

impl Cursor {
    /// Lowest y content may reach.
    pub fn limit(&self) -> f64 {
        self.page_height - self.bottom_margin
    }

    /// Whether a block of height `h` fits below the cursor.
    pub fn fits(&self, h: f64) -> bool {
        self.y + h <= self.limit()
    }
}

/// Body text of a chapter before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Printed as is.
    Text(String),
    /// Joined with `, `.
    Tuple(Vec<String>),
    /// One item per line.
    List(Vec<String>),
    /// One `key: value` pair per line.
    Map(Vec<(String, String)>),
}

impl Body {
    pub fn render(&self) -> String {
        match self {
            Body::Text(text) => text.clone(),
            Body::Tuple(items) => items.join(", "),
            Body::List(items) => items.join("\n"),
            Body::Map(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{k}: {v}"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<usize> for Body {
    fn from(value: usize) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<i64> for Body {
    fn from(value: i64) -> Self {
        Body::Text(value.to_string())
    }
}

impl From<f64> for Body {
    fn from(value: f64) -> Self {
        Body::Text(format_float(value))
    }
}

/// Flags of [`DocumentPaginator::chapter_body`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyOptions {
    /// Skip the title line.
    pub none_title: bool,
    /// Last body of a block: leave a full content margin after it.
    pub last: bool,
    /// Explicit gap after the body (ignored when `last`).
    pub custom_ln: Option<f64>,
}

impl BodyOptions {
    pub fn last() -> Self {
        Self {
            last: true,
            ..Self::default()
        }
    }

    pub fn without_title(mut self) -> Self {
        self.none_title = true;
        self
    }

    pub fn with_ln(mut self, gap: f64) -> Self {
        self.custom_ln = Some(gap);
        self
    }
}

/// Flags of [`DocumentPaginator::add_table`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableOptions {
    /// Skip the title before the first column group.
    pub none_main_title: bool,
    /// Skip the title after a page break.
    pub none_title: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            none_main_title: false,
            none_title: true,
        }
    }
}

impl TableOptions {
    /// Repeat the title when a column group starts a new page.
    pub fn repeat_title(mut self) -> Self {
        self.none_title = false;
        self
    }
}

/// An image to embed.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// PNG or JPEG file.
    Path(PathBuf),
    /// Already decoded RGB pixels.
    Rgb(RgbImage),
}

impl ImageSource {
    fn decode(self) -> Result<RgbImage> {
        match self {
            ImageSource::Rgb(image) => Ok(image),
            ImageSource::Path(path) => {
                let decoded = image::open(&path)?.to_rgb8();
                let (width, height) = decoded.dimensions();
                Ok(RgbImage {
                    width,
                    height,
                    pixels: decoded.into_raw(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

/// One table row after wrapping: per-cell lines and widths.
struct RowLayout {
    cells: Vec<(Vec<String>, f64)>,
    height: f64,
}

impl RowLayout {
    fn line_count(&self) -> usize {
        self.cells
            .iter()
            .map(|(lines, _)| lines.len())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Lines `from..to` of every cell as a row of their own.
    fn slice(&self, from: usize, to: usize) -> RowLayout {
        let cells = self
            .cells
            .iter()
            .map(|(lines, w)| {
                let end = to.min(lines.len());
                (lines[from.min(end)..end].to_vec(), *w)
            })
            .collect();
        RowLayout {
            cells,
            height: (to - from).max(1) as f64 * table_row_height(),
        }
    }
}

// ============================================================================
// Paginator
// ============================================================================

/// Lays out a report page by page.
///
/// Every primitive checks the remaining space against the bottom margin
/// before it draws and starts a new page first when the block does not fit.
/// Each page carries the report header and a footer with the page number and
/// generation time.
#[derive(Debug, Clone)]
pub struct DocumentPaginator {
    dataset_name: String,
    generated_at: String,
    pages: Vec<Page>,
    images: Vec<RgbImage>,
    font: DocumentFont,
    cursor: Cursor,
}

impl DocumentPaginator {
    pub fn new(dataset_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            pages: Vec::new(),
            images: Vec::new(),
            font: DocumentFont::default(),
            cursor: Cursor {
                page: 0,
                x: MARGIN,
                y: MARGIN,
                page_height: PAGE_HEIGHT,
                bottom_margin: BOTTOM_MARGIN,
            },
        }
    }

    /// Fix the timestamp printed in the footer.
    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = generated_at.into();
        self
    }

    /// Set the text in `font`. Call before laying anything out; widths
    /// measured earlier are not revisited.
    pub fn with_font(mut self, font: DocumentFont) -> Self {
        self.font = font;
        self
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Width between the left and right margins.
    pub fn usable_width(&self) -> f64 {
        PAGE_WIDTH - 2.0 * MARGIN
    }

    /// Start a new page with header and footer and put the cursor below the
    /// header.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.cursor.page = self.pages.len();
        debug!("Starting page {}", self.cursor.page);

        self.cursor.x = MARGIN;
        self.cursor.y = MARGIN;
        self.cell(0.0, LINE_HEIGHT, REPORT_TITLE, FontFace::Bold, HEADER_SIZE, Align::Center, false);
        self.ln(LINE_HEIGHT);
        let subtitle = format!("- {} Dataset -", self.dataset_name);
        self.cell(0.0, LINE_HEIGHT, &subtitle, FontFace::Bold, SUBHEADER_SIZE, Align::Center, false);
        self.ln(LINE_HEIGHT);
        let content_top = self.cursor.y;

        self.cursor.y = PAGE_HEIGHT - FOOTER_OFFSET;
        let page_label = format!("Page {}", self.cursor.page);
        self.cell(0.0, LINE_HEIGHT, &page_label, FontFace::Italic, FOOTER_SIZE, Align::Center, false);
        self.cursor.x = MARGIN;
        let generated = format!("Generated at {}", self.generated_at);
        self.cell(0.0, LINE_HEIGHT, &generated, FontFace::Italic, FOOTER_SIZE, Align::Right, false);

        self.cursor.x = MARGIN;
        self.cursor.y = content_top;
    }

    /// One bold heading line sized by `level`.
    pub fn chapter_title(&mut self, text: &str, level: u8) {
        self.ensure_page();
        if !self.cursor.fits(TITLE_HEIGHT) {
            self.add_page();
        }
        self.cell(0.0, LINE_HEIGHT, text, FontFace::Bold, level_font_size(level), Align::Left, false);
        self.ln(LINE_HEIGHT);
        self.ln(CONTENT_MARGIN / 5.0);
    }

    /// A titled block of text.
    pub fn chapter_body(
        &mut self,
        title: &str,
        body: impl Into<Body>,
        level: u8,
        options: BodyOptions,
    ) {
        self.ensure_page();
        let text = body.into().render();
        let line_h = body_line_height();
        let lines = self.font.wrap_text(
            &text,
            self.usable_width() - 2.0 * CELL_MARGIN,
            FontFace::Regular,
            CONTENT_SIZE,
        );
        let title_h = if options.none_title { 0.0 } else { TITLE_HEIGHT };
        let total_h = lines.len() as f64 * line_h;

        if !self.cursor.fits(total_h + title_h) {
            self.add_page();
        }
        if !options.none_title {
            self.chapter_title(title, level);
        }
        for line in &lines {
            if !self.cursor.fits(line_h) {
                self.add_page();
            }
            self.cell(0.0, line_h, line, FontFace::Regular, CONTENT_SIZE, Align::Left, false);
            self.ln(line_h);
        }

        if options.last {
            self.ln(CONTENT_MARGIN);
        } else if let Some(gap) = options.custom_ln {
            self.ln(gap);
        } else {
            self.ln(CONTENT_MARGIN / 10.0);
        }
    }

    /// A bordered table split into page-width column groups.
    pub fn add_table(&mut self, data: &TableData, title: &str, level: u8, options: TableOptions) {
        self.ensure_page();
        let block = TableBlock::measure(data, &self.font, TABLE_SIZE, TABLE_PADDING);
        let available = self.usable_width() - block.index_width - 2.0 * PAGE_PADDING;

        if !options.none_main_title {
            self.chapter_title(title, level);
        }

        for group in block.groups(available) {
            let widths: Vec<f64> = block.column_widths[group.clone()]
                .iter()
                .map(|w| w.min(available))
                .collect();

            let mut header = vec![(INDEX_HEADER.to_string(), block.index_width)];
            header.extend(
                data.columns[group.clone()]
                    .iter()
                    .zip(&widths)
                    .map(|(name, w)| (name.clone(), *w)),
            );
            let header = self.layout_row(header);

            let rows: Vec<RowLayout> = data
                .rows
                .iter()
                .zip(&data.index)
                .map(|(row, index)| {
                    let mut cells = vec![(index.clone(), block.index_width)];
                    cells.extend(
                        row[group.clone()]
                            .iter()
                            .zip(&widths)
                            .map(|(value, w)| (value.clone(), *w)),
                    );
                    self.layout_row(cells)
                })
                .collect();

            // Rows taller than a page are split, so they only need their
            // first line to start here.
            let line_h = table_row_height();
            let page_room = self.cursor.limit() - self.content_top() - header.height;
            let first_h = rows.first().map_or(0.0, |r| {
                if r.height <= page_room { r.height } else { line_h }
            });
            if !self.cursor.fits(header.height + first_h) {
                self.add_page();
                if !options.none_title {
                    self.chapter_title(title, level);
                }
            }

            self.emit_row(&header);
            let mut under_header = true;
            for row in &rows {
                let total = row.line_count();
                let mut from = 0;
                while from < total {
                    let rest = total - from;
                    let room = self.room_lines(line_h);
                    let keep_whole = from == 0 && rest as f64 * line_h <= page_room;
                    if rest > room && !under_header && (keep_whole || room == 0) {
                        self.add_page();
                        self.emit_row(&header);
                        under_header = true;
                        continue;
                    }
                    let take = rest.min(room.max(1));
                    if take < total {
                        debug!("Splitting table row at line {} of {}", from + take, total);
                        self.emit_row(&row.slice(from, from + take));
                    } else {
                        self.emit_row(row);
                    }
                    under_header = false;
                    from += take;
                }
            }
            self.ln(CONTENT_MARGIN);
        }
    }

    /// A centered image scaled to the usable width.
    pub fn add_image(&mut self, source: ImageSource) -> Result<()> {
        self.ensure_page();
        let image = source.decode()?;
        if image.width == 0 || image.height == 0 {
            return Err(EdaError::Render("image has no pixels".to_string()));
        }

        let mut w = self.usable_width() - 2.0 * IMAGE_PADDING;
        let mut h = w * f64::from(image.height) / f64::from(image.width);
        let max_h = self.cursor.limit() - self.content_top();
        if h > max_h {
            w *= max_h / h;
            h = max_h;
        }

        if !self.cursor.fits(h) {
            self.add_page();
        }
        let x = (PAGE_WIDTH - w) / 2.0;
        let y = self.cursor.y;
        self.images.push(image);
        let index = self.images.len() - 1;
        self.push(PageItem::Image {
            x,
            y,
            w,
            h,
            image: index,
        });
        self.ln(h + CONTENT_MARGIN);
        Ok(())
    }

    // ===== Output =====

    /// Serialize the pages laid out so far.
    pub fn to_document(&self) -> Result<lopdf::Document> {
        write_document(&self.pages, &self.images, PAGE_WIDTH, PAGE_HEIGHT, &self.font)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = self.to_document()?;
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        info!("Saved report ({} pages): {}", self.pages.len(), path.display());
        Ok(())
    }

    // ===== Drawing helpers =====

    fn ensure_page(&mut self) {
        if self.pages.is_empty() {
            self.add_page();
        }
    }

    /// Table lines of height `line_h` that still fit below the cursor.
    fn room_lines(&self, line_h: f64) -> usize {
        ((self.cursor.limit() - self.cursor.y) / line_h + 1e-9)
            .floor()
            .max(0.0) as usize
    }

    /// First y below the header.
    fn content_top(&self) -> f64 {
        MARGIN + 2.0 * LINE_HEIGHT
    }

    fn push(&mut self, item: PageItem) {
        if let Some(page) = self.pages.last_mut() {
            page.items.push(item);
        }
    }

    fn ln(&mut self, h: f64) {
        self.cursor.x = MARGIN;
        self.cursor.y += h;
    }

    /// Single-line cell at the cursor; a width of 0 extends to the right
    /// margin. Advances x past the cell.
    #[allow(clippy::too_many_arguments)]
    fn cell(
        &mut self,
        w: f64,
        h: f64,
        text: &str,
        face: FontFace,
        size: f64,
        align: Align,
        border: bool,
    ) {
        let w = if w == 0.0 {
            PAGE_WIDTH - MARGIN - self.cursor.x
        } else {
            w
        };
        let (x, y) = (self.cursor.x, self.cursor.y);
        if border {
            self.push(PageItem::Rect { x, y, w, h });
        }
        if !text.is_empty() {
            let text_w = self.font.text_width(text, face, size);
            let text_x = match align {
                Align::Left => x + CELL_MARGIN,
                Align::Center => x + (w - text_w) / 2.0,
                Align::Right => x + w - CELL_MARGIN - text_w,
            };
            self.push(PageItem::Text {
                x: text_x,
                y: y + 0.5 * h + 0.3 * pt_to_mm(size),
                size,
                face,
                text: text.to_string(),
            });
        }
        self.cursor.x = x + w;
    }

    fn layout_row(&self, cells: Vec<(String, f64)>) -> RowLayout {
        let line_h = table_row_height();
        let cells: Vec<(Vec<String>, f64)> = cells
            .into_iter()
            .map(|(text, w)| {
                let inner = w - 2.0 * CELL_MARGIN;
                let lines = if text.contains('\n')
                    || self.font.text_width(&text, FontFace::Regular, TABLE_SIZE) > inner
                {
                    self.font.wrap_text(&text, inner, FontFace::Regular, TABLE_SIZE)
                } else {
                    vec![text]
                };
                (lines, w)
            })
            .collect();
        let tallest = cells.iter().map(|(lines, _)| lines.len()).max().unwrap_or(1);
        RowLayout {
            cells,
            height: tallest.max(1) as f64 * line_h,
        }
    }

    /// Draw a bordered row. Each cell spans the full row height and the x
    /// cursor moves to the right edge of every cell in turn.
    fn emit_row(&mut self, row: &RowLayout) {
        let line_h = table_row_height();
        let y = self.cursor.y;
        for (lines, w) in &row.cells {
            let x = self.cursor.x;
            self.push(PageItem::Rect {
                x,
                y,
                w: *w,
                h: row.height,
            });
            for (k, line) in lines.iter().enumerate() {
                self.cursor.y = y + k as f64 * line_h;
                self.cursor.x = x;
                self.cell(*w, line_h, line, FontFace::Regular, TABLE_SIZE, Align::Center, false);
            }
            self.cursor.x = x + w;
            self.cursor.y = y;
        }
        self.ln(row.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paginator() -> DocumentPaginator {
        DocumentPaginator::new("Sample").with_generated_at("2024-01-01 00:00:00")
    }

    fn table(rows: usize, columns: &[&str], value: &str) -> TableData {
        TableData::new(
            columns.iter().map(|c| c.to_string()).collect(),
            (0..rows).map(|i| i.to_string()).collect(),
            (0..rows)
                .map(|_| columns.iter().map(|_| value.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    fn rects(page: &Page) -> Vec<(f64, f64, f64, f64)> {
        page.items
            .iter()
            .filter_map(|item| match item {
                PageItem::Rect { x, y, w, h } => Some((*x, *y, *w, *h)),
                _ => None,
            })
            .collect()
    }

    // ==================== page tests ====================

    #[test]
    fn test_add_page_draws_header_and_footer() {
        let mut pdf = paginator();
        pdf.add_page();

        let texts: Vec<&str> = pdf.pages()[0].texts().collect();
        assert_eq!(
            texts,
            vec![
                "Data Summary Report",
                "- Sample Dataset -",
                "Page 1",
                "Generated at 2024-01-01 00:00:00",
            ]
        );
        let cursor = pdf.cursor();
        assert_eq!(cursor.page, 1);
        assert_eq!(cursor.x, MARGIN);
        assert_eq!(cursor.y, MARGIN + 2.0 * LINE_HEIGHT);
    }

    #[test]
    fn test_primitives_open_the_first_page() {
        let mut pdf = paginator();
        pdf.chapter_title("01. Data Information", 1);
        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf.cursor().y, 30.0 + TITLE_HEIGHT);
    }

    #[test]
    fn test_body_normalization() {
        assert_eq!(Body::Tuple(vec!["3".into(), "3".into()]).render(), "3, 3");
        assert_eq!(Body::List(vec!["a".into(), "b".into()]).render(), "a\nb");
        assert_eq!(
            Body::Map(vec![("Name".into(), "0".into()), ("Age".into(), "1".into())]).render(),
            "Name: 0\nAge: 1"
        );
        assert_eq!(Body::from(0.5).render(), "0.5");
        assert_eq!(Body::from(3usize).render(), "3");
    }

    // ==================== chapter_body tests ====================

    #[test]
    fn test_body_spacing_options() {
        let mut pdf = paginator();
        pdf.add_page();
        let line_h = body_line_height();

        let y = pdf.cursor().y;
        pdf.chapter_body("t", "one line", 4, BodyOptions::default().without_title());
        assert!((pdf.cursor().y - (y + line_h + 1.0)).abs() < 1e-9);

        let y = pdf.cursor().y;
        pdf.chapter_body("t", "one line", 4, BodyOptions::last().without_title());
        assert!((pdf.cursor().y - (y + line_h + 10.0)).abs() < 1e-9);

        let y = pdf.cursor().y;
        pdf.chapter_body("t", "one line", 3, BodyOptions::default().with_ln(1.0));
        assert!((pdf.cursor().y - (y + TITLE_HEIGHT + line_h + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_body_breaks_page_and_resets_cursor() {
        let mut pdf = paginator();
        pdf.add_page();
        let lines: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();

        let mut previous_page = 1;
        for _ in 0..10 {
            pdf.chapter_body("Block", Body::List(lines.clone()), 2, BodyOptions::last());
            let cursor = pdf.cursor();
            if cursor.page > previous_page {
                assert_eq!(cursor.page, previous_page + 1);
                // header, title, then the body right below it
                let expected = 30.0 + TITLE_HEIGHT + 10.0 * body_line_height() + CONTENT_MARGIN;
                assert!((cursor.y - expected).abs() < 1e-9);
                let texts: Vec<&str> = pdf.pages()[cursor.page - 1].texts().collect();
                assert_eq!(texts[4], "Block");
                return;
            }
            previous_page = cursor.page;
        }
        panic!("expected a page break");
    }

    #[test]
    fn test_body_text_stays_above_bottom_margin() {
        let mut pdf = paginator();
        let lines: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
        pdf.chapter_body("Long", Body::List(lines), 3, BodyOptions::default());

        assert!(pdf.page_count() >= 3);
        for page in pdf.pages() {
            for item in &page.items {
                if let PageItem::Text { y, text, .. } = item
                    && text.starts_with("line")
                {
                    assert!(*y <= PAGE_HEIGHT - BOTTOM_MARGIN);
                }
            }
        }
    }

    // ==================== add_table tests ====================

    #[test]
    fn test_table_layout_on_one_page() {
        let mut pdf = paginator();
        pdf.add_page();
        let data = table(3, &["Name", "Age"], "abc");
        pdf.add_table(&data, "1.2. Data Head", 2, TableOptions::default());

        let page = &pdf.pages()[0];
        let texts: Vec<&str> = page.texts().collect();
        assert_eq!(&texts[4..8], &["1.2. Data Head", "No", "Name", "Age"]);
        // header + 3 rows, 3 cells each
        assert_eq!(rects(page).len(), 12);
        let row_h = table_row_height();
        let expected = 30.0 + TITLE_HEIGHT + 4.0 * row_h + CONTENT_MARGIN;
        assert!((pdf.cursor().y - expected).abs() < 1e-9);
    }

    #[test]
    fn test_long_table_repeats_header_on_new_page() {
        let mut pdf = paginator();
        pdf.add_page();
        let data = table(60, &["value"], "1.0");
        pdf.add_table(&data, "Counts", 3, TableOptions::default());

        assert_eq!(pdf.page_count(), 2);
        let second: Vec<&str> = pdf.pages()[1].texts().collect();
        // header/footer, then the repeated header row, no title
        assert_eq!(&second[4..6], &["No", "value"]);
        for page in pdf.pages() {
            for (_, y, _, h) in rects(page) {
                assert!(y + h <= PAGE_HEIGHT - BOTTOM_MARGIN + 1e-9);
            }
        }
    }

    #[test]
    fn test_wide_table_is_split_into_groups() {
        let mut pdf = paginator();
        pdf.add_page();
        let columns: Vec<String> = (0..12).map(|i| format!("column_{i:02}")).collect();
        let names: Vec<&str> = columns.iter().map(String::as_str).collect();
        let data = table(2, &names, "12345.678");
        pdf.add_table(&data, "Stats", 2, TableOptions::default());

        let texts: Vec<&str> = pdf.pages()[0].texts().collect();
        let headers = texts.iter().filter(|t| **t == "No").count();
        assert!(headers >= 2);
        // every column printed exactly once, in order
        let printed: Vec<&str> = texts
            .iter()
            .copied()
            .filter(|t| t.starts_with("column_"))
            .collect();
        assert_eq!(printed, names);
    }

    #[test]
    fn test_group_break_reemits_title_when_requested() {
        let mut pdf = paginator();
        pdf.add_page();
        for _ in 0..14 {
            pdf.chapter_body("filler", "x", 4, BodyOptions::last().without_title());
        }
        let data = table(20, &["a"], "1");
        pdf.add_table(&data, "4.1. Datetime", 2, TableOptions::default().repeat_title());

        assert_eq!(pdf.page_count(), 2);
        let second: Vec<&str> = pdf.pages()[1].texts().collect();
        assert_eq!(second[4], "4.1. Datetime");
    }

    #[test]
    fn test_wrapped_cell_keeps_other_cells_in_place() {
        let mut pdf = paginator();
        pdf.add_page();
        let long = "word ".repeat(60);
        let data = TableData::new(
            vec!["text".to_string()],
            vec!["0".to_string(), "1".to_string()],
            vec![vec![long.trim().to_string()], vec!["short".to_string()]],
        )
        .unwrap();
        pdf.add_table(&data, "Wrapped", 3, TableOptions::default());

        let boxes = rects(&pdf.pages()[0]);
        // header (2 cells), wrapped row (2 cells), short row (2 cells)
        assert_eq!(boxes.len(), 6);
        let (idx_x, _, idx_w, _) = boxes[0];
        let row_h = table_row_height();

        let (x0, y0, _, h0) = boxes[2];
        let (x1, y1, w1, h1) = boxes[3];
        assert_eq!(x0, idx_x);
        assert!((x1 - (idx_x + idx_w)).abs() < 1e-9);
        assert_eq!(y0, y1);
        assert!(h1 > row_h);
        assert_eq!(h0, h1);
        assert!(w1 <= pdf.usable_width());

        let (x2, y2, _, h2) = boxes[4];
        let (x3, _, _, _) = boxes[5];
        assert_eq!(x2, idx_x);
        assert!((x3 - x1).abs() < 1e-9);
        assert!((y2 - (y0 + h0)).abs() < 1e-9);
        assert!((h2 - row_h).abs() < 1e-9);
    }

    #[test]
    fn test_cell_taller_than_page_is_split_across_pages() {
        let mut pdf = paginator();
        pdf.add_page();
        let long = "word ".repeat(3000);
        let data = TableData::new(
            vec!["text".to_string()],
            vec!["0".to_string(), "1".to_string()],
            vec![vec![long.trim().to_string()], vec!["short".to_string()]],
        )
        .unwrap();
        pdf.add_table(&data, "Long", 3, TableOptions::default());

        assert!(pdf.page_count() > 2);
        let limit = PAGE_HEIGHT - BOTTOM_MARGIN;
        for page in pdf.pages() {
            let boxes = rects(page);
            // header row plus at least one row slice on every page
            assert!(boxes.len() >= 4);
            for (_, y, _, h) in boxes {
                assert!(y + h <= limit + 1e-9);
            }
        }

        // every word printed exactly once, none lost at the page breaks
        let words: usize = pdf
            .pages()
            .iter()
            .flat_map(|page| page.texts())
            .map(|t| t.split_whitespace().filter(|w| *w == "word").count())
            .sum();
        assert_eq!(words, 3000);

        let last: Vec<&str> = pdf.pages()[pdf.page_count() - 1].texts().collect();
        assert!(last.contains(&"short"));
        assert!(last.contains(&"No"));
    }

    #[test]
    fn test_long_first_row_starts_below_the_title() {
        let mut pdf = paginator();
        pdf.add_page();
        let long = "word ".repeat(1500);
        let data = TableData::new(
            vec!["text".to_string()],
            vec!["0".to_string()],
            vec![vec![long.trim().to_string()]],
        )
        .unwrap();
        pdf.add_table(&data, "Long", 3, TableOptions::default());

        let first: Vec<&str> = pdf.pages()[0].texts().collect();
        assert!(first.contains(&"Long"));
        assert!(first.iter().any(|t| t.starts_with("word")));
    }

    #[test]
    fn test_embedded_font_keeps_non_latin_text() {
        let font = crate::document::TrueTypeFont::from_bytes(
            "DejaVuSans",
            crate::figure::DEFAULT_FONT.to_vec(),
        )
        .unwrap();
        let mut pdf = paginator().with_font(DocumentFont::TrueType(std::sync::Arc::new(font)));
        pdf.add_page();
        let data = TableData::new(
            vec!["город".to_string()],
            vec!["0".to_string()],
            vec![vec!["Москва".to_string()]],
        )
        .unwrap();
        pdf.add_table(&data, "Города", 3, TableOptions::default());

        let texts: Vec<&str> = pdf.pages()[0].texts().collect();
        assert!(texts.contains(&"Москва"));
        let bytes = pdf.to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    // ==================== add_image tests ====================

    #[test]
    fn test_image_is_centered_and_scaled() {
        let mut pdf = paginator();
        pdf.add_page();
        let image = RgbImage {
            width: 200,
            height: 100,
            pixels: vec![0; 200 * 100 * 3],
        };
        pdf.add_image(ImageSource::Rgb(image)).unwrap();

        let item = pdf.pages()[0]
            .items
            .iter()
            .find(|i| matches!(i, PageItem::Image { .. }))
            .cloned()
            .unwrap();
        let PageItem::Image { x, y, w, h, .. } = item else {
            unreachable!()
        };
        assert_eq!(w, 180.0);
        assert_eq!(h, 90.0);
        assert_eq!(x, 15.0);
        assert_eq!(y, 30.0);
        assert_eq!(pdf.cursor().y, 30.0 + 90.0 + CONTENT_MARGIN);
    }

    #[test]
    fn test_tall_image_is_clamped_and_breaks_page() {
        let mut pdf = paginator();
        pdf.add_page();
        pdf.chapter_title("05. Correlation Matrix", 1);
        let image = RgbImage {
            width: 100,
            height: 400,
            pixels: vec![0; 100 * 400 * 3],
        };
        pdf.add_image(ImageSource::Rgb(image)).unwrap();

        assert_eq!(pdf.page_count(), 2);
        let PageItem::Image { y, h, .. } = pdf.pages()[1]
            .items
            .iter()
            .find(|i| matches!(i, PageItem::Image { .. }))
            .cloned()
            .unwrap()
        else {
            unreachable!()
        };
        assert_eq!(y, 30.0);
        assert!(y + h <= PAGE_HEIGHT - BOTTOM_MARGIN + 1e-9);
    }

    #[test]
    fn test_image_from_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::from_pixel(4, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut pdf = paginator();
        pdf.add_image(ImageSource::Path(path)).unwrap();
        let bytes = pdf.to_bytes().unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let mut pdf = paginator();
        let image = RgbImage {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
        assert!(pdf.add_image(ImageSource::Rgb(image)).is_err());
    }
}
