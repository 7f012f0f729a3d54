//! Paginated PDF documents.
//!
//! [`DocumentPaginator`] lays out titles, text bodies, tables and images on
//! A4 pages, breaking pages whenever the next block would cross the bottom
//! margin. Tables wider than the page are split into column groups with
//! [`pack_columns`]. The finished pages are written with `lopdf`, in the
//! standard Helvetica fonts or an embedded TrueType [`DocumentFont`].

pub mod metrics;
pub mod paginator;
pub mod pdf;
pub mod table;

pub use paginator::{
    BOTTOM_MARGIN, Body, BodyOptions, Cursor, DocumentPaginator, ImageSource, MARGIN, PAGE_HEIGHT,
    PAGE_WIDTH, REPORT_TITLE, TableOptions,
};
pub use metrics::{DocumentFont, TrueTypeFont};
pub use pdf::{Page, PageItem};
pub use table::{TableBlock, pack_columns};
