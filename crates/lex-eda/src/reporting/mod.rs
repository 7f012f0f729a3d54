//! Report generation module.
//!
//! [`ReportGenerator`] turns the summaries of one table into a paginated PDF
//! report, an optional Markdown twin and a JSON snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_eda::reporting::ReportGenerator;
//!
//! let generator = ReportGenerator::new(&table, &config);
//! let pdf = generator.generate_report()?;
//! if config.generate_markdown {
//!     generator.generate_markdown()?;
//! }
//! ```

mod generator;
mod markdown;

pub use generator::ReportGenerator;
pub use markdown::{markdown_table, render_markdown};
