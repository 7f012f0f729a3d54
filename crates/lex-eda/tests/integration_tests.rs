//! Integration tests for the EDA toolkit.
//!
//! These tests drive the public API end to end: loading, summaries, the
//! figure battery, pagination and the written reports.

use lex_eda::layout::{LegendSlot, truncate_legend};
use lex_eda::{
    Chart, ColumnKind, DataLoader, DataSummary, DocumentPaginator, Eda, EdaConfig, FigureStyle,
    GraphGenerator, GridDims, PlotKind, PlotRequest, PlotStyle, RecordingSink, ReportGenerator,
    Table, TableData, TableInput, TableOptions, Visualization, calculate_grid,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_sales() -> Table {
    let input = TableInput::from_path(fixtures_path().join("sales.csv"))
        .expect("Failed to resolve input");
    DataLoader::new(input).load().expect("Failed to load sales.csv")
}

fn people() -> Table {
    let json = r#"[
        {"Name": "Alice", "Age": 25, "Gender": "Female"},
        {"Name": "Bob", "Age": 30, "Gender": "Male"},
        {"Name": "Charlie", "Age": 35, "Gender": "Male"}
    ]"#;
    DataLoader::new(TableInput::JsonText(json.to_string()))
        .load()
        .expect("Failed to load records")
}

// ============================================================================
// Loading and Summaries
// ============================================================================

#[test]
fn test_sales_column_kinds() {
    let table = load_sales();

    assert_eq!(table.kind("order_date"), Some(ColumnKind::Datetime));
    assert_eq!(table.kind("region"), Some(ColumnKind::Categorical));
    assert_eq!(table.kind("channel"), Some(ColumnKind::Categorical));
    assert_eq!(table.numeric_columns(), vec!["units", "price", "discount"]);
}

#[test]
fn test_sales_summaries() {
    let table = load_sales();
    let summary = DataSummary::new(&table);

    let info = summary.data_info().unwrap();
    assert_eq!(info.shape, (49, 6));
    assert_eq!(info.duplicates, 1);
    let discount_nulls = info
        .nulls
        .iter()
        .find(|(name, _)| name == "discount")
        .map(|(_, n)| *n);
    assert_eq!(discount_nulls, Some(4));

    let numerical = summary.numerical_summary().unwrap().unwrap();
    assert_eq!(numerical.columns, vec!["units", "price", "discount"]);
    assert_eq!(numerical.cell("count", "units"), Some("49.0"));

    let categorical = summary.categorical_summary().unwrap().unwrap();
    let region = categorical
        .features
        .iter()
        .find(|f| f.column == "region")
        .unwrap();
    assert_eq!(region.features, vec!["North", "South", "East", "West"]);
    assert_eq!(region.num_features, 4);

    let datetime = summary.datetime_summary().unwrap().unwrap();
    assert_eq!(datetime.columns.len(), 1);
    assert_eq!(datetime.summary.cell("min", "order_date"), Some("2022-01-03 00:00:00"));

    let correlation = summary.correlation().unwrap().unwrap();
    assert_eq!(correlation.len(), 3);
    assert_eq!(correlation.get("price", "price"), Some(1.0));
}

#[test]
fn test_people_scenario() {
    let table = people();
    assert_eq!(table.numeric_columns(), vec!["Age"]);
    assert_eq!(table.categorical_columns(), vec!["Name", "Gender"]);

    let snapshot = DataSummary::new(&table).snapshot("People").unwrap();
    assert_eq!(snapshot.shape, (3, 3));
    assert_eq!(snapshot.duplicates, 0);
    assert_eq!(snapshot.duplicate_ratio, "0.0%");
    assert!(snapshot.datetime.is_none());
}

#[test]
fn test_no_categorical_columns() {
    let table = DataLoader::new(TableInput::Array(vec![vec![1.0, 2.0], vec![3.0, 5.0]]))
        .with_column_names(["a", "b"])
        .load()
        .unwrap();
    assert!(DataSummary::new(&table).categorical_summary().unwrap().is_none());

    let config = EdaConfig::builder().build_unchecked();
    let pdf = ReportGenerator::new(&table, &config).build_document().unwrap();
    let texts: Vec<String> = pdf
        .pages()
        .iter()
        .flat_map(|p| p.texts().map(str::to_string).collect::<Vec<_>>())
        .collect();
    assert!(texts.contains(&"Categorical summary is not available.".to_string()));
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_grid_sizing() {
    let grid = |x, y, hue, kind| {
        let spec = calculate_grid(GridDims { x, y, hue }, kind).unwrap();
        (spec.rows, spec.cols)
    };

    assert_eq!(grid(Some(5), None, None, PlotKind::Sub), (2, 3));
    assert_eq!(grid(Some(4), None, None, PlotKind::Sub), (2, 2));
    assert_eq!(grid(Some(3), Some(2), None, PlotKind::Multi), (2, 2));
    assert_eq!(grid(Some(1), Some(4), Some(2), PlotKind::Multi), (4, 2));
    assert_eq!(grid(Some(9), None, None, PlotKind::Single), (1, 1));
    assert!(calculate_grid(GridDims { x: Some(2), y: None, hue: None }, PlotKind::Multi).is_err());
}

#[test]
fn test_legend_of_fifteen_keeps_eleven_slots() {
    let slots = truncate_legend((0..15).collect::<Vec<_>>());
    assert_eq!(slots.len(), 11);
    assert_eq!(slots[4], LegendSlot::Entry(4));
    assert_eq!(slots[5], LegendSlot::Ellipsis);
    assert_eq!(slots[10], LegendSlot::Entry(14));
}

// ============================================================================
// Figures
// ============================================================================

#[test]
fn test_sales_battery() {
    let table = load_sales();
    let config = EdaConfig::builder().output_dir("plots").build_unchecked();
    let (summary, sink) = Visualization::new(&table, &config)
        .visualize_into(RecordingSink::new())
        .unwrap();

    let stems = sink.stems();
    for expected in [
        "histogram",
        "heatmap",
        "box_units",
        "violin_price",
        "scatter_units",
        "bar_region",
        "count_channel",
        "line_order_date_all_mean",
        "line_order_date_all_median",
        "line_order_date_quarter_median",
    ] {
        assert!(stems.contains(&expected.to_string()), "{expected}");
    }
    assert_eq!(summary.paths.len(), stems.len());
}

#[test]
fn test_multi_heatmap_is_a_configuration_error() {
    let table = load_sales();
    let style = FigureStyle::from_plot_style(&PlotStyle::default());
    let mut generator = GraphGenerator::new(&table, "plots", RecordingSink::new(), style);
    let numeric = table.numeric_columns();

    let err = generator
        .allocate_and_render(
            &Chart::Heatmap { annotate: true },
            "heatmap",
            &PlotRequest::multi(Some(numeric.clone()), Some(numeric)),
        )
        .unwrap_err();
    assert!(err.is_configuration_error());
    assert!(generator.sink().saved.is_empty());
}

// ============================================================================
// Documents and Reports
// ============================================================================

#[test]
fn test_paginator_wide_and_long_table() {
    let columns: Vec<String> = (0..15).map(|i| format!("feature_{i}")).collect();
    let index: Vec<String> = (0..80).map(|i| i.to_string()).collect();
    let rows: Vec<Vec<String>> = (0..80)
        .map(|r| (0..15).map(|c| format!("{}.5", r * c)).collect())
        .collect();
    let data = TableData::new(columns, index, rows).unwrap();

    let mut pdf = DocumentPaginator::new("Wide");
    pdf.add_page();
    pdf.add_table(&data, "Wide table", 2, TableOptions::default());
    assert!(pdf.page_count() >= 4);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.pdf");
    pdf.save(&path).unwrap();
    let doc = lopdf::Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), pdf.page_count());
}

#[test]
fn test_eda_run_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    let config = EdaConfig::builder()
        .output_dir(dir.path())
        .dataset_name("Sales")
        .generate_markdown(true)
        .build()
        .unwrap();
    let output = Eda::new(config).run(&load_sales()).unwrap();

    let plots = output.plots.unwrap();
    assert!(!plots.paths.is_empty());
    for path in &plots.paths {
        assert!(path.exists(), "{}", path.display());
    }
    let first = image::open(&plots.paths[0]).unwrap();
    assert_eq!(first.width() % 400, 0);

    let report = output.report.unwrap();
    assert_eq!(report, dir.path().join("report.pdf"));
    let doc = lopdf::Document::load(&report).unwrap();
    assert!(doc.get_pages().len() >= 5);

    let markdown = std::fs::read_to_string(output.markdown.unwrap()).unwrap();
    assert!(markdown.contains("## 01. Data Information"));
    assert!(markdown.contains("Ratio of duplicated rows : 2.04%"));
    assert!(markdown.contains("### 4.2. order_date"));
}

#[test]
fn test_switches_turn_steps_off() {
    let dir = tempfile::tempdir().unwrap();
    let config = EdaConfig::builder()
        .output_dir(dir.path().join("nested/out"))
        .generate_plots(false)
        .generate_report(false)
        .build()
        .unwrap();
    let output = Eda::new(config).run(&people()).unwrap();

    assert!(output.plots.is_none());
    assert!(output.report.is_none());
    assert!(dir.path().join("nested/out").is_dir());
}
