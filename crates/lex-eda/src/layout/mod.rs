//! Pure layout geometry for figures: grid sizing, plot requests and axis
//! cosmetics. Nothing here touches data or pixels.

pub mod axis;
pub mod grid;

pub use axis::{
    DateTick, DateTickPlan, DateTickStrategy, LegendSlot, date_ticks, select_date_strategy,
    thin_ticks, truncate_legend,
};
pub use grid::{AggregationMode, GridDims, GridSpec, PlotKind, PlotRequest, calculate_grid};
