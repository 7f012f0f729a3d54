//! Axis cosmetics: legend truncation, date tick selection and tick thinning.

use super::grid::AggregationMode;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Legends with more entries than this are truncated.
pub const LEGEND_MAX_ENTRIES: usize = 10;
/// Entries kept at each end of a truncated legend.
pub const LEGEND_KEEP: usize = 5;
/// Label shown between the kept ends of a truncated legend.
pub const LEGEND_ELLIPSIS: &str = "...";

/// Non-date axes with more positions than this are thinned.
pub const THIN_THRESHOLD: usize = 20;
/// Maximum ticks left after thinning.
pub const MAX_TICKS: usize = 10;

/// Date axes never carry more than this many labelled ticks.
const MAX_DATE_TICKS: usize = 24;

/// A legend slot: either a real entry or the ellipsis marker.
#[derive(Debug, Clone, PartialEq)]
pub enum LegendSlot<T> {
    Entry(T),
    Ellipsis,
}

/// Keep the first and last five entries of a legend longer than ten,
/// with an ellipsis marker in between (11 slots).
pub fn truncate_legend<T>(entries: Vec<T>) -> Vec<LegendSlot<T>> {
    let n = entries.len();
    if n <= LEGEND_MAX_ENTRIES {
        return entries.into_iter().map(LegendSlot::Entry).collect();
    }

    let mut slots = Vec::with_capacity(2 * LEGEND_KEEP + 1);
    for (i, entry) in entries.into_iter().enumerate() {
        if i == LEGEND_KEEP {
            slots.push(LegendSlot::Ellipsis);
        }
        if i < LEGEND_KEEP || i >= n - LEGEND_KEEP {
            slots.push(LegendSlot::Entry(entry));
        }
    }
    slots
}

/// Tick placement for a date axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTickStrategy {
    /// January 1st of every year, `%Y`.
    Yearly,
    /// First of every `interval`-th month, `%Y-%m`.
    Monthly { interval: u32 },
    /// Every `interval` hours, `%m-%d %H:00`.
    Hourly { interval: u32 },
    /// Midnight of every day (`%Y-%m-%d`) with minor ticks every
    /// `minor_hours` hours (`%H:00`).
    DailyWithHours { minor_hours: u32 },
}

impl DateTickStrategy {
    pub fn major_format(&self) -> &'static str {
        match self {
            DateTickStrategy::Yearly => "%Y",
            DateTickStrategy::Monthly { .. } => "%Y-%m",
            DateTickStrategy::Hourly { .. } => "%m-%d %H:00",
            DateTickStrategy::DailyWithHours { .. } => "%Y-%m-%d",
        }
    }
}

/// Pick the tick strategy from the span of the axis data.
///
/// `hour` mode: over 7 days → daily + 6-hour minor ticks, else 4-hour ticks.
/// Other modes: over 2 years → yearly, over 6 months → quarterly,
/// else monthly.
pub fn select_date_strategy(span: Duration, mode: Option<AggregationMode>) -> DateTickStrategy {
    if mode == Some(AggregationMode::Hour) {
        if span.num_seconds() as f64 / 3600.0 > 24.0 * 7.0 {
            DateTickStrategy::DailyWithHours { minor_hours: 6 }
        } else {
            DateTickStrategy::Hourly { interval: 4 }
        }
    } else if span.num_days() > 365 * 2 {
        DateTickStrategy::Yearly
    } else if span.num_days() > 30 * 6 {
        DateTickStrategy::Monthly { interval: 3 }
    } else {
        DateTickStrategy::Monthly { interval: 1 }
    }
}

/// A labelled tick at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTick {
    pub at: NaiveDateTime,
    pub label: String,
}

/// Major and minor ticks of a date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct DateTickPlan {
    pub strategy: DateTickStrategy,
    pub major: Vec<DateTick>,
    pub minor: Vec<DateTick>,
}

/// Generate the ticks for a date axis spanning `min..=max`.
pub fn date_ticks(
    min: NaiveDateTime,
    max: NaiveDateTime,
    mode: Option<AggregationMode>,
) -> DateTickPlan {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };
    let strategy = select_date_strategy(max - min, mode);

    let major_times = match strategy {
        DateTickStrategy::Yearly => yearly(min, max),
        DateTickStrategy::Monthly { interval } => monthly(min, max, interval),
        DateTickStrategy::Hourly { interval } => hourly(min, max, interval),
        DateTickStrategy::DailyWithHours { .. } => hourly(min, max, 24),
    };
    let minor_times = match strategy {
        DateTickStrategy::DailyWithHours { minor_hours } => hourly(min, max, minor_hours)
            .into_iter()
            .filter(|t| t.hour() != 0)
            .collect(),
        _ => Vec::new(),
    };

    let label = |times: Vec<NaiveDateTime>, format: &str| -> Vec<DateTick> {
        thin_values(times)
            .into_iter()
            .map(|at| DateTick {
                at,
                label: at.format(format).to_string(),
            })
            .collect()
    };

    DateTickPlan {
        strategy,
        major: label(major_times, strategy.major_format()),
        minor: label(minor_times, "%H:00"),
    }
}

fn thin_values<T>(values: Vec<T>) -> Vec<T> {
    if values.len() <= MAX_DATE_TICKS {
        return values;
    }
    let step = values.len().div_ceil(MAX_DATE_TICKS);
    values.into_iter().step_by(step).collect()
}

fn midnight(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

fn yearly(min: NaiveDateTime, max: NaiveDateTime) -> Vec<NaiveDateTime> {
    (min.year()..=max.year() + 1)
        .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1).and_then(midnight))
        .filter(|t| *t >= min && *t <= max)
        .collect()
}

fn monthly(min: NaiveDateTime, max: NaiveDateTime, interval: u32) -> Vec<NaiveDateTime> {
    let interval = interval.max(1);
    let mut ticks = Vec::new();
    let (mut year, mut month) = (min.year(), min.month());
    while let Some(t) = NaiveDate::from_ymd_opt(year, month, 1).and_then(midnight) {
        if t > max {
            break;
        }
        if t >= min && (month - 1) % interval == 0 {
            ticks.push(t);
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    ticks
}

fn hourly(min: NaiveDateTime, max: NaiveDateTime, interval: u32) -> Vec<NaiveDateTime> {
    let interval = interval.max(1);
    let Some(start) = midnight(min.date()) else {
        return Vec::new();
    };
    let mut ticks = Vec::new();
    let mut t = start;
    while t <= max {
        if t >= min && t.hour() % interval.min(24) == 0 {
            ticks.push(t);
        }
        t += Duration::hours(interval.min(24) as i64);
    }
    ticks
}

/// Indices of the positions to label on a non-date axis with `n` positions:
/// all of them up to 20, otherwise at most 10 evenly spaced ones.
pub fn thin_ticks(n: usize) -> Vec<usize> {
    if n <= THIN_THRESHOLD {
        return (0..n).collect();
    }
    let step = n.div_ceil(MAX_TICKS);
    (0..n).step_by(step).collect()
}
