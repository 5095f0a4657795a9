//! Render-facing coordinate conversions.
//!
//! Everything here is derived from an already sequenced queue. Nothing in this
//! module feeds back into scheduling decisions.

use crate::calendar::CalendarOracle;
use crate::duration::expand;
use crate::work_item::WorkItem;
use chrono::{Duration, NaiveDate};
use polars::prelude::PlSmallStr;
use polars::prelude::*;

/// Index at which an item starting on `start_date` should be spliced into
/// `sorted` (ascending by start date) to keep it ordered.
///
/// With `tie_break_left` the item goes before neighbors on the same day,
/// otherwise after them. Unplaced items sort as if they started at the
/// beginning of time.
pub fn insertion_index(sorted: &[WorkItem], start_date: NaiveDate, tie_break_left: bool) -> usize {
    if tie_break_left {
        sorted.partition_point(|item| item.start_date.is_none_or(|date| date < start_date))
    } else {
        sorted.partition_point(|item| item.start_date.is_none_or(|date| date <= start_date))
    }
}

pub fn days_between(date: NaiveDate, chart_start: NaiveDate) -> i64 {
    (date - chart_start).num_days()
}

pub fn x_position(date: NaiveDate, chart_start: NaiveDate, day_width_px: f64) -> f64 {
    days_between(date, chart_start) as f64 * day_width_px
}

/// Rendered width of an item: its inflated duration in (possibly fractional)
/// days times the day width. Unplaced items render at their nominal size, and
/// a span too long to expand keeps the inflated hours it was stored with.
pub fn width(
    oracle: &CalendarOracle,
    item: &WorkItem,
    workday_hours: f64,
    day_width_px: f64,
) -> f64 {
    if workday_hours <= 0.0 {
        return 0.0;
    }
    let hours = match item.start_date {
        Some(start) => expand(
            oracle,
            item.nominal_hours,
            start,
            item.worker_id,
            workday_hours,
        )
        .unwrap_or(item.inflated_hours),
        None => item.nominal_hours.max(0.0),
    };
    hours / workday_hours * day_width_px
}

/// Whole-day offset for a horizontal drag of `delta_px`.
///
/// A partial day counts once the pointer has travelled at least
/// `snap_threshold` of a day width past the last boundary, in either direction.
pub fn date_offset_from_px(delta_px: f64, day_width_px: f64, snap_threshold: f64) -> i64 {
    if day_width_px <= 0.0 || !delta_px.is_finite() {
        return 0;
    }
    let days = delta_px / day_width_px;
    let whole = days.trunc();
    let fraction = (days - whole).abs();
    let step = if fraction >= snap_threshold { 1.0 } else { 0.0 };
    (whole + step * days.signum()) as i64
}

pub fn date_from_x(x_px: f64, chart_start: NaiveDate, day_width_px: f64) -> NaiveDate {
    if day_width_px <= 0.0 || !x_px.is_finite() {
        return chart_start;
    }
    chart_start + Duration::days((x_px / day_width_px).floor() as i64)
}

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

/// Tabular view of positioned items for renderers and the CLI.
pub fn timeline_frame(
    items: &[WorkItem],
    chart_start: NaiveDate,
    day_width_px: f64,
    workday_hours: f64,
) -> PolarsResult<DataFrame> {
    let placed: Vec<&WorkItem> = items
        .iter()
        .filter(|item| item.active && item.start_date.is_some())
        .collect();

    let ids: Vec<i32> = placed.iter().map(|item| item.id).collect();
    let workers: Vec<i32> = placed.iter().map(|item| item.worker_id).collect();
    let names: Vec<&str> = placed.iter().map(|item| item.name.as_str()).collect();
    let jobs: Vec<Option<i32>> = placed.iter().map(|item| item.job_id()).collect();
    let starts: Vec<Option<i32>> = placed
        .iter()
        .map(|item| item.start_date.map(date_to_i32))
        .collect();
    let ends: Vec<Option<i32>> = placed
        .iter()
        .map(|item| item.end_date.map(date_to_i32))
        .collect();
    let hours: Vec<f64> = placed.iter().map(|item| item.nominal_hours).collect();
    let days: Vec<i64> = placed.iter().map(|item| item.calendar_days).collect();
    let xs: Vec<f64> = placed
        .iter()
        .map(|item| {
            item.start_date
                .map(|date| x_position(date, chart_start, day_width_px))
                .unwrap_or_default()
        })
        .collect();
    let widths: Vec<f64> = placed
        .iter()
        .map(|item| {
            if workday_hours > 0.0 {
                item.inflated_hours / workday_hours * day_width_px
            } else {
                0.0
            }
        })
        .collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("id"), ids).into_column(),
        Series::new(PlSmallStr::from_static("worker_id"), workers).into_column(),
        Series::new(PlSmallStr::from_static("name"), names).into_column(),
        Series::new(PlSmallStr::from_static("job"), jobs).into_column(),
        Series::new(PlSmallStr::from_static("start_date"), starts)
            .cast(&DataType::Date)?
            .into_column(),
        Series::new(PlSmallStr::from_static("end_date"), ends)
            .cast(&DataType::Date)?
            .into_column(),
        Series::new(PlSmallStr::from_static("nominal_hours"), hours).into_column(),
        Series::new(PlSmallStr::from_static("calendar_days"), days).into_column(),
        Series::new(PlSmallStr::from_static("x_px"), xs).into_column(),
        Series::new(PlSmallStr::from_static("width_px"), widths).into_column(),
    ];
    DataFrame::new(columns)
}
