//! Nominal working hours to calendar span conversion.
//!
//! A task sized in pure working hours occupies more calendar days when
//! weekends, holidays or time-off fall inside its window. Closed days do not
//! count as progress, so each one found extends the window by a full workday.

use crate::calendar::{CalendarOracle, MAX_WORKDAY_PROBE_DAYS};
use crate::worker::WorkerId;
use chrono::{Days, NaiveDate};
use thiserror::Error;

/// Longest window, in calendar days, a single item may occupy.
pub const MAX_SPAN_DAYS: i64 = 2 * MAX_WORKDAY_PROBE_DAYS;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DurationError {
    #[error("{hours}h starting {start} needs more than {MAX_SPAN_DAYS} calendar days")]
    TooLong { hours: f64, start: NaiveDate },
}

/// Inflate `nominal_hours` by one `workday_hours` unit for every non-workday
/// inside the execution window that starts at `start`.
///
/// `start` should already be a workday; if it is not, the closed first day is
/// absorbed like any other. Windows longer than [`MAX_SPAN_DAYS`] are an error.
pub fn expand(
    oracle: &CalendarOracle,
    nominal_hours: f64,
    start: NaiveDate,
    worker_id: WorkerId,
    workday_hours: f64,
) -> Result<f64, DurationError> {
    if nominal_hours <= 0.0 || workday_hours <= 0.0 {
        return Ok(nominal_hours.max(0.0));
    }
    let too_long = || DurationError::TooLong {
        hours: nominal_hours,
        start,
    };

    let days = (nominal_hours / workday_hours).ceil();
    if !days.is_finite() || days > MAX_SPAN_DAYS as f64 {
        return Err(too_long());
    }
    let mut total_days = days as i64;
    let mut hours = nominal_hours;
    let mut day = start;
    let mut walked = 0;
    while walked < total_days {
        if total_days > MAX_SPAN_DAYS {
            return Err(too_long());
        }
        if oracle.is_non_workday(day, worker_id) {
            hours += workday_hours;
            total_days += 1;
        }
        day = day.succ_opt().ok_or_else(too_long)?;
        walked += 1;
    }
    Ok(hours)
}

/// Whole calendar days covered by an inflated hour total.
pub fn calendar_days(inflated_hours: f64, workday_hours: f64) -> i64 {
    if inflated_hours <= 0.0 || workday_hours <= 0.0 {
        return 0;
    }
    (inflated_hours / workday_hours).ceil() as i64
}

/// First day after the item's window; the earliest a successor may start.
/// `None` past the end of the calendar.
pub fn exclusive_end(start: NaiveDate, calendar_days: i64) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(calendar_days.max(0).unsigned_abs()))
}

/// Last calendar day the item occupies. Zero-length items end on their start day.
pub fn inclusive_end(start: NaiveDate, calendar_days: i64) -> Option<NaiveDate> {
    start.checked_add_days(Days::new((calendar_days - 1).max(0).unsigned_abs()))
}
