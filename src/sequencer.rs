use crate::calendar::CalendarOracle;
use crate::duration::{DurationError, calendar_days, exclusive_end, expand, inclusive_end};
use crate::work_item::{WorkItem, WorkItemId};
use crate::worker::WorkerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SequenceError {
    #[error("item {item} belongs to worker {owner}, not to the queue of worker {worker}")]
    ForeignItem {
        item: WorkItemId,
        owner: WorkerId,
        worker: WorkerId,
    },
    #[error("forced item {0} is not an active item of this queue")]
    UnknownForcedItem(WorkItemId),
    #[error("worker {worker} has no workday on or after {from}")]
    NoWorkday { worker: WorkerId, from: NaiveDate },
    #[error(transparent)]
    Duration(#[from] DurationError),
    #[error("item {0} runs past the end of the calendar")]
    EndOfCalendar(WorkItemId),
}

/// Where a moved item lands relative to neighbors that start on the same day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    #[default]
    Before,
    After,
}

impl Placement {
    pub fn tie_break_left(self) -> bool {
        matches!(self, Placement::Before)
    }
}

/// A single item the user just dropped on a new date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedMove {
    pub item_id: WorkItemId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub placement: Placement,
}

impl ForcedMove {
    pub fn new(item_id: WorkItemId, start_date: NaiveDate) -> Self {
        Self {
            item_id,
            start_date,
            placement: Placement::Before,
        }
    }

    pub fn placed(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

/// Everything a sequencing pass reads besides the items themselves.
#[derive(Debug, Clone, Copy)]
pub struct SequenceContext<'a> {
    pub oracle: &'a CalendarOracle,
    pub workday_hours: f64,
    /// Anchor for items that have never been placed.
    pub today: NaiveDate,
}

impl<'a> SequenceContext<'a> {
    pub fn new(oracle: &'a CalendarOracle, workday_hours: f64, today: NaiveDate) -> Self {
        Self {
            oracle,
            workday_hours,
            today,
        }
    }

    fn snap(&self, date: NaiveDate, worker_id: WorkerId) -> Result<NaiveDate, SequenceError> {
        self.oracle
            .next_workday(date, worker_id)
            .ok_or(SequenceError::NoWorkday {
                worker: worker_id,
                from: date,
            })
    }

    /// Recompute the derived span of `item` as if it started on `start`.
    pub fn place(&self, item: &mut WorkItem, start: NaiveDate) -> Result<(), SequenceError> {
        let inflated = expand(
            self.oracle,
            item.nominal_hours,
            start,
            item.worker_id,
            self.workday_hours,
        )?;
        let days = calendar_days(inflated, self.workday_hours);
        let end = inclusive_end(start, days).ok_or(SequenceError::EndOfCalendar(item.id))?;
        item.start_date = Some(start);
        item.inflated_hours = inflated;
        item.calendar_days = days;
        item.end_date = Some(end);
        Ok(())
    }
}

// Same-day ordering: a forced item placed "before" wins, then fresh inserts,
// then existing items, then a forced item placed "after".
fn tie_rank(item: &WorkItem, pin: Option<&ForcedMove>) -> u8 {
    match pin {
        Some(pin) => match pin.placement {
            Placement::Before => 0,
            Placement::After => 3,
        },
        None if item.is_new => 1,
        None => 2,
    }
}

/// Re-date one worker's queue so that it is ordered, packed and never starts
/// on a closed day.
///
/// Dated items go first in date order, then undated ones in the order given,
/// each behind its predecessor. Only a queue with no dated item at all starts
/// at `today`. When the same item is forced twice the later move wins.
///
/// The output holds the same items: active ones first in their new order,
/// then inactive ones untouched. `is_new` is cleared on every active item.
pub fn sequence(
    worker_id: WorkerId,
    items: Vec<WorkItem>,
    ctx: &SequenceContext<'_>,
    forced: &[ForcedMove],
) -> Result<Vec<WorkItem>, SequenceError> {
    if let Some(foreign) = items.iter().find(|item| item.worker_id != worker_id) {
        return Err(SequenceError::ForeignItem {
            item: foreign.id,
            owner: foreign.worker_id,
            worker: worker_id,
        });
    }

    let (active, inactive): (Vec<WorkItem>, Vec<WorkItem>) =
        items.into_iter().partition(|item| item.active);

    if let Some(missing) = forced
        .iter()
        .find(|pin| !active.iter().any(|item| item.id == pin.item_id))
    {
        return Err(SequenceError::UnknownForcedItem(missing.item_id));
    }

    let mut keyed: Vec<(Option<NaiveDate>, u8, usize, WorkItem)> =
        Vec::with_capacity(active.len());
    for (index, item) in active.into_iter().enumerate() {
        let pin = forced.iter().rev().find(|pin| pin.item_id == item.id);
        let date = match pin {
            Some(pin) => Some(ctx.snap(pin.start_date, worker_id)?),
            None => item.start_date,
        };
        let rank = tie_rank(&item, pin);
        keyed.push((date, rank, index, item));
    }
    keyed.sort_by_key(|(date, rank, index, _)| match date {
        Some(date) => (false, Some(*date), *rank, *index),
        None => (true, None, 0, *index),
    });

    let mut sequenced = Vec::with_capacity(keyed.len() + inactive.len());
    let mut next_free: Option<NaiveDate> = None;
    for (key_date, _, _, mut item) in keyed {
        let candidate = next_free.or(key_date).unwrap_or(ctx.today);
        let start = ctx.snap(candidate, worker_id)?;
        ctx.place(&mut item, start)?;
        item.is_new = false;
        let end = exclusive_end(start, item.calendar_days)
            .ok_or(SequenceError::EndOfCalendar(item.id))?;
        next_free = Some(end);
        sequenced.push(item);
    }

    debug!(
        worker = worker_id,
        items = sequenced.len(),
        forced = ?forced.iter().map(|pin| pin.item_id).collect::<Vec<_>>(),
        "sequenced queue"
    );

    sequenced.extend(inactive);
    Ok(sequenced)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueueViolation {
    #[error("item {0} has no start date")]
    Unplaced(WorkItemId),
    #[error("item {item} starts on non-workday {date}")]
    StartsOnNonWorkday { item: WorkItemId, date: NaiveDate },
    #[error("item {later} starts {start} before item {earlier} ends (exclusive end {end})")]
    Overlap {
        earlier: WorkItemId,
        later: WorkItemId,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("item {0} carries a stale calendar span")]
    StaleSpan(WorkItemId),
}

/// Check the queue invariants for the active items of one worker's queue.
pub fn verify_queue(items: &[WorkItem], ctx: &SequenceContext<'_>) -> Result<(), QueueViolation> {
    let mut previous: Option<(WorkItemId, NaiveDate)> = None;
    for item in items.iter().filter(|item| item.active) {
        let start = item.start_date.ok_or(QueueViolation::Unplaced(item.id))?;
        if ctx.oracle.is_non_workday(start, item.worker_id) {
            return Err(QueueViolation::StartsOnNonWorkday {
                item: item.id,
                date: start,
            });
        }
        let mut expected = item.clone();
        if ctx.place(&mut expected, start).is_err()
            || expected.calendar_days != item.calendar_days
            || expected.end_date != item.end_date
        {
            return Err(QueueViolation::StaleSpan(item.id));
        }
        if let Some((earlier, end)) = previous {
            if start < end {
                return Err(QueueViolation::Overlap {
                    earlier,
                    later: item.id,
                    start,
                    end,
                });
            }
        }
        let end = exclusive_end(start, item.calendar_days).unwrap_or(NaiveDate::MAX);
        previous = Some((item.id, end));
    }
    Ok(())
}
